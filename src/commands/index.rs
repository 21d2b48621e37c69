//! Index command - compute and cache embeddings for every note

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Result};
use colored::Colorize;

use ainotes::core::note::NoteId;
use ainotes::core::store::CorpusLoader;
use ainotes::search::SearchSession;

use super::Workspace;

pub fn run(root: Option<&Path>, status_only: bool, rebuild: bool, json: bool) -> Result<()> {
    let workspace = Workspace::open(root)?;
    workspace.require_layout()?;

    let provider = workspace.provider(false)?;

    if status_only {
        let model = provider.as_deref().map(|p| p.model_id());
        return show_status(&workspace, model, json);
    }

    let Some(provider) = provider else {
        bail!("embedding.backend is 'none'; nothing to index");
    };
    let model = provider.model_id().to_string();
    let session = SearchSession::from_provider(Some(provider));

    let mut store = workspace.embedding_store()?;

    if rebuild {
        let removed = store.clear(&model)?;
        if !json {
            println!("{} Removed {} cached embeddings", "→".dimmed(), removed);
        }
    }

    let mut corpus = workspace.store.load_corpus()?;
    let live: Vec<NoteId> = corpus.notes.iter().map(|n| n.id).collect();
    let pruned = store.prune(&live)?;
    let cached = store.attach(&model, &mut corpus.notes)?;

    if !json {
        println!("{} Embedding notes with {}...", "→".dimmed(), model.cyan());
    }

    let start = Instant::now();
    let backfill = session.backfill(&corpus.notes);
    store.save(&model, &backfill.embeddings)?;
    let duration_ms = start.elapsed().as_millis() as u64;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "model": model,
                "indexed": backfill.embeddings.len(),
                "cached": cached,
                "failed": backfill.failed.len(),
                "pruned": pruned,
                "provider_down": backfill.provider_down,
                "duration_ms": duration_ms,
            })
        );
    } else {
        println!();
        println!(
            "{} Indexed {} notes in {:.2}s",
            "✓".green().bold(),
            backfill.embeddings.len().to_string().cyan(),
            duration_ms as f64 / 1000.0
        );
        if cached > 0 {
            println!("  {} {} notes already cached", "→".dimmed(), cached);
        }
        if pruned > 0 {
            println!("  {} {} stale embeddings removed", "→".dimmed(), pruned);
        }
        if !backfill.failed.is_empty() {
            println!("  {} {} notes failed", "✗".red(), backfill.failed.len());
        }
        println!(
            "  {} Index saved to: {}",
            "→".dimmed(),
            workspace.paths().embeddings_db.display()
        );
    }

    if backfill.provider_down {
        bail!("embedding backend unavailable; run `ainotes index` again once it is reachable");
    }
    Ok(())
}

fn show_status(workspace: &Workspace, model: Option<&str>, json: bool) -> Result<()> {
    let note_count = workspace.store.load_notes()?.len();

    let Some(model) = model else {
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "model": null,
                    "note_count": note_count,
                    "embedding_count": 0,
                })
            );
        } else {
            println!("{}", "Index Status".bold());
            println!();
            println!("  {} No embedding backend configured (embedding.backend: none)", "!".yellow());
            println!("  {} {} notes, search is title/tag/content only", "→".dimmed(), note_count);
        }
        return Ok(());
    };

    let db_path = &workspace.paths().embeddings_db;
    let store = workspace.embedding_store()?;
    let stats = store.stats(model)?;

    let file_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "model": model,
                "note_count": note_count,
                "embedding_count": stats.embedding_count,
                "dimensions": stats.dimensions,
                "other_models": stats.other_models,
                "last_updated": stats.last_updated,
                "file_size_bytes": file_size,
            })
        );
        return Ok(());
    }

    println!("{}", "Index Status".bold());
    println!();
    println!("  {} Model: {}", "→".dimmed(), model.cyan());
    println!(
        "  {} {} of {} notes embedded",
        "→".dimmed(),
        stats.embedding_count.to_string().cyan(),
        note_count
    );
    if let Some(dimensions) = stats.dimensions {
        println!("  {} {} dimensions", "→".dimmed(), dimensions);
    }
    if stats.other_models > 0 {
        println!(
            "  {} {} other model(s) cached, ignored by search",
            "!".yellow(),
            stats.other_models
        );
    }
    println!("  {} Size: {:.2} KB", "→".dimmed(), file_size as f64 / 1024.0);
    if let Some(ts) = stats.last_updated {
        let dt = chrono::DateTime::from_timestamp(ts, 0)
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        println!("  {} Last updated: {}", "→".dimmed(), dt);
    }

    Ok(())
}
