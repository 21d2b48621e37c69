//! Search command - layered title/tag/content/semantic search

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::*;
use unicode_width::UnicodeWidthStr;

use ainotes::core::note::Note;
use ainotes::core::store::CorpusLoader;
use ainotes::search::session::resolve_tag_names;
use ainotes::search::{EmbeddingStore, MatchRecord, SearchRequest, SearchSession, SortMode};

use super::Workspace;

const TITLE_COLUMN: usize = 32;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to look for; omit to list notes
    pub query: Option<String>,
    #[arg(long = "tag", value_name = "NAME", help = "Only notes carrying this tag (repeatable)")]
    pub tags: Vec<String>,
    #[arg(long, help = "relevance | last-opened | created | title")]
    pub sort: Option<String>,
    #[arg(long, help = "Similarity threshold for semantic matches")]
    pub threshold: Option<f32>,
    #[arg(long, short, help = "Limit results")]
    pub limit: Option<usize>,
    #[arg(long, help = "JSON output")]
    pub json: bool,
    #[arg(long, help = "Skip embeddings, match title/tags/content only")]
    pub lexical: bool,
}

pub fn run(root: Option<&Path>, args: SearchArgs) -> Result<()> {
    let workspace = Workspace::open(root)?;
    workspace.require_layout()?;

    let mut corpus = workspace.store.load_corpus()?;
    let session = SearchSession::from_provider(workspace.provider(args.lexical)?);

    let mut embeddings = session
        .model_id()
        .and_then(|model| attach_cached(&workspace, model, &mut corpus.notes));

    let sort = match &args.sort {
        Some(raw) => raw.parse::<SortMode>()?,
        None => SortMode::Relevance,
    };
    let request = SearchRequest::new(args.query.as_deref().unwrap_or(""))
        .with_tags(resolve_tag_names(&corpus.tags, args.tags.as_slice())?)
        .sort_by(sort)
        .with_threshold(args.threshold.unwrap_or(workspace.config.search.threshold));

    let response = session.search(&corpus, &request)?;

    if let (Some(store), Some(model)) = (embeddings.as_mut(), session.model_id()) {
        if let Err(e) = store.save(model, &response.backfilled) {
            tracing::warn!(error = %e, "failed to persist backfilled embeddings");
        }
    }

    let limit = args.limit.or(workspace.config.search.limit);
    let results: Vec<&MatchRecord<'_>> = response
        .results
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    if args.json {
        let json_results: Vec<_> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.note.id,
                    "title": r.note.title,
                    "tier": r.tier,
                    "highlight": r.highlight,
                    "score": r.score,
                    "tags": r.note.tag_names(),
                    "created": r.note.created.to_rfc3339(),
                    "last_opened": r.note.last_opened.to_rfc3339(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "query": request.query.text(),
                "sort": sort.effective(&request.query).label(),
                "total": response.results.len(),
                "degraded": response.degraded,
                "backfilled": response.backfilled.len(),
                "results": json_results,
            }))?
        );
        return Ok(());
    }

    if response.degraded {
        eprintln!(
            "{} Embedding backend unavailable, showing title/tag/content matches only",
            "!".yellow().bold()
        );
    }

    if results.is_empty() {
        if request.query.is_empty() {
            println!("{} No notes", "→".dimmed());
        } else {
            println!("{} No results found for: {}", "→".dimmed(), request.query.text().cyan());
        }
        return Ok(());
    }

    if request.query.is_empty() {
        println!(
            "{} {} notes, sorted by {}",
            "→".dimmed(),
            response.results.len(),
            sort.effective(&request.query).label().to_lowercase()
        );
    } else {
        println!(
            "{} {} results for: {}",
            "→".dimmed(),
            response.results.len(),
            request.query.text().cyan()
        );
    }
    println!();

    for (i, record) in results.iter().enumerate() {
        print_card(i + 1, record);
    }

    if results.len() < response.results.len() {
        println!();
        println!(
            "  {} {} more (use --limit)",
            "→".dimmed(),
            response.results.len() - results.len()
        );
    }

    Ok(())
}

/// Fills cached vectors into `notes`. A broken cache only costs re-embedding,
/// so failures are logged and the search goes on without it.
fn attach_cached(workspace: &Workspace, model: &str, notes: &mut [Note]) -> Option<EmbeddingStore> {
    let opened = workspace.embedding_store().and_then(|store| {
        let attached = store.attach(model, notes)?;
        Ok((store, attached))
    });
    match opened {
        Ok((store, attached)) => {
            tracing::debug!(attached, "loaded cached embeddings");
            Some(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "embedding cache unavailable, searching without it");
            None
        }
    }
}

fn print_card(rank: usize, record: &MatchRecord<'_>) {
    let badge = match record.tier {
        Some(tier) => format!("[{}]", tier.as_str()),
        None => String::new(),
    };

    println!(
        "{}. {} {}",
        rank.to_string().bold(),
        pad(&record.note.title, TITLE_COLUMN).cyan(),
        badge.dimmed()
    );
    if !record.highlight.is_empty() {
        println!("   {}", render_highlight(&record.highlight));
    }

    let tags = record.note.tag_names();
    let mut meta = format!("last opened {}", record.note.last_opened.format("%Y-%m-%d %H:%M"));
    if !tags.is_empty() {
        meta = format!("{}  #{}", meta, tags.join(" #"));
    }
    println!("   {}", meta.dimmed());
}

/// Pads to a display width, so wide characters line up.
fn pad(text: &str, width: usize) -> String {
    let current = UnicodeWidthStr::width(text);
    if current >= width {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(width - current))
    }
}

/// Turns the `<u>..</u>` markers into terminal emphasis.
fn render_highlight(highlight: &str) -> String {
    let Some((before, rest)) = highlight.split_once("<u>") else {
        return highlight.to_string();
    };
    let Some((matched, after)) = rest.split_once("</u>") else {
        return highlight.to_string();
    };
    format!("{}{}{}", before, matched.bold().underline(), after)
}
