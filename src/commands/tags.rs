use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use colored::*;
use serde::Serialize;

use ainotes::core::note::Note;
use ainotes::core::store::CorpusLoader;
use ainotes::core::tag::{Tag, TagId};

#[derive(Serialize)]
struct TagsResult {
    total_notes: usize,
    notes_without_tags: usize,
    tags: Vec<TagUsage>,
}

#[derive(Serialize)]
struct TagUsage {
    id: TagId,
    name: String,
    color: String,
    count: usize,
}

pub fn run(root: Option<&Path>, json: bool) -> Result<()> {
    let workspace = super::Workspace::open(root)?;
    workspace.require_layout()?;

    let corpus = workspace.store.load_corpus()?;
    let result = summarize(&corpus.tags, &corpus.notes);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", "Tags".bold());
    println!("{}", "=".repeat(50));
    println!();

    if result.tags.is_empty() {
        println!("{} No tags defined", "→".dimmed());
    }
    for usage in &result.tags {
        let count = if usage.count == 0 {
            usage.count.to_string().dimmed()
        } else {
            usage.count.to_string().green()
        };
        println!("  {:>4}  {} {}", count, usage.name.cyan(), usage.color.dimmed());
    }

    println!();
    println!("Notes: {}", result.total_notes.to_string().green());
    println!(
        "Notes without tags: {}",
        if result.notes_without_tags > 0 {
            result.notes_without_tags.to_string().yellow()
        } else {
            result.notes_without_tags.to_string().green()
        }
    );

    Ok(())
}

/// Usage counts per tag, most used first, then by name.
fn summarize(tags: &[Tag], notes: &[Note]) -> TagsResult {
    let mut counts: HashMap<TagId, usize> = HashMap::new();
    for note in notes {
        for tag in &note.tags {
            *counts.entry(tag.id).or_default() += 1;
        }
    }

    let mut usage: Vec<TagUsage> = tags
        .iter()
        .map(|t| TagUsage {
            id: t.id,
            name: t.name.clone(),
            color: t.color.clone(),
            count: counts.get(&t.id).copied().unwrap_or(0),
        })
        .collect();
    usage.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

    TagsResult {
        total_notes: notes.len(),
        notes_without_tags: notes.iter().filter(|n| n.tags.is_empty()).count(),
        tags: usage,
    }
}
