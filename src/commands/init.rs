use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;

use ainotes::core::config::Config;

use super::Workspace;

pub fn run(root: Option<&Path>) -> Result<()> {
    let workspace = Workspace::open(root)?;
    let paths = workspace.paths();

    println!("{}", "Initializing notes workspace".bold());
    println!("{}", "=".repeat(50));
    println!();

    if paths.config.exists() {
        println!("{} {} exists", "✓".green(), paths.config.display());
    } else {
        let yaml = Config::default().to_yaml()?;
        fs::write(&paths.config, yaml)
            .with_context(|| format!("Failed to write {}", paths.config.display()))?;
        println!("{} Created {}", "✓".green(), paths.config.display());
    }

    let had_notes = paths.notes.is_dir();
    let had_tags = paths.tags.exists();
    workspace.store.ensure_layout()?;

    for (path, existed) in [(&paths.notes, had_notes), (&paths.tags, had_tags)] {
        if existed {
            println!("{} {} exists", "✓".green(), path.display());
        } else {
            println!("{} Created {}", "✓".green(), path.display());
        }
    }

    println!();
    println!(
        "Embedding backend: {}",
        format!("{:?}", workspace.config.embedding.backend).to_lowercase().cyan()
    );
    Ok(())
}
