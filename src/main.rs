mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::search::SearchArgs;

#[derive(Parser)]
#[command(name = "ainotes")]
#[command(about = "Notes with layered title, tag, content and semantic search", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Workspace directory (default: current directory)")]
    root: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Debug logging on stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create config.yaml, the notes directory and an empty tags file
    Init,
    /// Search notes, or list them when no query is given
    Search(SearchArgs),
    /// Compute embeddings for notes that lack one
    Index {
        #[arg(long, help = "Show index status only")]
        status: bool,
        #[arg(long, help = "Drop cached embeddings for the current model first")]
        rebuild: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// List tags with usage counts
    Tags {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ainotes=debug" } else { "ainotes=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = cli.root.as_deref();
    match cli.command {
        Commands::Init => commands::init::run(root),
        Commands::Search(args) => commands::search::run(root, args),
        Commands::Index {
            status,
            rebuild,
            json,
        } => commands::index::run(root, status, rebuild, json),
        Commands::Tags { json } => commands::tags::run(root, json),
    }
}
