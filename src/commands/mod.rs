//! Subcommand implementations and the workspace they share.

pub mod index;
pub mod init;
pub mod search;
pub mod tags;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use ainotes::core::config::{Config, EmbeddingBackend};
use ainotes::core::paths::NotesPaths;
use ainotes::core::store::NoteStore;
use ainotes::search::{EmbeddingProvider, EmbeddingStore, HtpProvider, OllamaProvider};

/// Configuration and on-disk layout resolved for one invocation.
pub struct Workspace {
    pub config: Config,
    pub store: NoteStore,
}

impl Workspace {
    pub fn open(root: Option<&Path>) -> Result<Self> {
        let root = match root {
            Some(root) => root.to_path_buf(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let config = Config::load(&root)?;
        let paths = NotesPaths::from_root(root, config.settings.debug);
        Ok(Self {
            config,
            store: NoteStore::new(paths),
        })
    }

    pub fn paths(&self) -> &NotesPaths {
        self.store.paths()
    }

    /// Fails with a hint when `init` has not been run.
    pub fn require_layout(&self) -> Result<()> {
        if !self.paths().notes.is_dir() {
            bail!(
                "notes directory {} not found (run `ainotes init` first)",
                self.paths().notes.display()
            );
        }
        Ok(())
    }

    /// Provider selected by `embedding.backend`; `None` for lexical-only search.
    pub fn provider(&self, lexical: bool) -> Result<Option<Box<dyn EmbeddingProvider>>> {
        if lexical {
            return Ok(None);
        }
        let provider: Box<dyn EmbeddingProvider> = match self.config.embedding.backend {
            EmbeddingBackend::None => return Ok(None),
            EmbeddingBackend::Htp => Box::new(HtpProvider::new()),
            EmbeddingBackend::Ollama => Box::new(
                OllamaProvider::from_config(&self.config.embedding)
                    .context("Failed to set up the Ollama client")?,
            ),
        };
        tracing::debug!(model = provider.model_id(), "embedding provider ready");
        Ok(Some(provider))
    }

    pub fn embedding_store(&self) -> Result<EmbeddingStore> {
        EmbeddingStore::open(&self.paths().embeddings_db)
    }
}
