//! Workspace configuration (`config.yaml`).
//!
//! Every field has a default so a missing file, or a file that only sets a
//! few keys, still yields a usable configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::paths::CONFIG_FILE;

pub const DEFAULT_THRESHOLD: f32 = 0.55;
const DEFAULT_OLLAMA_HOST: &str = "127.0.0.1";
const DEFAULT_OLLAMA_PORT: u16 = 11434;
const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Use the `debug-notes` directory instead of `notes`
    #[serde(default)]
    pub debug: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Ollama,
    /// Offline harmonic token projection, no server required
    Htp,
    /// Lexical tiers only
    None,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound for a single embedding round trip
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            host: default_host(),
            port: default_port(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum cosine similarity for the semantic tier
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Number of results printed by `ainotes search` unless `--limit` is given
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            limit: None,
        }
    }
}

fn default_host() -> String {
    DEFAULT_OLLAMA_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_OLLAMA_PORT
}

fn default_model() -> String {
    DEFAULT_EMBED_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

impl Config {
    /// Loads `config.yaml` from `root`, falling back to defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_yaml(&raw)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map.
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.search.threshold;
        if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
            bail!(
                "search.threshold must be between -1.0 and 1.0, got {}",
                threshold
            );
        }
        if self.embedding.timeout_secs == 0 {
            bail!("embedding.timeout_secs must be greater than 0");
        }
        if self.embedding.backend == EmbeddingBackend::Ollama && self.embedding.model.trim().is_empty() {
            bail!("embedding.model must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("").unwrap();

        assert!(!config.settings.debug);
        assert_eq!(config.embedding.backend, EmbeddingBackend::Ollama);
        assert_eq!(config.embedding.base_url(), "http://127.0.0.1:11434");
        assert_eq!(config.embedding.timeout(), Duration::from_secs(10));
        assert!((config.search.threshold - 0.55).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_file() {
        let raw = "settings:\n  debug: true\nembedding:\n  backend: htp\nsearch:\n  threshold: 0.7\n";
        let config = Config::from_yaml(raw).unwrap();

        assert!(config.settings.debug);
        assert_eq!(config.embedding.backend, EmbeddingBackend::Htp);
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert!((config.search.threshold - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        assert!(Config::from_yaml("search:\n  threshold: 1.5\n").is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(Config::from_yaml("embedding:\n  timeout_secs: 0\n").is_err());
    }

    #[test]
    fn test_yaml_roundtrip_keeps_backend() {
        let mut config = Config::default();
        config.embedding.backend = EmbeddingBackend::None;

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("backend: none"));
        assert_eq!(Config::from_yaml(&yaml).unwrap().embedding.backend, EmbeddingBackend::None);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.embedding.port, 11434);
    }
}
