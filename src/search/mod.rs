//! Layered note search.
//!
//! A query is matched against each note by title, then tags, then content,
//! then embedding similarity. The first tier that fires classifies the note;
//! results are grouped by tier and sorted according to the requested mode.

pub mod embedding;
pub mod embedding_store;
pub mod error;
pub mod matcher;
pub mod ollama;
pub mod ranking;
pub mod session;
pub mod similarity;

#[cfg(test)]
pub(crate) mod testing;

pub use embedding::{EmbeddingProvider, HtpProvider, ProviderError};
pub use embedding_store::EmbeddingStore;
pub use error::SearchError;
pub use matcher::{MatchTier, Query};
pub use ollama::OllamaProvider;
pub use ranking::{MatchRecord, SortMode};
pub use session::{SearchRequest, SearchResponse, SearchSession};
