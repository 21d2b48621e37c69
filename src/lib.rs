//! ainotes library
//!
//! Note corpus storage and layered search.
//!
//! # Modules
//!
//! - `core`: Notes, tags, on-disk layout, configuration
//! - `search`: Matching, ranking, embedding providers and the embedding cache

pub mod core;
pub mod search;

// Re-exports for convenience
pub use crate::core::config::Config;
pub use crate::core::note::{Embedding, Note, NoteId};
pub use crate::core::paths::NotesPaths;
pub use crate::core::store::{Corpus, CorpusLoader, NoteStore};
pub use crate::core::tag::{Tag, TagId};
pub use crate::search::{SearchError, SearchRequest, SearchResponse, SearchSession, SortMode};
