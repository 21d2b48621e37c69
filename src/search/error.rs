use crate::core::tag::TagId;

/// Request-level errors surfaced to the caller.
///
/// Provider failures and malformed embeddings are recovered inside the
/// search and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("unknown tag in filter: {0}")]
    InvalidTagFilter(TagId),

    #[error("unknown tag name in filter: {0}")]
    UnknownTagName(String),

    #[error("invalid sort mode '{0}' (expected: relevance|last-opened|created|title)")]
    InvalidSortMode(String),

    #[error("similarity threshold must be a number between -1 and 1, got {0}")]
    InvalidThreshold(f32),
}
