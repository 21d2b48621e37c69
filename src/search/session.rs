//! Search entry point.
//!
//! A search reads a corpus snapshot, computes embeddings for notes that lack
//! one, ranks, and hands the new embeddings back to the caller. Notes are
//! never mutated here; persisting [`SearchResponse::backfilled`] is the
//! caller's job.

use std::collections::{BTreeMap, BTreeSet};

use super::embedding::EmbeddingProvider;
use super::error::SearchError;
use super::matcher::Query;
use super::ranking::{rank, Candidate, MatchRecord, RankOptions, SortMode};
use crate::core::config::DEFAULT_THRESHOLD;
use crate::core::note::{Embedding, Note, NoteId};
use crate::core::store::Corpus;
use crate::core::tag::{find_by_name, Tag, TagId};

/// Parameters of one search call.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: Query,
    pub tag_filters: BTreeSet<TagId>,
    pub sort: SortMode,
    pub threshold: f32,
}

impl SearchRequest {
    pub fn new(query: &str) -> Self {
        Self {
            query: Query::new(query),
            tag_filters: BTreeSet::new(),
            sort: SortMode::Relevance,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TagId>) -> Self {
        self.tag_filters.extend(tags);
        self
    }

    pub fn sort_by(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Rejects filters naming tags outside `tags` and out-of-range thresholds.
    pub fn validate(&self, tags: &[Tag]) -> Result<(), SearchError> {
        if !self.threshold.is_finite() || !(-1.0..=1.0).contains(&self.threshold) {
            return Err(SearchError::InvalidThreshold(self.threshold));
        }
        if let Some(unknown) = self
            .tag_filters
            .iter()
            .find(|id| !tags.iter().any(|t| t.id == **id))
        {
            return Err(SearchError::InvalidTagFilter(*unknown));
        }
        Ok(())
    }
}

/// Maps user-facing tag names to ids, case-insensitively.
pub fn resolve_tag_names<S: AsRef<str>>(tags: &[Tag], names: &[S]) -> Result<BTreeSet<TagId>, SearchError> {
    names
        .iter()
        .map(|name| {
            find_by_name(tags, name.as_ref())
                .map(|t| t.id)
                .ok_or_else(|| SearchError::UnknownTagName(name.as_ref().to_string()))
        })
        .collect()
}

/// Embeddings computed for notes that had none.
#[derive(Debug, Default)]
pub struct Backfill {
    pub embeddings: BTreeMap<NoteId, Embedding>,
    /// Notes the provider rejected individually.
    pub failed: Vec<NoteId>,
    /// Set once the provider is unreachable; remaining notes were not attempted.
    pub provider_down: bool,
}

#[derive(Debug)]
pub struct SearchResponse<'a> {
    pub results: Vec<MatchRecord<'a>>,
    /// Fresh embeddings the caller should persist.
    pub backfilled: BTreeMap<NoteId, Embedding>,
    /// The provider failed during this call and the semantic tier was partial or skipped.
    pub degraded: bool,
}

impl SearchResponse<'_> {
    /// Notes whose embedding changed during this call.
    pub fn dirty(&self) -> BTreeSet<NoteId> {
        self.backfilled.keys().copied().collect()
    }
}

/// Holds the embedding capability used by searches. Holds no per-search state,
/// so one session can serve concurrent searches.
pub struct SearchSession {
    provider: Option<Box<dyn EmbeddingProvider>>,
}

impl SearchSession {
    pub fn new(provider: impl EmbeddingProvider + 'static) -> Self {
        Self {
            provider: Some(Box::new(provider)),
        }
    }

    pub fn from_provider(provider: Option<Box<dyn EmbeddingProvider>>) -> Self {
        Self { provider }
    }

    /// Title, tag and content matching only; the semantic tier never fires.
    pub fn lexical_only() -> Self {
        Self { provider: None }
    }

    pub fn model_id(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.model_id())
    }

    /// Computes embeddings for every note that lacks one.
    ///
    /// Stops at the first unavailable-provider error. Per-note failures are
    /// logged and the note is skipped. Notes with blank content are left alone.
    pub fn backfill(&self, notes: &[Note]) -> Backfill {
        let mut backfill = Backfill::default();
        let Some(provider) = self.provider.as_deref() else {
            return backfill;
        };

        for note in notes.iter().filter(|n| n.embedding.is_none()) {
            if note.content.trim().is_empty() {
                tracing::trace!(note = %note.id, "blank content, no embedding");
                continue;
            }
            match provider.embed(&note.content) {
                Ok(embedding) if !embedding.is_empty() => {
                    backfill.embeddings.insert(note.id, embedding);
                }
                Ok(_) => {
                    tracing::warn!(note = %note.id, "provider returned an empty embedding");
                    backfill.failed.push(note.id);
                }
                Err(e) if e.is_unavailable() => {
                    tracing::warn!(error = %e, "embedding provider unavailable, backfill stopped");
                    backfill.provider_down = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(note = %note.id, error = %e, "failed to embed note");
                    backfill.failed.push(note.id);
                }
            }
        }

        if !backfill.embeddings.is_empty() {
            tracing::info!(
                model = provider.model_id(),
                count = backfill.embeddings.len(),
                "backfilled embeddings"
            );
        }
        backfill
    }

    /// Runs one search over `corpus`.
    ///
    /// Only invalid requests fail. Provider trouble degrades the result to the
    /// lexical tiers and is reported through [`SearchResponse::degraded`].
    #[tracing::instrument(skip_all, fields(query = %request.query.text(), sort = %request.sort))]
    pub fn search<'a>(&self, corpus: &'a Corpus, request: &SearchRequest) -> Result<SearchResponse<'a>, SearchError> {
        request.validate(&corpus.tags)?;

        let backfill = self.backfill(&corpus.notes);
        let candidates: Vec<Candidate<'a, '_>> = corpus
            .notes
            .iter()
            .map(|note| Candidate {
                note,
                embedding: note
                    .embedding
                    .as_deref()
                    .or_else(|| backfill.embeddings.get(&note.id).map(Vec::as_slice)),
            })
            .collect();

        let options = RankOptions {
            query: &request.query,
            required_tags: &request.tag_filters,
            sort: request.sort,
            threshold: request.threshold,
        };

        let mut query_failed = false;
        let provider = self.provider.as_deref().filter(|_| !backfill.provider_down);
        let results = rank(&candidates, &options, || {
            let provider = provider?;
            match provider.embed(request.query.text()) {
                Ok(embedding) => Some(embedding),
                Err(e) => {
                    tracing::warn!(error = %e, "query embedding failed, falling back to lexical matching");
                    query_failed = true;
                    None
                }
            }
        });

        tracing::debug!(results = results.len(), backfilled = backfill.embeddings.len(), "search complete");

        Ok(SearchResponse {
            results,
            backfilled: backfill.embeddings,
            degraded: backfill.provider_down || query_failed,
        })
    }
}
