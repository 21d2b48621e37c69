//! Runs the matcher over a corpus snapshot and orders the hits.
//!
//! Relevance order concatenates the tiers title, tag, content, semantic;
//! only the semantic tier is sorted internally (descending similarity,
//! stable on ties). Any other sort mode re-sorts the whole list by its key.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::SearchError;
use super::matcher::{classify_lexical, classify_semantic, fold, semantic_label, Classification, MatchTier, Query};
use crate::core::note::{Embedding, Note};
use crate::core::tag::TagId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    Relevance,
    #[default]
    LastOpened,
    Created,
    Title,
}

impl SortMode {
    pub const ALL: [SortMode; 4] = [Self::Relevance, Self::LastOpened, Self::Created, Self::Title];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Relevance => "Relevance",
            Self::LastOpened => "Last opened",
            Self::Created => "Creation date",
            Self::Title => "Title",
        }
    }

    /// Sort modes that make sense for the given query; relevance needs a query.
    pub fn available(query: &Query) -> Vec<SortMode> {
        Self::ALL
            .into_iter()
            .filter(|mode| *mode != Self::Relevance || !query.is_empty())
            .collect()
    }

    /// Mode actually applied: without a query there is nothing to rank by relevance.
    pub fn effective(self, query: &Query) -> SortMode {
        if self == Self::Relevance && query.is_empty() {
            Self::default()
        } else {
            self
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "relevance" => Ok(Self::Relevance),
            "last-opened" | "opened" => Ok(Self::LastOpened),
            "created" | "creation-date" => Ok(Self::Created),
            "title" => Ok(Self::Title),
            _ => Err(SearchError::InvalidSortMode(s.to_string())),
        }
    }
}

/// A note as seen by the ranking engine, with the embedding to compare against.
///
/// The embedding may come from the note itself or from a backfill that has
/// not been written back yet, hence the separate lifetime.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a, 'e> {
    pub note: &'a Note,
    pub embedding: Option<&'e [f32]>,
}

impl<'a> Candidate<'a, 'a> {
    pub fn new(note: &'a Note) -> Self {
        Self {
            note,
            embedding: note.embedding.as_deref(),
        }
    }
}

/// One entry of a search result.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord<'a> {
    pub note: &'a Note,
    /// `None` when the corpus was listed without a query.
    pub tier: Option<MatchTier>,
    pub highlight: String,
    /// Cosine similarity for semantic hits, 0 otherwise.
    pub score: f32,
}

impl<'a> MatchRecord<'a> {
    fn unranked(note: &'a Note) -> Self {
        Self {
            note,
            tier: None,
            highlight: String::new(),
            score: 0.0,
        }
    }

    fn from_classification(note: &'a Note, classification: Classification) -> Option<Self> {
        let tier = classification.tier()?;
        let (highlight, score) = match classification {
            Classification::Title => (String::new(), 0.0),
            Classification::Tag { name } => (name, 0.0),
            Classification::Content { highlight } => (highlight, 0.0),
            Classification::Semantic { similarity } => (semantic_label(similarity), similarity),
            Classification::None => return None,
        };
        Some(Self {
            note,
            tier: Some(tier),
            highlight,
            score,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RankOptions<'r> {
    pub query: &'r Query,
    pub required_tags: &'r BTreeSet<TagId>,
    pub sort: SortMode,
    pub threshold: f32,
}

/// Keeps notes carrying every required tag (AND semantics).
pub fn prefilter<'a, 'e>(
    candidates: &[Candidate<'a, 'e>],
    required_tags: &BTreeSet<TagId>,
) -> Vec<Candidate<'a, 'e>> {
    candidates
        .iter()
        .filter(|c| c.note.has_all_tags(required_tags))
        .copied()
        .collect()
}

/// Classifies and orders `candidates`.
///
/// `embed_query` is invoked at most once, and only if some note missed every
/// lexical tier and has an embedding to compare against. Returning `None`
/// from it leaves the search lexical-only.
pub fn rank<'a, F>(
    candidates: &[Candidate<'a, '_>],
    options: &RankOptions<'_>,
    embed_query: F,
) -> Vec<MatchRecord<'a>>
where
    F: FnOnce() -> Option<Embedding>,
{
    let candidates = prefilter(candidates, options.required_tags);
    let sort = options.sort.effective(options.query);

    if options.query.is_empty() {
        let mut listing: Vec<MatchRecord<'a>> =
            candidates.iter().map(|c| MatchRecord::unranked(c.note)).collect();
        apply_sort(&mut listing, sort);
        return listing;
    }

    let mut title = Vec::new();
    let mut tag = Vec::new();
    let mut content = Vec::new();
    let mut pending = Vec::new();

    for candidate in &candidates {
        let classification = classify_lexical(candidate.note, options.query);
        match classification.tier() {
            Some(MatchTier::Title) => title.extend(MatchRecord::from_classification(candidate.note, classification)),
            Some(MatchTier::Tag) => tag.extend(MatchRecord::from_classification(candidate.note, classification)),
            Some(MatchTier::Content) => content.extend(MatchRecord::from_classification(candidate.note, classification)),
            _ => {
                if candidate.embedding.is_some() {
                    pending.push(*candidate);
                }
            }
        }
    }

    let mut semantic = Vec::new();
    if !pending.is_empty() {
        match embed_query() {
            Some(query_embedding) => {
                for candidate in &pending {
                    let classification =
                        classify_semantic(candidate.embedding, Some(&query_embedding), options.threshold);
                    semantic.extend(MatchRecord::from_classification(candidate.note, classification));
                }
            }
            None => tracing::debug!(skipped = pending.len(), "no query embedding, semantic tier skipped"),
        }
    }
    semantic.sort_by(|a, b| b.score.total_cmp(&a.score));

    tracing::debug!(
        title = title.len(),
        tag = tag.len(),
        content = content.len(),
        semantic = semantic.len(),
        "classified notes"
    );

    let mut results = title;
    results.extend(tag);
    results.extend(content);
    results.extend(semantic);

    apply_sort(&mut results, sort);
    results
}

/// Stable re-sort by the requested key; relevance keeps tier order.
pub fn apply_sort(records: &mut [MatchRecord<'_>], sort: SortMode) {
    match sort {
        SortMode::Relevance => {}
        SortMode::LastOpened => records.sort_by(|a, b| b.note.last_opened.cmp(&a.note.last_opened)),
        SortMode::Created => records.sort_by(|a, b| b.note.created.cmp(&a.note.created)),
        SortMode::Title => records.sort_by(|a, b| compare_titles(&a.note.title, &b.note.title)),
    }
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    fold(a).cmp(&fold(b))
}
