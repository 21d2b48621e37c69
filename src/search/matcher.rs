//! Classifies a single note against a query.
//!
//! Tiers are tried in priority order and the first hit wins:
//! title, tag, content, then semantic similarity. Lexical checks are
//! case-insensitive substring tests on a case-folded copy of the text.

use serde::Serialize;

use super::similarity::{cosine_similarity, match_strength};
use crate::core::note::Note;

/// Characters of context kept on each side of a content hit.
pub const CONTEXT_CHARS: usize = 10;

const EMPHASIS_OPEN: &str = "<u>";
const EMPHASIS_CLOSE: &str = "</u>";

/// Match categories, declared in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Title,
    Tag,
    Content,
    Semantic,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Tag => "tag",
            Self::Content => "content",
            Self::Semantic => "semantic",
        }
    }
}

/// Outcome of classifying one note.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Title,
    Tag { name: String },
    Content { highlight: String },
    Semantic { similarity: f32 },
    None,
}

impl Classification {
    pub fn tier(&self) -> Option<MatchTier> {
        match self {
            Self::Title => Some(MatchTier::Title),
            Self::Tag { .. } => Some(MatchTier::Tag),
            Self::Content { .. } => Some(MatchTier::Content),
            Self::Semantic { .. } => Some(MatchTier::Semantic),
            Self::None => None,
        }
    }
}

/// A trimmed query together with its case-folded form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    folded: String,
}

impl Query {
    pub fn new(raw: &str) -> Self {
        let text = raw.trim().to_string();
        let folded = fold(&text);
        Self { text, folded }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }

    /// An empty query matches nothing lexically; callers list the corpus instead.
    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }
}

/// Lower-cases character by character so byte offsets can be mapped back.
pub fn fold(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

fn contains_folded(haystack: &str, query: &Query) -> bool {
    !query.is_empty() && fold(haystack).contains(query.folded())
}

/// Tiers 1-3. Returns [`Classification::None`] when no lexical tier fires.
pub fn classify_lexical(note: &Note, query: &Query) -> Classification {
    if query.is_empty() {
        return Classification::None;
    }

    if contains_folded(&note.title, query) {
        return Classification::Title;
    }

    if let Some(tag) = note.tags.iter().find(|t| contains_folded(&t.name, query)) {
        return Classification::Tag {
            name: tag.name.clone(),
        };
    }

    if let Some(highlight) = content_highlight(&note.content, query) {
        return Classification::Content { highlight };
    }

    Classification::None
}

/// Tier 4. Malformed or missing embeddings never match.
pub fn classify_semantic(
    note_embedding: Option<&[f32]>,
    query_embedding: Option<&[f32]>,
    threshold: f32,
) -> Classification {
    let (Some(note_embedding), Some(query_embedding)) = (note_embedding, query_embedding) else {
        return Classification::None;
    };

    match cosine_similarity(query_embedding, note_embedding) {
        Ok(similarity) if similarity > threshold => Classification::Semantic { similarity },
        Ok(_) => Classification::None,
        Err(e) => {
            tracing::trace!(error = %e, "embedding excluded from semantic tier");
            Classification::None
        }
    }
}

/// Full precedence chain; the semantic tier is only consulted when tiers 1-3 miss.
pub fn classify(
    note: &Note,
    note_embedding: Option<&[f32]>,
    query: &Query,
    query_embedding: Option<&[f32]>,
    threshold: f32,
) -> Classification {
    match classify_lexical(note, query) {
        Classification::None if !query.is_empty() => {
            classify_semantic(note_embedding, query_embedding, threshold)
        }
        lexical => lexical,
    }
}

/// Highlight text shown with a semantic hit.
pub fn semantic_label(similarity: f32) -> String {
    format!("{}% match", match_strength(similarity))
}

/// Builds `...left<u>match</u>right...` around the first case-insensitive hit.
///
/// The matched span is copied verbatim from `content`, context is limited to
/// [`CONTEXT_CHARS`] characters per side, and newlines become spaces.
pub fn content_highlight(content: &str, query: &Query) -> Option<String> {
    let (start, end) = find_folded(content, query.folded())?;

    let left: String = {
        let mut chars: Vec<char> = content[..start].chars().rev().take(CONTEXT_CHARS).collect();
        chars.reverse();
        chars.into_iter().collect()
    };
    let right: String = content[end..].chars().take(CONTEXT_CHARS).collect();

    Some(format!(
        "...{}{}{}{}{}...",
        collapse_newlines(&left).trim_start(),
        EMPHASIS_OPEN,
        collapse_newlines(&content[start..end]),
        EMPHASIS_CLOSE,
        collapse_newlines(&right).trim_end(),
    ))
}

fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Byte range in `haystack` of the first occurrence of `needle` after folding.
fn find_folded(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }

    // One entry per folded char: (offset in folded, original start, original end).
    let mut folded = String::with_capacity(haystack.len());
    let mut spans: Vec<(usize, usize, usize)> = Vec::with_capacity(haystack.len());
    for (orig_start, ch) in haystack.char_indices() {
        let orig_end = orig_start + ch.len_utf8();
        for lower in ch.to_lowercase() {
            spans.push((folded.len(), orig_start, orig_end));
            folded.push(lower);
        }
    }

    let hit = folded.find(needle)?;
    let hit_end = hit + needle.len();

    let start = spans.iter().find(|(pos, _, _)| *pos == hit)?.1;
    let end = spans
        .iter()
        .take_while(|(pos, _, _)| *pos < hit_end)
        .last()?
        .2;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::note::NoteId;
    use crate::core::tag::{Tag, TagId};

    fn note(title: &str, content: &str, tags: &[&str]) -> Note {
        Note::new(NoteId(1), title, content).with_tags(
            tags.iter()
                .enumerate()
                .map(|(i, name)| Tag::new(TagId(i as i64 + 1), *name, "#000000")),
        )
    }

    #[test]
    fn test_title_tier_case_insensitive() {
        let n = note("Meeting Notes", "", &[]);
        assert_eq!(classify_lexical(&n, &Query::new("meeting")), Classification::Title);
        assert_eq!(classify_lexical(&n, &Query::new("NOTES")), Classification::Title);
    }

    #[test]
    fn test_title_beats_similarity() {
        let n = note("Meeting notes", "", &[]);
        let classified = classify(&n, Some(&[1.0, 0.0]), &Query::new("meeting"), Some(&[1.0, 0.0]), 0.55);
        assert_eq!(classified, Classification::Title);
    }

    #[test]
    fn test_tag_beats_content() {
        let n = note("Groceries", "remember the work laptop", &["home", "Work"]);
        assert_eq!(
            classify_lexical(&n, &Query::new("work")),
            Classification::Tag { name: "Work".to_string() }
        );
    }

    #[test]
    fn test_first_matching_tag_is_reported() {
        let n = note("Groceries", "", &["project-a", "project-b"]);
        assert_eq!(
            classify_lexical(&n, &Query::new("project")),
            Classification::Tag { name: "project-a".to_string() }
        );
    }

    #[test]
    fn test_content_highlight() {
        let n = note("Shopping", "buy milk and meeting snacks", &[]);
        assert_eq!(
            classify_lexical(&n, &Query::new("meeting")),
            Classification::Content {
                highlight: "...milk and <u>meeting</u> snacks...".to_string()
            }
        );
    }

    #[test]
    fn test_content_highlight_keeps_original_case() {
        let hl = content_highlight("Call MEETING room", &Query::new("meeting")).unwrap();
        assert_eq!(hl, "...Call <u>MEETING</u> room...");
    }

    #[test]
    fn test_content_highlight_collapses_newlines() {
        let hl = content_highlight("one line\nkeyword\nnext", &Query::new("keyword")).unwrap();
        assert_eq!(hl, "...one line <u>keyword</u> next...");
    }

    #[test]
    fn test_content_highlight_limits_context() {
        let content = "0123456789abcdefghij KEY 0123456789abcdefghij";
        let hl = content_highlight(content, &Query::new("key")).unwrap();
        assert_eq!(hl, "...bcdefghij <u>KEY</u> 012345678...");
    }

    #[test]
    fn test_content_highlight_multibyte() {
        let hl = content_highlight("Café ÜBER alles", &Query::new("über")).unwrap();
        assert_eq!(hl, "...Café <u>ÜBER</u> alles...");
    }

    #[test]
    fn test_content_highlight_uses_first_occurrence() {
        let hl = content_highlight("a cat, then another cat", &Query::new("cat")).unwrap();
        assert_eq!(hl, "...a <u>cat</u>, then ano...");
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let n = note("Anything", "some content", &["tag"]);
        assert_eq!(classify_lexical(&n, &Query::new("")), Classification::None);
        assert_eq!(classify_lexical(&n, &Query::new("   ")), Classification::None);
        assert_eq!(
            classify(&n, Some(&[1.0]), &Query::new(""), Some(&[1.0]), 0.0),
            Classification::None
        );
    }

    #[test]
    fn test_semantic_threshold_is_strict() {
        let q = [1.0, 0.0];
        assert_eq!(
            classify_semantic(Some(&[1.0, 0.0]), Some(&q), 0.55),
            Classification::Semantic { similarity: 1.0 }
        );
        // cos = 0 is not above a 0.0 threshold
        assert_eq!(classify_semantic(Some(&[0.0, 1.0]), Some(&q), 0.0), Classification::None);
    }

    #[test]
    fn test_semantic_requires_both_embeddings() {
        assert_eq!(classify_semantic(None, Some(&[1.0]), 0.1), Classification::None);
        assert_eq!(classify_semantic(Some(&[1.0]), None, 0.1), Classification::None);
    }

    #[test]
    fn test_semantic_malformed_embedding_excluded() {
        let q = [1.0, 0.0, 0.0];
        assert_eq!(classify_semantic(Some(&[1.0, 0.0]), Some(&q), 0.1), Classification::None);
        assert_eq!(classify_semantic(Some(&[0.0, 0.0, 0.0]), Some(&q), 0.1), Classification::None);
        assert_eq!(classify_semantic(Some(&[]), Some(&q), 0.1), Classification::None);
    }

    #[test]
    fn test_semantic_only_after_lexical_miss() {
        let n = note("Roadmap", "quarterly plan", &[]);
        let classified = classify(&n, Some(&[0.0, 1.0]), &Query::new("strategy"), Some(&[0.0, 1.0]), 0.55);
        assert_eq!(classified, Classification::Semantic { similarity: 1.0 });
        assert_eq!(classified.tier(), Some(MatchTier::Semantic));
    }

    #[test]
    fn test_semantic_label() {
        assert_eq!(semantic_label(0.55), "84% match");
        assert_eq!(semantic_label(1.0), "100% match");
    }

    #[test]
    fn test_tier_priority_order() {
        assert!(MatchTier::Title < MatchTier::Tag);
        assert!(MatchTier::Tag < MatchTier::Content);
        assert!(MatchTier::Content < MatchTier::Semantic);
    }
}
