use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::note::Note;

lazy_static! {
    // Characters that cannot appear in a note file name on common filesystems.
    static ref UNSAFE_TITLE_RE: Regex = Regex::new(r#"[/\\:*?"<>|\x00-\x1F\x7F]"#).unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub enum NoteViolation {
    EmptyTitle,
    UnsafeTitle(String),
    DuplicateTitle(String),
    DuplicateTag(String),
}

impl std::fmt::Display for NoteViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Note title is empty"),
            Self::UnsafeTitle(t) => write!(f, "Title is not a valid file name: {}", t),
            Self::DuplicateTitle(t) => write!(f, "Another note already uses the title: {}", t),
            Self::DuplicateTag(t) => write!(f, "Tag assigned more than once: {}", t),
        }
    }
}

pub fn validate_title(title: &str) -> Result<(), NoteViolation> {
    if title.is_empty() {
        return Err(NoteViolation::EmptyTitle);
    }
    if UNSAFE_TITLE_RE.is_match(title)
        || title == "."
        || title == ".."
        || title.trim() != title
    {
        return Err(NoteViolation::UnsafeTitle(title.to_string()));
    }
    Ok(())
}

/// Checks one note against the corpus invariants, given the titles already accepted.
pub fn validate_note(note: &Note, seen_titles: &HashSet<String>) -> Vec<NoteViolation> {
    let mut violations = Vec::new();

    if let Err(v) = validate_title(&note.title) {
        violations.push(v);
    }
    if seen_titles.contains(&note.title) {
        violations.push(NoteViolation::DuplicateTitle(note.title.clone()));
    }

    let mut tag_ids = HashSet::new();
    for tag in &note.tags {
        if !tag_ids.insert(tag.id) {
            violations.push(NoteViolation::DuplicateTag(tag.name.clone()));
        }
    }

    violations
}
