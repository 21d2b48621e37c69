use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tag::{Tag, TagId};

/// Dense embedding vector produced by an embedding provider.
pub type Embedding = Vec<f32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub i64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub tags: Vec<Tag>,
    /// `None` until the embedding has been computed for the current model.
    #[serde(skip)]
    pub embedding: Option<Embedding>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub last_opened: DateTime<Utc>,
}

impl Note {
    pub fn new(id: NoteId, title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            embedding: None,
            created: now,
            last_modified: now,
            last_opened: now,
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        for tag in tags {
            if !self.has_tag(tag.id) {
                self.tags.push(tag);
            }
        }
        self
    }

    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn has_tag(&self, id: TagId) -> bool {
        self.tags.iter().any(|t| t.id == id)
    }

    pub fn has_all_tags<'a>(&self, ids: impl IntoIterator<Item = &'a TagId>) -> bool {
        ids.into_iter().all(|id| self.has_tag(*id))
    }

    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }

    /// Replaces the embedding as a whole; readers never observe a partial vector.
    pub fn set_embedding(&mut self, embedding: Embedding) {
        self.embedding = Some(embedding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: i64, name: &str) -> Tag {
        Tag::new(TagId(id), name, "#ff0000")
    }

    #[test]
    fn test_with_tags_skips_duplicates() {
        let note = Note::new(NoteId(1), "Groceries", "")
            .with_tags([tag(1, "home"), tag(2, "errands"), tag(1, "home")]);

        assert_eq!(note.tags.len(), 2);
        assert_eq!(note.tag_names(), vec!["home", "errands"]);
    }

    #[test]
    fn test_has_all_tags_is_conjunctive() {
        let note = Note::new(NoteId(1), "Groceries", "").with_tags([tag(1, "home")]);

        assert!(note.has_all_tags(&[TagId(1)]));
        assert!(!note.has_all_tags(&[TagId(1), TagId(2)]));
        assert!(note.has_all_tags(&[]));
    }

    #[test]
    fn test_set_embedding_replaces_vector() {
        let mut note = Note::new(NoteId(1), "Groceries", "").with_embedding(vec![1.0, 0.0]);
        note.set_embedding(vec![0.0, 1.0, 0.5]);

        assert_eq!(note.embedding.as_deref(), Some(&[0.0, 1.0, 0.5][..]));
    }
}
