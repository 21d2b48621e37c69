use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub i64);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A label that can be assigned to notes. Identity is the id alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
}

impl Tag {
    pub fn new(id: TagId, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
        }
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Finds a tag by name, ignoring case.
pub fn find_by_name<'a>(tags: &'a [Tag], name: &str) -> Option<&'a Tag> {
    let name = name.to_lowercase();
    tags.iter().find(|t| t.name.to_lowercase() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_by_id() {
        let a = Tag::new(TagId(7), "work", "#000000");
        let b = Tag::new(TagId(7), "renamed", "#ffffff");
        let c = Tag::new(TagId(8), "work", "#000000");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_find_by_name_ignores_case() {
        let tags = vec![Tag::new(TagId(1), "Work", "#000000"), Tag::new(TagId(2), "Ideas", "#111111")];

        assert_eq!(find_by_name(&tags, "ideas").map(|t| t.id), Some(TagId(2)));
        assert_eq!(find_by_name(&tags, "WORK").map(|t| t.id), Some(TagId(1)));
        assert!(find_by_name(&tags, "missing").is_none());
    }
}
