//! File-backed corpus: one `<title>.note` JSON file per note plus `tags.json`.
//!
//! The search core only reads from here. Embeddings live in
//! [`crate::search::EmbeddingStore`], never in the note files.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::note::{Note, NoteId};
use super::paths::NotesPaths;
use super::schema::validate_note;
use super::tag::{Tag, TagId};

/// Read access to the current note/tag corpus.
pub trait CorpusLoader {
    fn load_notes(&self) -> Result<Vec<Note>>;
    fn load_tags(&self) -> Result<Vec<Tag>>;

    fn load_corpus(&self) -> Result<Corpus> {
        let tags = self.load_tags()?;
        let notes = self.load_notes()?;
        Ok(Corpus { notes, tags })
    }
}

/// A snapshot of every note and tag, taken once per search.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub notes: Vec<Note>,
    pub tags: Vec<Tag>,
}

/// On-disk shape of a note. Extra fields written by other tools are ignored.
#[derive(Debug, Serialize, Deserialize)]
struct StoredNote {
    id: i64,
    title: String,
    #[serde(default)]
    content: String,
    #[serde(with = "unix_seconds")]
    created: DateTime<Utc>,
    #[serde(with = "unix_seconds")]
    last_modified: DateTime<Utc>,
    #[serde(with = "unix_seconds")]
    last_opened: DateTime<Utc>,
    #[serde(default)]
    tag_ids: Vec<i64>,
}

impl StoredNote {
    fn from_note(note: &Note) -> Self {
        Self {
            id: note.id.0,
            title: note.title.clone(),
            content: note.content.clone(),
            created: note.created,
            last_modified: note.last_modified,
            last_opened: note.last_opened,
            tag_ids: note.tags.iter().map(|t| t.id.0).collect(),
        }
    }

    /// Tag ids that no longer resolve (deleted tags) are dropped.
    fn into_note(self, tags_by_id: &HashMap<TagId, &Tag>) -> Note {
        let mut tags: Vec<Tag> = Vec::new();
        for id in self.tag_ids.into_iter().map(TagId) {
            match tags_by_id.get(&id) {
                Some(tag) if !tags.iter().any(|t| t.id == id) => tags.push((*tag).clone()),
                Some(_) => {}
                None => tracing::debug!(note = %self.title, tag_id = %id, "dropping unknown tag"),
            }
        }

        Note {
            id: NoteId(self.id),
            title: self.title,
            content: self.content,
            tags,
            embedding: None,
            created: self.created,
            last_modified: self.last_modified,
            last_opened: self.last_opened,
        }
    }
}

pub struct NoteStore {
    paths: NotesPaths,
}

impl NoteStore {
    pub fn new(paths: NotesPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &NotesPaths {
        &self.paths
    }

    /// Creates the notes directory and an empty tags file when missing.
    pub fn ensure_layout(&self) -> Result<()> {
        fs::create_dir_all(&self.paths.notes)
            .with_context(|| format!("Failed to create {}", self.paths.notes.display()))?;
        if !self.paths.tags.exists() {
            fs::write(&self.paths.tags, "[]")
                .with_context(|| format!("Failed to create {}", self.paths.tags.display()))?;
        }
        Ok(())
    }

    /// Writes a note file. Used to seed fixtures; the search core never calls it.
    pub fn write_note(&self, note: &Note) -> Result<()> {
        let json = serde_json::to_string_pretty(&StoredNote::from_note(note))?;
        fs::write(self.paths.note_file(&note.title), json)?;
        Ok(())
    }

    pub fn write_tags(&self, tags: &[Tag]) -> Result<()> {
        fs::write(&self.paths.tags, serde_json::to_string(tags)?)?;
        Ok(())
    }

    fn read_note(path: &Path) -> Result<StoredNote> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl CorpusLoader for NoteStore {
    fn load_tags(&self) -> Result<Vec<Tag>> {
        if !self.paths.tags.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.paths.tags)
            .with_context(|| format!("Failed to read {}", self.paths.tags.display()))?;
        let mut tags: Vec<Tag> = serde_json::from_str(&raw)
            .with_context(|| format!("Malformed tags file {}", self.paths.tags.display()))?;
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    fn load_notes(&self) -> Result<Vec<Note>> {
        let tags = self.load_tags()?;
        self.load_notes_with(&tags)
    }

    /// Reads `tags.json` once so the notes and the tag list agree.
    fn load_corpus(&self) -> Result<Corpus> {
        let tags = self.load_tags()?;
        let notes = self.load_notes_with(&tags)?;
        Ok(Corpus { notes, tags })
    }
}

impl NoteStore {
    fn load_notes_with(&self, tags: &[Tag]) -> Result<Vec<Note>> {
        if !self.paths.notes.is_dir() {
            anyhow::bail!("Notes directory not found: {}", self.paths.notes.display());
        }

        let tags_by_id: HashMap<TagId, &Tag> = tags.iter().map(|t| (t.id, t)).collect();

        // The directory part is literal; only the file name is a pattern.
        let pattern = format!(
            "{}/*.note",
            glob::Pattern::escape(&self.paths.notes.to_string_lossy())
        );
        let entries = glob::glob(&pattern).context("Invalid notes directory pattern")?;

        let mut notes = Vec::new();
        let mut seen_titles = HashSet::new();
        let mut seen_ids = HashSet::new();

        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable note entry");
                    continue;
                }
            };

            let note = match Self::read_note(&path) {
                Ok(stored) => stored.into_note(&tags_by_id),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping malformed note");
                    continue;
                }
            };

            let violations = validate_note(&note, &seen_titles);
            if !violations.is_empty() {
                for v in &violations {
                    tracing::warn!(path = %path.display(), "skipping note: {}", v);
                }
                continue;
            }
            if !seen_ids.insert(note.id) {
                tracing::warn!(path = %path.display(), id = %note.id, "skipping note with duplicate id");
                continue;
            }

            seen_titles.insert(note.title.clone());
            notes.push(note);
        }

        tracing::debug!(count = notes.len(), "loaded notes");
        Ok(notes)
    }
}

/// Timestamps are stored as fractional UNIX seconds.
mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(dt.timestamp_micros() as f64 / 1e6)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() {
            return Err(de::Error::custom("timestamp is not a finite number"));
        }
        DateTime::from_timestamp_micros((secs * 1e6).round() as i64)
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", secs)))
    }
}
