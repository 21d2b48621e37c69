use std::path::PathBuf;

pub const CONFIG_FILE: &str = "config.yaml";

pub struct NotesPaths {
    pub root: PathBuf,
    pub notes: PathBuf,
    pub tags: PathBuf,
    pub embeddings_db: PathBuf,
    pub config: PathBuf,
}

impl NotesPaths {
    /// Debug mode keeps its notes in a separate directory so real notes are never touched.
    pub fn from_root(root: PathBuf, debug: bool) -> Self {
        let notes = root.join(if debug { "debug-notes" } else { "notes" });
        Self {
            tags: notes.join("tags.json"),
            embeddings_db: notes.join("embeddings.db"),
            config: root.join(CONFIG_FILE),
            notes,
            root,
        }
    }

    pub fn note_file(&self, title: &str) -> PathBuf {
        self.notes.join(format!("{}.note", title))
    }
}
