//! Persisted note embeddings in SQLite.
//!
//! Rows are keyed by (note id, model id) so vectors from different models
//! never meet. Vectors are stored as little-endian f32 BLOBs.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::note::{Embedding, Note, NoteId};

pub struct EmbeddingStore {
    conn: Connection,
}

impl EmbeddingStore {
    /// Open or create database at path
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open embedding store {}", db_path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS embeddings (
                note_id INTEGER NOT NULL,
                model TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                embedding BLOB NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (note_id, model)
            );

            CREATE INDEX IF NOT EXISTS idx_embeddings_model ON embeddings(model);
            "#,
        )?;
        Ok(())
    }

    /// All vectors stored for `model`. Rows whose BLOB does not decode to the
    /// recorded dimension are skipped so the note gets re-embedded.
    pub fn load(&self, model: &str) -> Result<BTreeMap<NoteId, Embedding>> {
        let mut stmt = self
            .conn
            .prepare("SELECT note_id, dimensions, embedding FROM embeddings WHERE model = ?1")?;
        let rows = stmt.query_map(params![model], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, Vec<u8>>(2)?))
        })?;

        let mut embeddings = BTreeMap::new();
        for row in rows {
            let (note_id, dimensions, blob) = row?;
            match blob_to_embedding(&blob) {
                Some(embedding) if embedding.len() as i64 == dimensions => {
                    embeddings.insert(NoteId(note_id), embedding);
                }
                _ => tracing::warn!(note = note_id, model, "discarding corrupt stored embedding"),
            }
        }
        Ok(embeddings)
    }

    /// Fills `embedding` on every note that has a stored vector for `model`.
    /// Returns how many notes were populated.
    pub fn attach(&self, model: &str, notes: &mut [Note]) -> Result<usize> {
        let mut stored = self.load(model)?;
        let mut attached = 0;
        for note in notes.iter_mut() {
            if let Some(embedding) = stored.remove(&note.id) {
                note.set_embedding(embedding);
                attached += 1;
            }
        }
        Ok(attached)
    }

    /// Upserts all vectors in one transaction; either all land or none do.
    pub fn save(&mut self, model: &str, embeddings: &BTreeMap<NoteId, Embedding>) -> Result<()> {
        if embeddings.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO embeddings (note_id, model, dimensions, embedding, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(note_id, model) DO UPDATE SET
                    dimensions = excluded.dimensions,
                    embedding = excluded.embedding,
                    updated_at = excluded.updated_at
                "#,
            )?;
            for (note_id, embedding) in embeddings {
                stmt.execute(params![
                    note_id.0,
                    model,
                    embedding.len() as i64,
                    embedding_to_blob(embedding),
                    now
                ])?;
            }
        }
        tx.commit().context("failed to commit embeddings")?;

        tracing::debug!(model, count = embeddings.len(), "saved embeddings");
        Ok(())
    }

    /// Drops every vector for `model`. Returns the number of rows removed.
    pub fn clear(&self, model: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM embeddings WHERE model = ?1", params![model])?;
        Ok(removed)
    }

    /// Removes vectors of notes that no longer exist.
    pub fn prune(&self, live: &[NoteId]) -> Result<usize> {
        let existing: Vec<i64> = {
            let mut stmt = self.conn.prepare("SELECT DISTINCT note_id FROM embeddings")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut removed = 0;
        for note_id in existing {
            if !live.contains(&NoteId(note_id)) {
                removed += self
                    .conn
                    .execute("DELETE FROM embeddings WHERE note_id = ?1", params![note_id])?;
            }
        }
        Ok(removed)
    }

    pub fn stats(&self, model: &str) -> Result<StoreStats> {
        let embedding_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM embeddings WHERE model = ?1",
            params![model],
            |row| row.get(0),
        )?;

        let dimensions: Option<i64> = self
            .conn
            .query_row(
                "SELECT dimensions FROM embeddings WHERE model = ?1 LIMIT 1",
                params![model],
                |row| row.get(0),
            )
            .optional()?;

        let last_updated: Option<i64> = self
            .conn
            .query_row(
                "SELECT MAX(updated_at) FROM embeddings WHERE model = ?1",
                params![model],
                |row| row.get(0),
            )
            .optional()?
            .flatten();

        let other_models: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT model) FROM embeddings WHERE model != ?1",
            params![model],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            embedding_count: embedding_count as usize,
            dimensions: dimensions.map(|d| d as usize),
            last_updated,
            other_models: other_models as usize,
        })
    }
}

#[derive(Debug)]
pub struct StoreStats {
    pub embedding_count: usize,
    pub dimensions: Option<usize>,
    pub last_updated: Option<i64>,
    /// Models other than the queried one with vectors on disk.
    pub other_models: usize,
}

/// Convert f32 embedding to BLOB
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        blob.extend_from_slice(&val.to_le_bytes());
    }
    blob
}

/// Convert BLOB to f32 embedding; `None` if the length is not a multiple of 4
fn blob_to_embedding(blob: &[u8]) -> Option<Embedding> {
    if blob.len() % 4 != 0 {
        return None;
    }
    Some(
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
