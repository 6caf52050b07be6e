use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use domain::{FaqEntry, FaqIndex};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use shared::types::Result;
use std::path::Path;

/// Metadata persisted with the index so a reload can detect a model change.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreMeta {
    pub embedding_model: String,
    pub dimension: usize,
    pub source_hash: String,
    pub built_at: DateTime<Utc>,
}

/// SQLite-backed FAQ store artifact.
pub struct FaqStore {
    conn: Connection,
}

impl FaqStore {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("opening {}", db_path.as_ref().display()))?;
        Self::setup_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::setup_db(&conn)?;
        Ok(Self { conn })
    }

    fn setup_db(conn: &Connection) -> SqlResult<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            CREATE TABLE IF NOT EXISTS faq_entries (
                position INTEGER PRIMARY KEY,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                vector BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        ",
        )
    }

    /// Replace the whole index and its metadata in one transaction.
    pub fn replace_index(&self, index: &FaqIndex, source_hash: &str) -> Result<StoreMeta> {
        let meta = StoreMeta {
            embedding_model: index.model().to_string(),
            dimension: index.dimension(),
            source_hash: source_hash.to_string(),
            built_at: Utc::now(),
        };
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM faq_entries", [])?;
        tx.execute("DELETE FROM index_meta", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO faq_entries (position, question, answer, vector) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, entry) in index.entries().iter().enumerate() {
                let vector_bytes = serde_json::to_vec(&entry.embedding)?;
                stmt.execute(params![
                    position as i64,
                    entry.question,
                    entry.answer,
                    vector_bytes
                ])?;
            }
            let mut meta_stmt =
                tx.prepare("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")?;
            meta_stmt.execute(params!["embedding_model", meta.embedding_model])?;
            meta_stmt.execute(params!["dimension", meta.dimension.to_string()])?;
            meta_stmt.execute(params!["source_hash", meta.source_hash])?;
            meta_stmt.execute(params!["built_at", meta.built_at.to_rfc3339()])?;
        }
        tx.commit()?;
        Ok(meta)
    }

    /// `None` when no index has been written yet.
    pub fn meta(&self) -> Result<Option<StoreMeta>> {
        let Some(embedding_model) = self.meta_value("embedding_model")? else {
            return Ok(None);
        };
        let dimension = self
            .meta_value("dimension")?
            .ok_or_else(|| anyhow!("index metadata is missing 'dimension'"))?
            .parse::<usize>()
            .context("index metadata has a malformed 'dimension'")?;
        let source_hash = self.meta_value("source_hash")?.unwrap_or_default();
        let built_at = match self.meta_value("built_at")? {
            Some(ts) => DateTime::parse_from_rfc3339(&ts)
                .context("index metadata has a malformed 'built_at'")?
                .with_timezone(&Utc),
            None => DateTime::<Utc>::UNIX_EPOCH,
        };
        Ok(Some(StoreMeta {
            embedding_model,
            dimension,
            source_hash,
            built_at,
        }))
    }

    fn meta_value(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Entries in insertion order, paired with the stored metadata.
    pub fn load_index(&self) -> Result<Option<(FaqIndex, StoreMeta)>> {
        let Some(meta) = self.meta()? else {
            return Ok(None);
        };
        let mut stmt = self
            .conn
            .prepare("SELECT question, answer, vector FROM faq_entries ORDER BY position")?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let question: String = row.get(0)?;
            let answer: String = row.get(1)?;
            let vector_bytes: Vec<u8> = row.get(2)?;
            let embedding: Vec<f32> = serde_json::from_slice(&vector_bytes)?;
            entries.push(FaqEntry {
                question,
                answer,
                embedding,
            });
        }
        let index = FaqIndex::new(meta.embedding_model.clone(), entries)?;
        if !index.is_empty() && index.dimension() != meta.dimension {
            return Err(anyhow!(
                "stored vectors have dimension {} but metadata says {}",
                index.dimension(),
                meta.dimension
            ));
        }
        Ok(Some((index, meta)))
    }

    pub fn entry_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM faq_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
