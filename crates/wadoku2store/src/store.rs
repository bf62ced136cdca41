use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::{debug, info, warn};
use wadoku_types::OutputEntry;

pub const DEFAULT_COLLECTION: &str = "dictionary";

/// Destination for reshaped entries.
///
/// `insert` is called once per entry in source order; `ensure_indexes` once
/// after the last insert.
pub trait CollectionWriter {
    fn insert(&mut self, entry: &OutputEntry) -> Result<(), StoreError>;
    fn ensure_indexes(&mut self) -> Result<(), StoreError>;
}

impl<W: CollectionWriter + ?Sized> CollectionWriter for Box<W> {
    fn insert(&mut self, entry: &OutputEntry) -> Result<(), StoreError> {
        (**self).insert(entry)
    }

    fn ensure_indexes(&mut self) -> Result<(), StoreError> {
        (**self).ensure_indexes()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
    #[error("document encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate entry id {0}")]
    DuplicateId(i64),
    #[error("invalid collection name {0:?}")]
    InvalidCollection(String),
    #[error("upsert is not supported for {0}")]
    UpsertUnsupported(String),
}

/// How inserts treat an identifier that is already stored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WriteMode {
    /// A duplicate identifier is an error.
    #[default]
    Insert,
    /// Replace the stored document with the same identifier.
    Upsert,
}

/// Parsed destination connection string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Destination {
    Sqlite(PathBuf),
    JsonLines(PathBuf),
    Stdout,
}

impl Destination {
    /// `-` is stdout, `jsonl:`/`.jsonl`/`.ndjson` select JSON lines, and
    /// everything else (optionally prefixed `sqlite:`) is a SQLite file.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == "-" {
            return Destination::Stdout;
        }
        if let Some(path) = raw.strip_prefix("jsonl:") {
            return Destination::JsonLines(PathBuf::from(path));
        }
        if let Some(path) = raw.strip_prefix("sqlite:") {
            return Destination::Sqlite(PathBuf::from(path));
        }
        if raw.ends_with(".jsonl") || raw.ends_with(".ndjson") {
            return Destination::JsonLines(PathBuf::from(raw));
        }
        Destination::Sqlite(PathBuf::from(raw))
    }

    /// Open a writer for this destination.
    pub fn open(
        &self,
        collection: &str,
        mode: WriteMode,
    ) -> Result<Box<dyn CollectionWriter>, StoreError> {
        validate_collection(collection)?;
        match self {
            Destination::Sqlite(path) => Ok(Box::new(SqliteCollection::open(
                path, collection, mode,
            )?)),
            Destination::JsonLines(path) => {
                reject_upsert(mode, &path.display().to_string())?;
                Ok(Box::new(JsonLinesCollection::create(path)?))
            }
            Destination::Stdout => {
                reject_upsert(mode, "stdout")?;
                Ok(Box::new(JsonLinesCollection::new(Box::new(io::stdout()))))
            }
        }
    }
}

fn reject_upsert(mode: WriteMode, target: &str) -> Result<(), StoreError> {
    match mode {
        WriteMode::Insert => Ok(()),
        WriteMode::Upsert => Err(StoreError::UpsertUnsupported(target.to_string())),
    }
}

fn validate_collection(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

/// SQLite-backed collection: one JSON document per entry plus a side table
/// for the multi-valued orthography.
pub struct SqliteCollection {
    conn: Connection,
    collection: String,
    mode: WriteMode,
}

impl SqliteCollection {
    pub fn open(
        path: impl AsRef<Path>,
        collection: &str,
        mode: WriteMode,
    ) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            warn!("failed to enable WAL mode: {err}");
        }
        if let Err(err) = conn.pragma_update(None, "synchronous", "NORMAL") {
            warn!("failed to relax synchronous mode: {err}");
        }
        info!("opened sqlite store at {}", path.as_ref().display());
        Self::with_connection(conn, collection, mode)
    }

    pub fn open_in_memory(collection: &str, mode: WriteMode) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, collection, mode)
    }

    fn with_connection(
        conn: Connection,
        collection: &str,
        mode: WriteMode,
    ) -> Result<Self, StoreError> {
        validate_collection(collection)?;
        // The primary key is the unique identifier index; duplicates fail at insert.
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {c} (
                 id INTEGER PRIMARY KEY,
                 category TEXT NOT NULL,
                 document TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS {c}_orthography (
                 entry_id INTEGER NOT NULL REFERENCES {c}(id),
                 position INTEGER NOT NULL,
                 text TEXT NOT NULL
             );",
            c = collection
        ))?;
        Ok(Self {
            conn,
            collection: collection.to_string(),
            mode,
        })
    }

    /// Number of stored documents.
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.collection),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn get(&self, id: i64) -> Result<Option<OutputEntry>, StoreError> {
        let document: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT document FROM {} WHERE id = ?1", self.collection),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        document
            .map(|doc| serde_json::from_str(&doc).map_err(StoreError::from))
            .transpose()
    }

    /// Entries having `text` among their orthographic forms, ordered by id.
    pub fn find_by_orthography(&self, text: &str) -> Result<Vec<OutputEntry>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT d.id, d.document
             FROM {c}_orthography o JOIN {c} d ON d.id = o.entry_id
             WHERE o.text = ?1
             ORDER BY d.id",
            c = self.collection
        ))?;
        let mut rows = stmt.query(params![text])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let document: String = row.get(1)?;
            out.push(serde_json::from_str(&document)?);
        }
        Ok(out)
    }
}

impl CollectionWriter for SqliteCollection {
    fn insert(&mut self, entry: &OutputEntry) -> Result<(), StoreError> {
        let document = serde_json::to_string(entry)?;
        let c = &self.collection;
        let tx = self.conn.transaction()?;
        match self.mode {
            WriteMode::Insert => {
                let inserted = tx.execute(
                    &format!("INSERT INTO {c} (id, category, document) VALUES (?1, ?2, ?3)"),
                    params![entry.id, entry.category.tag(), document],
                );
                if let Err(err) = inserted {
                    return Err(match err.sqlite_error_code() {
                        Some(rusqlite::ErrorCode::ConstraintViolation) => {
                            StoreError::DuplicateId(entry.id)
                        }
                        _ => err.into(),
                    });
                }
            }
            WriteMode::Upsert => {
                tx.execute(
                    &format!(
                        "INSERT INTO {c} (id, category, document) VALUES (?1, ?2, ?3)
                         ON CONFLICT(id) DO UPDATE SET
                             category = excluded.category,
                             document = excluded.document"
                    ),
                    params![entry.id, entry.category.tag(), document],
                )?;
                tx.execute(
                    &format!("DELETE FROM {c}_orthography WHERE entry_id = ?1"),
                    params![entry.id],
                )?;
            }
        }
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO {c}_orthography (entry_id, position, text) VALUES (?1, ?2, ?3)"
            ))?;
            for (position, text) in entry.orthography.iter().enumerate() {
                stmt.execute(params![entry.id, position as i64, text])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn ensure_indexes(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS {c}_orthography_text ON {c}_orthography(text);
             CREATE INDEX IF NOT EXISTS {c}_orthography_entry ON {c}_orthography(entry_id);
             CREATE INDEX IF NOT EXISTS {c}_category ON {c}(category);",
            c = self.collection
        ))?;
        debug!("indexes ensured on {}", self.collection);
        Ok(())
    }
}

/// Newline-delimited JSON documents written to a file or stdout.
pub struct JsonLinesCollection {
    out: BufWriter<Box<dyn Write>>,
    seen: HashSet<i64>,
}

impl JsonLinesCollection {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self {
            out: BufWriter::new(out),
            seen: HashSet::new(),
        }
    }

    pub fn create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = File::create(path.as_ref())?;
        info!("writing json lines to {}", path.as_ref().display());
        Ok(Self::new(Box::new(file)))
    }
}

impl CollectionWriter for JsonLinesCollection {
    fn insert(&mut self, entry: &OutputEntry) -> Result<(), StoreError> {
        if !self.seen.insert(entry.id) {
            return Err(StoreError::DuplicateId(entry.id));
        }
        serde_json::to_writer(&mut self.out, entry)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn ensure_indexes(&mut self) -> Result<(), StoreError> {
        // Nothing to index in a flat stream; make sure everything is written.
        self.out.flush()?;
        Ok(())
    }
}
