//! SQLite-backed vault for uploaded study files.
//!
//! Records are keyed by id with a secondary index on chapter id. Every write
//! runs in its own implicit transaction with `synchronous = FULL`, so a
//! returned `save` is durable. Blocking SQLite calls run on tokio's blocking
//! pool; the connection is shared behind a mutex.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyVaultError};

// ── Category ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Notes,
    #[serde(rename = "PYQ")]
    Pyq,
    Formula,
    #[serde(alias = "Mind Maps")]
    MindMaps,
    Solutions,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::Notes,
        Self::Pyq,
        Self::Formula,
        Self::MindMaps,
        Self::Solutions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notes => "Notes",
            Self::Pyq => "PYQ",
            Self::Formula => "Formula",
            Self::MindMaps => "MindMaps",
            Self::Solutions => "Solutions",
        }
    }

    /// Accepts canonical names, case-insensitively, and the legacy "Mind Maps".
    pub fn parse(s: &str) -> Option<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(&compact))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── StoredFile ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub id: String,
    pub chapter_id: String,
    pub category: Category,
    pub file_name: String,
    pub file_type: String,
    pub upload_date: String,
    /// Empty or the extraction failure sentinel when no text was recovered.
    pub extracted_text: String,
    pub size_bytes: u64,
}

// ── Schema SQL ───────────────────────────────────────────────────────────

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    chapter_id TEXT NOT NULL,
    category TEXT NOT NULL,
    file_name TEXT NOT NULL,
    file_type TEXT NOT NULL,
    upload_date TEXT NOT NULL,
    extracted_text TEXT NOT NULL DEFAULT '',
    size_bytes INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_files_chapter ON files(chapter_id);
";

const SELECT_COLUMNS: &str =
    "id, chapter_id, category, file_name, file_type, upload_date, extracted_text, size_bytes";

// ═════════════════════════════════════════════════════════════════════════
// Vault
// ═════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct Vault {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vault").field("path", &self.path).finish()
    }
}

impl Vault {
    /// Open or create a vault file with full schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StudyVaultError::StorageUnavailable {
                    reason: format!("{}: {e}", parent.display()).into(),
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA_SQL)?;
        tracing::debug!(target: "studyvault::vault", path = ?path, "vault opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StudyVaultError::StorageUnavailable {
                    reason: "vault connection poisoned".into(),
                })?;
            f(&guard)
        })
        .await?
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Upsert by id. Resolves once the write is committed.
    pub async fn save(&self, file: StoredFile) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO files (id, chapter_id, category, file_name, file_type,
                 upload_date, extracted_text, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    chapter_id = excluded.chapter_id,
                    category = excluded.category,
                    file_name = excluded.file_name,
                    file_type = excluded.file_type,
                    upload_date = excluded.upload_date,
                    extracted_text = excluded.extracted_text,
                    size_bytes = excluded.size_bytes",
                params![
                    file.id,
                    file.chapter_id,
                    file.category.as_str(),
                    file.file_name,
                    file.file_type,
                    file.upload_date,
                    file.extracted_text,
                    i64::try_from(file.size_bytes).unwrap_or(i64::MAX),
                ],
            )?;
            tracing::debug!(target: "studyvault::vault", id = %file.id, chapter = %file.chapter_id, "file saved");
            Ok(())
        })
        .await
    }

    /// Removes the record if present. Deleting an absent id is `Ok(false)`.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let rows = conn.execute("DELETE FROM files WHERE id = ?", params![id])?;
            Ok(rows > 0)
        })
        .await
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn get(&self, id: &str) -> Result<Option<StoredFile>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let sql = format!("SELECT {SELECT_COLUMNS} FROM files WHERE id = ?");
            Ok(query_files(conn, &sql, params![id])?.into_iter().next())
        })
        .await
    }

    /// All records filed under `chapter_id`, in no particular order.
    pub async fn get_by_chapter(&self, chapter_id: &str) -> Result<Vec<StoredFile>> {
        let chapter_id = chapter_id.to_string();
        self.with_conn(move |conn| {
            let sql = format!("SELECT {SELECT_COLUMNS} FROM files WHERE chapter_id = ?");
            query_files(conn, &sql, params![chapter_id])
        })
        .await
    }

    pub async fn get_by_chapter_and_category(
        &self,
        chapter_id: &str,
        category: Category,
    ) -> Result<Vec<StoredFile>> {
        let chapter_id = chapter_id.to_string();
        self.with_conn(move |conn| {
            let sql =
                format!("SELECT {SELECT_COLUMNS} FROM files WHERE chapter_id = ?1 AND category = ?2");
            query_files(conn, &sql, params![chapter_id, category.as_str()])
        })
        .await
    }

    pub async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
            Ok(n as usize)
        })
        .await
    }
}

fn query_files(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<StoredFile>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, row_to_file)?;
    let mut files = Vec::new();
    for row in rows {
        if let Some(file) = row? {
            files.push(file);
        }
    }
    Ok(files)
}

/// `None` for rows that cannot be decoded; they are logged and skipped.
fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<Option<StoredFile>> {
    use rusqlite::Error as SqlError;

    match decode_row(row) {
        Ok(file) => Ok(file),
        Err(
            err @ (SqlError::FromSqlConversionFailure(..)
            | SqlError::InvalidColumnType(..)
            | SqlError::IntegralValueOutOfRange(..)),
        ) => {
            let id = row.get::<_, String>(0).unwrap_or_default();
            tracing::warn!(target: "studyvault::vault", %id, error = %err, "skipping undecodable row");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// `None` for rows whose category is not one of the fixed five.
fn decode_row(row: &rusqlite::Row) -> rusqlite::Result<Option<StoredFile>> {
    let id: String = row.get(0)?;
    let category_raw: String = row.get(2)?;
    let Some(category) = Category::parse(&category_raw) else {
        tracing::warn!(target: "studyvault::vault", %id, category = %category_raw, "skipping row with unknown category");
        return Ok(None);
    };
    let size: i64 = row.get(7)?;
    Ok(Some(StoredFile {
        id,
        chapter_id: row.get(1)?,
        category,
        file_name: row.get(3)?,
        file_type: row.get(4)?,
        upload_date: row.get(5)?,
        extracted_text: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        size_bytes: u64::try_from(size).unwrap_or(0),
    }))
}

// ── Tests ────────────────────────────────────────────────────────────────
