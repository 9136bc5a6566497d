// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document archive backed by SQLite.
//
// The database holds metadata only. Image payloads live under
// `<root>/payloads/<sha256>`, so identical images are stored once, and every
// read re-hashes the file before returning it.
//
// Layout:
//   <root>/archive.db
//   <root>/payloads/<sha256 of processed PNG>
//   <root>/payloads/<sha256 of original bytes>

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::{CornerSet, DocumentSink, EnhancementMode, FinishedDocument};

use crate::integrity::{hash_bytes, is_digest, verify_hash};

const DATABASE_FILE: &str = "archive.db";
const PAYLOAD_DIR: &str = "payloads";

/// SQLite schema for the documents table.
const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        mode TEXT NOT NULL,
        corners TEXT NOT NULL,
        width INTEGER NOT NULL,
        height INTEGER NOT NULL,
        processed_hash TEXT NOT NULL,
        original_hash TEXT NOT NULL,
        processed_size INTEGER NOT NULL,
        original_size INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        archived_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS documents_archived_at ON documents (archived_at);
"#;

/// Column order expected by [`row_to_document`].
const SELECT_COLUMNS: &str = "id, name, mode, corners, width, height, processed_hash, \
     original_hash, processed_size, original_size, created_at, updated_at, archived_at";

/// Metadata for one archived scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub name: String,
    pub mode: EnhancementMode,
    /// Corners used for rectification, in original-image coordinates.
    pub corners: CornerSet,
    pub width: u32,
    pub height: u32,
    pub processed_hash: String,
    pub original_hash: String,
    pub processed_size: u64,
    pub original_size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
}

/// Persistent store of finished scans.
///
/// All methods are synchronous because `rusqlite` is. From async code, wrap
/// calls in `tokio::task::spawn_blocking`.
pub struct DocumentArchive {
    conn: Connection,
    payloads: PathBuf,
}

fn db_err(context: &'static str) -> impl FnOnce(rusqlite::Error) -> ScanwerkError {
    move |e| ScanwerkError::Database(format!("{context}: {e}"))
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

impl DocumentArchive {
    /// Open (or create) an archive rooted at `root`.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let payloads = root.join(PAYLOAD_DIR);
        fs::create_dir_all(&payloads)?;

        let conn = Connection::open(root.join(DATABASE_FILE)).map_err(db_err("open"))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err("WAL pragma"))?;
        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(db_err("create table"))?;

        info!("document archive opened");
        Ok(Self { conn, payloads })
    }

    /// Archive a finished scan and return its new id.
    #[instrument(skip(self, doc), fields(name = %doc.name, mode = %doc.mode))]
    pub fn store(&self, doc: &FinishedDocument) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let processed_hash = self.write_payload(&doc.processed_png)?;
        let original_hash = self.write_payload(&doc.original)?;
        let corners_json = serde_json::to_string(&doc.corners)?;

        self.conn
            .execute(
                "INSERT INTO documents (id, name, mode, corners, width, height,
                 processed_hash, original_hash, processed_size, original_size,
                 created_at, updated_at, archived_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    id,
                    doc.name,
                    doc.mode.as_str(),
                    corners_json,
                    doc.width,
                    doc.height,
                    processed_hash,
                    original_hash,
                    doc.processed_png.len() as i64,
                    doc.original.len() as i64,
                    timestamp(&doc.created_at),
                    timestamp(&doc.updated_at),
                    timestamp(&Utc::now()),
                ],
            )
            .map_err(db_err("insert document"))?;

        info!(document_id = %id, processed = %processed_hash, "document archived");
        Ok(id)
    }

    /// Look up one document; `None` if the id is unknown.
    pub fn get(&self, id: &str) -> Result<Option<StoredDocument>> {
        self.conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM documents WHERE id = ?1"),
                params![id],
                row_to_document,
            )
            .optional()
            .map_err(db_err("get document"))
    }

    /// Every archived document, newest first.
    pub fn list(&self) -> Result<Vec<StoredDocument>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM documents ORDER BY archived_at DESC, rowid DESC"
            ))
            .map_err(db_err("prepare list"))?;

        let documents = stmt
            .query_map([], row_to_document)
            .map_err(db_err("query list"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_err("collect rows"))?;

        debug!(count = documents.len(), "listed archived documents");
        Ok(documents)
    }

    /// The processed PNG, verified against its digest.
    pub fn load_processed(&self, id: &str) -> Result<Vec<u8>> {
        let doc = self.require(id)?;
        self.read_payload(&doc.processed_hash)
    }

    /// The original image bytes, verified against their digest.
    pub fn load_original(&self, id: &str) -> Result<Vec<u8>> {
        let doc = self.require(id)?;
        self.read_payload(&doc.original_hash)
    }

    /// Remove a document. Payload files are deleted once no other document
    /// refers to them. Returns `false` if the id was unknown.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<bool> {
        let Some(doc) = self.get(id)? else {
            return Ok(false);
        };
        self.conn
            .execute("DELETE FROM documents WHERE id = ?1", params![id])
            .map_err(db_err("delete document"))?;

        for hash in [&doc.processed_hash, &doc.original_hash] {
            if self.references(hash)? == 0 {
                self.remove_payload(hash);
            }
        }
        info!(document_id = %id, "document deleted from archive");
        Ok(true)
    }

    fn require(&self, id: &str) -> Result<StoredDocument> {
        self.get(id)?
            .ok_or_else(|| ScanwerkError::Database(format!("no archived document with id {id}")))
    }

    fn references(&self, hash: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM documents WHERE processed_hash = ?1 OR original_hash = ?1",
                params![hash],
                |row| row.get(0),
            )
            .map_err(db_err("count references"))
    }

    fn payload_path(&self, hash: &str) -> Result<PathBuf> {
        if !is_digest(hash) {
            return Err(ScanwerkError::Database(format!(
                "malformed payload reference {hash:?}"
            )));
        }
        Ok(self.payloads.join(hash))
    }

    fn write_payload(&self, data: &[u8]) -> Result<String> {
        let hash = hash_bytes(data);
        let path = self.payload_path(&hash)?;
        if path.exists() {
            debug!(hash = %hash, "payload already stored");
            return Ok(hash);
        }
        // Write-then-rename so a crash never leaves a truncated payload under
        // its final name.
        let partial = path.with_extension("partial");
        fs::write(&partial, data)?;
        fs::rename(&partial, &path)?;
        debug!(hash = %hash, bytes = data.len(), "payload written");
        Ok(hash)
    }

    fn read_payload(&self, hash: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.payload_path(hash)?)?;
        verify_hash(&data, hash)?;
        Ok(data)
    }

    fn remove_payload(&self, hash: &str) {
        let removed = self
            .payload_path(hash)
            .and_then(|path| fs::remove_file(path).map_err(ScanwerkError::from));
        if let Err(e) = removed {
            warn!(hash = %hash, error = %e, "could not remove payload");
        }
    }
}

impl DocumentSink for DocumentArchive {
    fn store(&self, doc: &FinishedDocument) -> Result<String> {
        DocumentArchive::store(self, doc)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_time(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

/// Column indices match [`SELECT_COLUMNS`].
fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredDocument> {
    let mode: String = row.get(2)?;
    let corners: String = row.get(3)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;
    let archived_at: String = row.get(12)?;

    Ok(StoredDocument {
        id: row.get(0)?,
        name: row.get(1)?,
        mode: mode.parse().map_err(|e| conversion_error(2, e))?,
        corners: serde_json::from_str(&corners).map_err(|e| conversion_error(3, e))?,
        width: row.get(4)?,
        height: row.get(5)?,
        processed_hash: row.get(6)?,
        original_hash: row.get(7)?,
        processed_size: row.get::<_, i64>(8)? as u64,
        original_size: row.get::<_, i64>(9)? as u64,
        created_at: parse_time(10, &created_at)?,
        updated_at: parse_time(11, &updated_at)?,
        archived_at: parse_time(12, &archived_at)?,
    })
}
