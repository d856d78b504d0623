//! SQLite-backed record store.
//!
//! Records live in a single `records` table. Search is a linear keyword scan
//! over every row: the corpus for one course term is small enough that an
//! inverted index would not pay for itself.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use vta_core::{AppError, AppResult};

use crate::keywords::{extract_keywords, normalize};
use crate::types::{ContentRecord, ScoredRecord, SourceType, StoreStats};

/// Default number of keywords taken from a query.
pub const DEFAULT_MAX_KEYWORDS: usize = 5;

/// Storage boundary for content records.
pub trait ContentStore: Send + Sync {
    /// Insert a record, replacing any record with the same id.
    fn put(&self, record: &ContentRecord) -> AppResult<()>;

    /// Insert a batch of records in one transaction.
    fn put_many(&self, records: &[ContentRecord]) -> AppResult<usize>;

    /// Fetch a record by id. Missing ids are `AppError::NotFound`.
    fn get(&self, id: &str) -> AppResult<ContentRecord>;

    /// Keyword search, best matches first. Records with no hits are omitted.
    fn search(&self, text: &str, limit: usize) -> AppResult<Vec<ScoredRecord>>;

    /// Number of records, optionally restricted to one source.
    fn count(&self, source: Option<SourceType>) -> AppResult<usize>;

    /// Delete all records of a source (or every record). Returns rows removed.
    fn clear(&self, source: Option<SourceType>) -> AppResult<usize>;

    fn stats(&self) -> AppResult<StoreStats>;
}

/// `ContentStore` over a single SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    max_keywords: usize,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    title TEXT,
    author TEXT,
    text TEXT NOT NULL,
    created_at TEXT,
    thread_id TEXT,
    url TEXT
);

CREATE INDEX IF NOT EXISTS idx_records_source ON records(source);
CREATE INDEX IF NOT EXISTS idx_records_thread ON records(thread_id);
"#;

const SELECT_COLUMNS: &str = "SELECT id, source, title, author, text, created_at, thread_id, url FROM records";

impl SqliteStore {
    /// Open (or create) the store at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Store(format!("Failed to create store directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open SQLite store: {}", e)))?;
        let store = Self::from_connection(conn, Some(db_path.to_path_buf()))?;

        tracing::debug!("Opened record store at {:?}", db_path);
        Ok(store)
    }

    /// Create a store that lives only as long as the process.
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Store(format!("Failed to open in-memory store: {}", e)))?;
        Self::from_connection(conn, None)
    }

    /// Override how many query keywords are used for matching.
    pub fn with_max_keywords(mut self, max_keywords: usize) -> Self {
        self.max_keywords = max_keywords.max(1);
        self
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
            max_keywords: DEFAULT_MAX_KEYWORDS,
        })
    }
}

fn insert_record(conn: &Connection, record: &ContentRecord) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR REPLACE INTO records (id, source, title, author, text, created_at, thread_id, url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.id,
            record.source.as_str(),
            record.title,
            record.author,
            record.text,
            record.created_at.map(|t| t.to_rfc3339()),
            record.thread_id,
            record.url,
        ],
    )
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ContentRecord> {
    let source: String = row.get(1)?;
    let source = SourceType::parse(&source).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown source type '{}'", source).into(),
        )
    })?;

    let created_at: Option<String> = row.get(5)?;
    let created_at = created_at
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
                })
        })
        .transpose()?;

    Ok(ContentRecord {
        id: row.get(0)?,
        source,
        title: row.get(2)?,
        author: row.get(3)?,
        text: row.get(4)?,
        created_at,
        thread_id: row.get(6)?,
        url: row.get(7)?,
    })
}

/// Score a record against the query keywords and normalized phrase.
fn score_record(record: &ContentRecord, keywords: &[String], phrase: &str) -> u32 {
    let haystack = match &record.title {
        Some(title) => format!(" {} {} ", normalize(title), normalize(&record.text)),
        None => format!(" {} ", normalize(&record.text)),
    };

    let hits = keywords
        .iter()
        .filter(|k| haystack.contains(&format!(" {} ", k)))
        .count() as u32;

    let phrase_bonus = if !phrase.is_empty() && haystack.contains(&format!(" {} ", phrase)) {
        keywords.len() as u32 + 1
    } else {
        0
    };

    hits + phrase_bonus
}

impl ContentStore for SqliteStore {
    fn put(&self, record: &ContentRecord) -> AppResult<()> {
        let conn = self.conn.lock();
        insert_record(&conn, record)
            .map_err(|e| AppError::Store(format!("Failed to insert record {}: {}", record.id, e)))?;
        Ok(())
    }

    fn put_many(&self, records: &[ContentRecord]) -> AppResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

        for record in records {
            insert_record(&tx, record).map_err(|e| {
                AppError::Store(format!("Failed to insert record {}: {}", record.id, e))
            })?;
        }

        tx.commit()
            .map_err(|e| AppError::Store(format!("Failed to commit records: {}", e)))?;

        tracing::debug!("Stored {} records", records.len());
        Ok(records.len())
    }

    fn get(&self, id: &str) -> AppResult<ContentRecord> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            row_to_record,
        )
        .optional()
        .map_err(|e| AppError::Store(format!("Failed to read record {}: {}", id, e)))?
        .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    fn search(&self, text: &str, limit: usize) -> AppResult<Vec<ScoredRecord>> {
        let keywords = extract_keywords(text, self.max_keywords);
        let phrase = normalize(text);

        if keywords.is_empty() && phrase.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(SELECT_COLUMNS)
            .map_err(|e| AppError::Store(format!("Failed to prepare search: {}", e)))?;

        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| AppError::Store(format!("Failed to scan records: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let record = row.map_err(|e| AppError::Store(format!("Failed to read record: {}", e)))?;
            let score = score_record(&record, &keywords, &phrase);
            if score > 0 {
                results.push(ScoredRecord { record, score });
            }
        }

        results.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        results.truncate(limit);

        tracing::debug!(
            keywords = ?keywords,
            "Search matched {} records (limit {})",
            results.len(),
            limit
        );

        Ok(results)
    }

    fn count(&self, source: Option<SourceType>) -> AppResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = match source {
            Some(source) => conn.query_row(
                "SELECT COUNT(*) FROM records WHERE source = ?1",
                params![source.as_str()],
                |row| row.get(0),
            ),
            None => conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0)),
        }
        .map_err(|e| AppError::Store(format!("Failed to count records: {}", e)))?;

        Ok(count as usize)
    }

    fn clear(&self, source: Option<SourceType>) -> AppResult<usize> {
        let conn = self.conn.lock();
        let removed = match source {
            Some(source) => conn.execute(
                "DELETE FROM records WHERE source = ?1",
                params![source.as_str()],
            ),
            None => conn.execute("DELETE FROM records", []),
        }
        .map_err(|e| AppError::Store(format!("Failed to delete records: {}", e)))?;

        tracing::info!(
            "Removed {} {} records",
            removed,
            source.map(|s| s.as_str()).unwrap_or("stored")
        );
        Ok(removed)
    }

    fn stats(&self) -> AppResult<StoreStats> {
        let conn = self.conn.lock();

        let count_of = |sql: &str| -> AppResult<u32> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0).map(|v| v as u32))
                .map_err(|e| AppError::Store(format!("Failed to read stats: {}", e)))
        };

        let course_records = count_of("SELECT COUNT(*) FROM records WHERE source = 'course'")?;
        let forum_records = count_of("SELECT COUNT(*) FROM records WHERE source = 'forum'")?;
        let threads = count_of(
            "SELECT COUNT(DISTINCT thread_id) FROM records WHERE source = 'forum' AND thread_id IS NOT NULL",
        )?;

        let latest: Option<String> = conn
            .query_row(
                "SELECT MAX(created_at) FROM records WHERE source = 'forum'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Store(format!("Failed to read stats: {}", e)))?;
        let latest_post_at = latest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc));

        let db_size_bytes = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len());

        Ok(StoreStats {
            course_records,
            forum_records,
            threads,
            latest_post_at,
            db_size_bytes,
        })
    }
}
