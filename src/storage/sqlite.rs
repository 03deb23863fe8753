//! SQLite storage implementation
//!
//! The [`Storage`] trait is implemented directly on [`rusqlite::Connection`],
//! so the same operations run on a plain connection or inside a
//! [`rusqlite::Transaction`] (which derefs to a connection).

use crate::state::{normalize_priority, ChangeFreq};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{DomainRecord, LinkRecord, LinkRelationRecord, NewLink};
use crate::SumiError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

const DOMAIN_COLUMNS: &str = "id, name, protocol, crawl_delay, has_robots_txt, is_blocked, \
     last_crawled_at, last_processed_at, first_discovered_at";

const LINK_COLUMNS: &str = "id, url, change_freq, priority, lang, content, title, description, \
     http_status, content_type, keywords, last_crawled_at, first_discovered_at";

/// SQLite storage backend shared by every worker
///
/// One connection sits behind a mutex. Callers take it for the duration of a
/// single synchronous transaction and never hold it across an `.await`.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SumiError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SumiError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SumiError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs `f` inside one transaction
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err` (the transaction is dropped uncommitted).
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let tx = conn.transaction().map_err(StorageError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(StorageError::from)?;
        Ok(value)
    }

    /// Runs read-only queries against the connection
    pub fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StorageError>,
    {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        f(&conn)
    }
}

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

fn optional_timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| conversion_error(idx, Type::Text, e)),
        None => Ok(None),
    }
}

fn to_db_timestamp(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339())
}

fn domain_from_row(row: &Row<'_>) -> rusqlite::Result<DomainRecord> {
    Ok(DomainRecord {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        protocol: row.get(2)?,
        crawl_delay: row.get(3)?,
        has_robots_txt: row.get(4)?,
        is_blocked: row.get(5)?,
        last_crawled_at: optional_timestamp_column(row, 6)?,
        last_processed_at: optional_timestamp_column(row, 7)?,
        first_discovered_at: timestamp_column(row, 8)?,
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<LinkRecord> {
    Ok(LinkRecord {
        id: uuid_column(row, 0)?,
        url: row.get(1)?,
        change_freq: ChangeFreq::from_db_string(&row.get::<_, String>(2)?).unwrap_or_default(),
        priority: row.get(3)?,
        lang: row.get(4)?,
        content: row.get(5)?,
        title: row.get(6)?,
        description: row.get(7)?,
        http_status: row.get(8)?,
        content_type: row.get(9)?,
        keywords: row.get(10)?,
        last_crawled_at: optional_timestamp_column(row, 11)?,
        first_discovered_at: timestamp_column(row, 12)?,
    })
}

fn count(conn: &Connection, sql: &str) -> StorageResult<u64> {
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count as u64)
}

impl Storage for Connection {
    // ===== Domains =====

    fn upsert_domain(&self, name: &str, protocol: &str) -> StorageResult<(DomainRecord, bool)> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.execute(
            "INSERT INTO domains (id, name, protocol, first_discovered_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO NOTHING",
            params![Uuid::new_v4().to_string(), name, protocol, now],
        )? > 0;

        let domain = self.query_row(
            &format!("SELECT {} FROM domains WHERE name = ?1", DOMAIN_COLUMNS),
            params![name],
            domain_from_row,
        )?;

        Ok((domain, inserted))
    }

    fn find_domain_by_name(&self, name: &str) -> StorageResult<Option<DomainRecord>> {
        let domain = self
            .query_row(
                &format!("SELECT {} FROM domains WHERE name = ?1", DOMAIN_COLUMNS),
                params![name],
                domain_from_row,
            )
            .optional()?;
        Ok(domain)
    }

    fn get_domain(&self, id: Uuid) -> StorageResult<Option<DomainRecord>> {
        let domain = self
            .query_row(
                &format!("SELECT {} FROM domains WHERE id = ?1", DOMAIN_COLUMNS),
                params![id.to_string()],
                domain_from_row,
            )
            .optional()?;
        Ok(domain)
    }

    fn update_domain(&self, domain: &DomainRecord) -> StorageResult<()> {
        self.execute(
            "UPDATE domains SET protocol = ?1, crawl_delay = ?2, has_robots_txt = ?3,
             is_blocked = ?4, last_crawled_at = ?5, last_processed_at = ?6
             WHERE id = ?7",
            params![
                domain.protocol,
                domain.crawl_delay,
                domain.has_robots_txt,
                domain.is_blocked,
                to_db_timestamp(domain.last_crawled_at),
                to_db_timestamp(domain.last_processed_at),
                domain.id.to_string(),
            ],
        )?;
        Ok(())
    }

    // ===== Links =====

    fn insert_link(&self, link: &NewLink) -> StorageResult<(LinkRecord, bool)> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.execute(
            "INSERT INTO links (id, url, change_freq, priority, first_discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO NOTHING",
            params![
                Uuid::new_v4().to_string(),
                link.url,
                link.change_freq.to_db_string(),
                normalize_priority(link.priority),
                now
            ],
        )? > 0;

        let record = self.query_row(
            &format!("SELECT {} FROM links WHERE url = ?1", LINK_COLUMNS),
            params![link.url],
            link_from_row,
        )?;

        Ok((record, inserted))
    }

    fn find_link_by_url(&self, url: &str) -> StorageResult<Option<LinkRecord>> {
        let link = self
            .query_row(
                &format!("SELECT {} FROM links WHERE url = ?1", LINK_COLUMNS),
                params![url],
                link_from_row,
            )
            .optional()?;
        Ok(link)
    }

    fn get_link(&self, id: Uuid) -> StorageResult<Option<LinkRecord>> {
        let link = self
            .query_row(
                &format!("SELECT {} FROM links WHERE id = ?1", LINK_COLUMNS),
                params![id.to_string()],
                link_from_row,
            )
            .optional()?;
        Ok(link)
    }

    fn update_link(&self, link: &LinkRecord) -> StorageResult<()> {
        self.execute(
            "UPDATE links SET change_freq = ?1, priority = ?2, lang = ?3, content = ?4,
             title = ?5, description = ?6, http_status = ?7, content_type = ?8,
             keywords = ?9, last_crawled_at = ?10
             WHERE id = ?11",
            params![
                link.change_freq.to_db_string(),
                normalize_priority(link.priority),
                link.lang,
                link.content,
                link.title,
                link.description,
                link.http_status,
                link.content_type,
                link.keywords,
                to_db_timestamp(link.last_crawled_at),
                link.id.to_string(),
            ],
        )?;
        Ok(())
    }

    fn delete_link(&self, id: Uuid) -> StorageResult<bool> {
        let deleted = self.execute("DELETE FROM links WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    // ===== Relations =====

    fn find_relation(
        &self,
        link_id: Uuid,
        has_link_id: Uuid,
    ) -> StorageResult<Option<LinkRelationRecord>> {
        let relation = self
            .query_row(
                "SELECT link_id, has_link_id FROM link_relations
                 WHERE link_id = ?1 AND has_link_id = ?2",
                params![link_id.to_string(), has_link_id.to_string()],
                |row| {
                    Ok(LinkRelationRecord {
                        link_id: uuid_column(row, 0)?,
                        has_link_id: uuid_column(row, 1)?,
                    })
                },
            )
            .optional()?;
        Ok(relation)
    }

    fn insert_relation(&self, link_id: Uuid, has_link_id: Uuid) -> StorageResult<bool> {
        let inserted = self.execute(
            "INSERT OR IGNORE INTO link_relations (link_id, has_link_id) VALUES (?1, ?2)",
            params![link_id.to_string(), has_link_id.to_string()],
        )?;
        Ok(inserted > 0)
    }

    fn get_outgoing_links(&self, link_id: Uuid) -> StorageResult<Vec<Uuid>> {
        let mut stmt = self.prepare(
            "SELECT has_link_id FROM link_relations WHERE link_id = ?1 ORDER BY rowid",
        )?;
        let ids = stmt
            .query_map(params![link_id.to_string()], |row| uuid_column(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn get_incoming_links(&self, link_id: Uuid) -> StorageResult<Vec<Uuid>> {
        let mut stmt = self.prepare(
            "SELECT link_id FROM link_relations WHERE has_link_id = ?1 ORDER BY rowid",
        )?;
        let ids = stmt
            .query_map(params![link_id.to_string()], |row| uuid_column(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    // ===== Statistics =====

    fn count_domains(&self) -> StorageResult<u64> {
        count(self, "SELECT COUNT(*) FROM domains")
    }

    fn count_links(&self) -> StorageResult<u64> {
        count(self, "SELECT COUNT(*) FROM links")
    }

    fn count_crawled_links(&self) -> StorageResult<u64> {
        count(
            self,
            "SELECT COUNT(*) FROM links WHERE last_crawled_at IS NOT NULL",
        )
    }

    fn count_relations(&self) -> StorageResult<u64> {
        count(self, "SELECT COUNT(*) FROM link_relations")
    }

    fn count_links_by_change_freq(&self) -> StorageResult<HashMap<ChangeFreq, u64>> {
        let mut stmt =
            self.prepare("SELECT change_freq, COUNT(*) FROM links GROUP BY change_freq")?;

        let rows = stmt.query_map([], |row| {
            let freq: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((freq, count))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (freq, count) = row?;
            match ChangeFreq::from_db_string(&freq) {
                Some(freq) => {
                    *counts.entry(freq).or_insert(0) += count as u64;
                }
                None => {
                    return Err(StorageError::CorruptRow {
                        table: "links",
                        message: format!("unknown change_freq '{}'", freq),
                    })
                }
            }
        }

        Ok(counts)
    }
}
