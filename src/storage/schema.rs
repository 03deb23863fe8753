//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Sumi-Lattice database.
//! IDs are UUIDs and timestamps are RFC 3339 strings, both stored as TEXT.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every host seen by the pipeline
CREATE TABLE IF NOT EXISTS domains (
    id TEXT PRIMARY KEY,
    name VARCHAR(50) NOT NULL UNIQUE,
    protocol VARCHAR(10) NOT NULL,
    crawl_delay INTEGER NOT NULL DEFAULT 5,
    has_robots_txt INTEGER,
    is_blocked INTEGER,
    last_crawled_at TEXT,
    last_processed_at TEXT,
    first_discovered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_domains_name ON domains(name);

-- Every canonical URL seen by the pipeline
CREATE TABLE IF NOT EXISTS links (
    id TEXT PRIMARY KEY,
    url VARCHAR(512) NOT NULL UNIQUE,
    change_freq TEXT NOT NULL DEFAULT 'monthly',
    priority REAL NOT NULL DEFAULT 0.5,
    lang VARCHAR(3),
    content TEXT,
    title VARCHAR(100),
    description VARCHAR(250),
    http_status INTEGER,
    content_type VARCHAR(30),
    keywords VARCHAR(100),
    last_crawled_at TEXT,
    first_discovered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_links_url ON links(url);

-- Directed edges: link_id references has_link_id
CREATE TABLE IF NOT EXISTS link_relations (
    link_id TEXT NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    has_link_id TEXT NOT NULL REFERENCES links(id) ON DELETE CASCADE,
    PRIMARY KEY (link_id, has_link_id)
);

CREATE INDEX IF NOT EXISTS idx_link_relations_has_link ON link_relations(has_link_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["domains", "links", "link_relations"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_duplicate_relation_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        initialize_schema(&conn).unwrap();

        conn.execute_batch(
            "INSERT INTO links (id, url, first_discovered_at) VALUES ('a', 'https://www.a.com', 'now');
             INSERT INTO links (id, url, first_discovered_at) VALUES ('b', 'https://www.b.com', 'now');
             INSERT INTO link_relations (link_id, has_link_id) VALUES ('a', 'b');",
        )
        .unwrap();

        let again = conn.execute(
            "INSERT INTO link_relations (link_id, has_link_id) VALUES ('a', 'b')",
            [],
        );
        assert!(again.is_err());
    }
}
