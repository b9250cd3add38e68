//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Outlet-Mesh database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per fetch attempt, successful or not
CREATE TABLE IF NOT EXISTS scrapes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    url_started TEXT NOT NULL,
    url_finished TEXT,
    status_code INTEGER NOT NULL,
    seconds_elapsed REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scrapes_started ON scrapes(url_started);
CREATE INDEX IF NOT EXISTS idx_scrapes_finished ON scrapes(url_finished);

-- Seed news outlets
CREATE TABLE IF NOT EXISTS outlets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    fld TEXT NOT NULL,
    tld TEXT,
    country TEXT NOT NULL,
    area TEXT,
    reach TEXT,
    city TEXT,
    owner TEXT,
    publisher TEXT,
    latitude REAL,
    longitude REAL,
    is_composite INTEGER NOT NULL DEFAULT 0,
    scrape_id INTEGER REFERENCES scrapes(id)
);

CREATE INDEX IF NOT EXISTS idx_outlets_fld ON outlets(fld);

-- Hyperlink edges, owned by their origin scrape
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_origin TEXT NOT NULL,
    fld_origin TEXT NOT NULL,
    scrape_origin_id INTEGER NOT NULL REFERENCES scrapes(id),
    url_target TEXT NOT NULL,
    fld_target TEXT NOT NULL,
    is_internal INTEGER NOT NULL,
    scrape_target_id INTEGER REFERENCES scrapes(id),
    erroneous_scrapes INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_links_origin ON links(scrape_origin_id);
CREATE INDEX IF NOT EXISTS idx_links_target_url ON links(url_target);
CREATE INDEX IF NOT EXISTS idx_links_target_scrape ON links(scrape_target_id);
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

        // Initialize twice
        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        // Should succeed the second time too
        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["runs", "scrapes", "outlets", "links"] {
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
}
