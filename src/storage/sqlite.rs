//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the GraphStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{GraphStore, StorageError, StorageResult};
use crate::storage::{
    LinkRecord, NewLink, NewOutlet, NewScrape, OutletRecord, RunRecord, RunStatus, ScrapeRecord,
    STATUS_OK,
};
use crate::MeshError;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

/// Default time a connection waits for a write lock held by another session
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCRAPE_COLUMNS: &str =
    "id, created_at, url_started, url_finished, status_code, seconds_elapsed";

const OUTLET_COLUMNS: &str = "id, name, url, fld, tld, country, area, reach, city, owner, \
     publisher, latitude, longitude, is_composite, scrape_id";

const LINK_SELECT: &str = "SELECT l.id, l.url_origin, l.fld_origin, l.scrape_origin_id, \
     l.url_target, l.fld_target, l.is_internal, l.scrape_target_id, t.status_code, \
     l.erroneous_scrapes \
     FROM links l LEFT JOIN scrapes t ON t.id = l.scrape_target_id";

/// SQLite storage backend
///
/// Each value owns one connection and therefore represents one session.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path` with the default busy timeout
    pub fn new(path: &Path) -> Result<Self, MeshError> {
        Self::open(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `busy_timeout` - How long to wait for locks held by other sessions
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, MeshError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;

        // WAL lets readers proceed while one worker writes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, MeshError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn query_links(&self, sql: &str, param: i64) -> StorageResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let links = stmt
            .query_map(params![param], map_link)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn map_scrape(row: &Row<'_>) -> rusqlite::Result<ScrapeRecord> {
    Ok(ScrapeRecord {
        id: row.get(0)?,
        created_at: row.get(1)?,
        url_started: row.get(2)?,
        url_finished: row.get(3)?,
        status_code: row.get(4)?,
        seconds_elapsed: row.get(5)?,
    })
}

fn map_outlet(row: &Row<'_>) -> rusqlite::Result<OutletRecord> {
    Ok(OutletRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        fld: row.get(3)?,
        tld: row.get(4)?,
        country: row.get(5)?,
        area: row.get(6)?,
        reach: row.get(7)?,
        city: row.get(8)?,
        owner: row.get(9)?,
        publisher: row.get(10)?,
        latitude: row.get(11)?,
        longitude: row.get(12)?,
        is_composite: row.get(13)?,
        scrape_id: row.get(14)?,
    })
}

fn map_link(row: &Row<'_>) -> rusqlite::Result<LinkRecord> {
    Ok(LinkRecord {
        id: row.get(0)?,
        url_origin: row.get(1)?,
        fld_origin: row.get(2)?,
        scrape_origin_id: row.get(3)?,
        url_target: row.get(4)?,
        fld_target: row.get(5)?,
        is_internal: row.get(6)?,
        scrape_target_id: row.get(7)?,
        target_status: row.get(8)?,
        erroneous_scrapes: row.get(9)?,
    })
}

fn map_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
    })
}

impl GraphStore for SqliteStorage {
    // ===== Transactions =====

    fn begin(&mut self) -> StorageResult<()> {
        // IMMEDIATE takes the write lock up front so two sessions never
        // deadlock upgrading read locks
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now(), config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                map_run,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Outlets =====

    fn insert_outlet(&mut self, outlet: &NewOutlet) -> StorageResult<Option<i64>> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO outlets
             (name, url, fld, tld, country, area, reach, city, owner, publisher,
              latitude, longitude, is_composite)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                outlet.name,
                outlet.url,
                outlet.fld,
                outlet.tld,
                outlet.country,
                outlet.area,
                outlet.reach,
                outlet.city,
                outlet.owner,
                outlet.publisher,
                outlet.latitude,
                outlet.longitude,
                outlet.is_composite,
            ],
        )?;

        if inserted == 0 {
            Ok(None)
        } else {
            Ok(Some(self.conn.last_insert_rowid()))
        }
    }

    fn get_outlet(&self, outlet_id: i64) -> StorageResult<OutletRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM outlets WHERE id = ?1", OUTLET_COLUMNS),
                params![outlet_id],
                map_outlet,
            )
            .optional()?
            .ok_or(StorageError::OutletNotFound(outlet_id))
    }

    fn unvisited_outlets(&self) -> StorageResult<Vec<OutletRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM outlets WHERE scrape_id IS NULL ORDER BY id",
            OUTLET_COLUMNS
        ))?;
        let outlets = stmt
            .query_map([], map_outlet)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(outlets)
    }

    fn attach_outlet_scrape(&mut self, outlet_id: i64, scrape_id: i64) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE outlets SET scrape_id = ?1 WHERE id = ?2",
            params![scrape_id, outlet_id],
        )?;
        if updated == 0 {
            return Err(StorageError::OutletNotFound(outlet_id));
        }
        Ok(())
    }

    // ===== Scrapes =====

    fn insert_scrape(&mut self, scrape: &NewScrape) -> StorageResult<ScrapeRecord> {
        let created_at = now();
        self.conn.execute(
            "INSERT INTO scrapes (created_at, url_started, url_finished, status_code, seconds_elapsed)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                created_at,
                scrape.url_started,
                scrape.url_finished,
                scrape.status_code,
                scrape.seconds_elapsed
            ],
        )?;

        Ok(ScrapeRecord {
            id: self.conn.last_insert_rowid(),
            created_at,
            url_started: scrape.url_started.clone(),
            url_finished: scrape.url_finished.clone(),
            status_code: scrape.status_code,
            seconds_elapsed: scrape.seconds_elapsed,
        })
    }

    fn get_scrape(&self, scrape_id: i64) -> StorageResult<ScrapeRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM scrapes WHERE id = ?1", SCRAPE_COLUMNS),
                params![scrape_id],
                map_scrape,
            )
            .optional()?
            .ok_or(StorageError::ScrapeNotFound(scrape_id))
    }

    fn earliest_successful_scrape(&self, url: &str) -> StorageResult<Option<ScrapeRecord>> {
        let scrape = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM scrapes
                     WHERE (url_started = ?1 OR url_finished = ?1) AND status_code = ?2
                     ORDER BY created_at ASC, id ASC LIMIT 1",
                    SCRAPE_COLUMNS
                ),
                params![url, STATUS_OK],
                map_scrape,
            )
            .optional()?;
        Ok(scrape)
    }

    fn scrapes_for_url(&self, url: &str) -> StorageResult<Vec<ScrapeRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM scrapes WHERE url_started = ?1 OR url_finished = ?1 ORDER BY id",
            SCRAPE_COLUMNS
        ))?;
        let scrapes = stmt
            .query_map(params![url], map_scrape)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(scrapes)
    }

    // ===== Links =====

    fn insert_link(&mut self, scrape_origin_id: i64, link: &NewLink) -> StorageResult<LinkRecord> {
        self.conn.execute(
            "INSERT INTO links
             (url_origin, fld_origin, scrape_origin_id, url_target, fld_target, is_internal, scrape_target_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                link.url_origin,
                link.fld_origin,
                scrape_origin_id,
                link.url_target,
                link.fld_target,
                link.is_internal,
                link.scrape_target_id
            ],
        )?;
        self.get_link(self.conn.last_insert_rowid())
    }

    fn get_link(&self, link_id: i64) -> StorageResult<LinkRecord> {
        self.conn
            .query_row(
                &format!("{} WHERE l.id = ?1", LINK_SELECT),
                params![link_id],
                map_link,
            )
            .optional()?
            .ok_or(StorageError::LinkNotFound(link_id))
    }

    fn set_link_target(&mut self, link_id: i64, scrape_id: i64) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE links SET scrape_target_id = ?1 WHERE id = ?2",
            params![scrape_id, link_id],
        )?;
        if updated == 0 {
            return Err(StorageError::LinkNotFound(link_id));
        }
        Ok(())
    }

    fn resolve_links_targeting(&mut self, url: &str, scrape_id: i64) -> StorageResult<u64> {
        let updated = self.conn.execute(
            "UPDATE links SET scrape_target_id = ?2
             WHERE url_target = ?1
               AND (scrape_target_id IS NULL
                    OR scrape_target_id IN (SELECT id FROM scrapes WHERE status_code != ?3))",
            params![url, scrape_id, STATUS_OK],
        )?;
        Ok(updated as u64)
    }

    fn increment_link_errors(&mut self, url: &str) -> StorageResult<u64> {
        let updated = self.conn.execute(
            "UPDATE links SET erroneous_scrapes = erroneous_scrapes + 1 WHERE url_target = ?1",
            params![url],
        )?;
        Ok(updated as u64)
    }

    fn outgoing_links(&self, scrape_id: i64) -> StorageResult<Vec<LinkRecord>> {
        self.query_links(
            &format!("{} WHERE l.scrape_origin_id = ?1 ORDER BY l.id", LINK_SELECT),
            scrape_id,
        )
    }

    fn outlet_links(&self) -> StorageResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE l.scrape_origin_id IN
                 (SELECT scrape_id FROM outlets WHERE scrape_id IS NOT NULL)
             ORDER BY l.id",
            LINK_SELECT
        ))?;
        let links = stmt
            .query_map([], map_link)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(links)
    }

    // ===== Statistics =====

    fn count_outlets(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM outlets")
    }

    fn count_scrapes(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM scrapes")
    }

    fn count_successful_scrapes(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM scrapes WHERE status_code = 200")
    }

    fn count_links(&self, internal: bool) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM links WHERE is_internal = ?1",
            params![internal],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn link_counts_by_origin(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT fld_origin, COUNT(*) FROM links GROUP BY fld_origin ORDER BY fld_origin",
        )?;
        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    fn count_external_links_to_outlets(&self) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM links l
             JOIN outlets o ON o.scrape_id = l.scrape_target_id
             WHERE l.is_internal = 0",
        )
    }
}
