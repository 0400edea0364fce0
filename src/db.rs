use anyhow::Result;
use rusqlite::Connection;

use crate::parser::TrustRecord;

const DB_PATH: &str = "data/trusts.sqlite";

pub fn connect() -> Result<Connection> {
    if let Some(dir) = std::path::Path::new(DB_PATH).parent() {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id         INTEGER PRIMARY KEY,
            url        TEXT NOT NULL,
            html       TEXT,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            processed  BOOLEAN NOT NULL DEFAULT 0,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pages_processed ON pages(processed);

        CREATE TABLE IF NOT EXISTS trusts (
            name         TEXT PRIMARY KEY,
            page_id      INTEGER NOT NULL REFERENCES pages(id),
            seq          INTEGER NOT NULL,
            record       TEXT NOT NULL,
            processed_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_trusts_page ON trusts(page_id);
        ",
    )?;
    Ok(())
}

// ── Fetching ──

pub struct PageRow {
    pub url: String,
    pub html: Option<String>,
    pub status: Option<i32>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

pub fn insert_page(conn: &Connection, row: &PageRow) -> Result<i64> {
    conn.execute(
        "INSERT INTO pages (url, html, status, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![row.url, row.html, row.status, row.error, row.latency_ms],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent successfully fetched page that has not been processed yet.
pub fn latest_unprocessed(conn: &Connection) -> Result<Option<(i64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, html FROM pages
         WHERE html IS NOT NULL AND processed = 0
         ORDER BY id DESC LIMIT 1",
    )?;
    let mut rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.next().transpose()?)
}

pub fn mark_processed(conn: &Connection, page_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE pages SET processed = 1 WHERE id = ?1",
        rusqlite::params![page_id],
    )?;
    Ok(())
}

// ── Processing ──

pub fn save_trusts(conn: &Connection, page_id: i64, records: &[TrustRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO trusts (name, page_id, seq, record)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (seq, record) in records.iter().enumerate() {
            let json = serde_json::to_string(record)?;
            count += stmt.execute(rusqlite::params![record.name, page_id, seq as i64, json])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// All stored trust records in page order.
pub fn fetch_trusts(conn: &Connection) -> Result<Vec<TrustRecord>> {
    let mut stmt = conn.prepare("SELECT record FROM trusts ORDER BY seq")?;
    let jsons = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    let mut records = Vec::with_capacity(jsons.len());
    for json in jsons {
        records.push(serde_json::from_str(&json)?);
    }
    Ok(records)
}

// ── Stats ──

pub struct Stats {
    pub pages: usize,
    pub fetch_errors: usize,
    pub unprocessed: usize,
    pub trusts: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let pages: usize = conn.query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))?;
    let fetch_errors: usize = conn.query_row(
        "SELECT COUNT(*) FROM pages WHERE error IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let unprocessed: usize = conn.query_row(
        "SELECT COUNT(*) FROM pages WHERE html IS NOT NULL AND processed = 0",
        [],
        |r| r.get(0),
    )?;
    let trusts: usize = conn.query_row("SELECT COUNT(*) FROM trusts", [], |r| r.get(0))?;
    Ok(Stats {
        pages,
        fetch_errors,
        unprocessed,
        trusts,
    })
}
