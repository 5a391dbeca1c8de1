use crate::errors::Result;
use crate::models::OutreachResult;
use chrono::{DateTime, Utc};
use mobc::{Manager, Pool};
use rusqlite::{params, Connection, Result as SqliteResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub struct SqliteManager {
    db_path: String,
}

impl SqliteManager {
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Manager for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let conn = Connection::open(&self.db_path)?;

        // Some PRAGMA statements return a row; query_row handles both kinds.
        let exec_pragma = |conn: &Connection, pragma: &str| -> std::result::Result<(), rusqlite::Error> {
            match conn.execute(pragma, []) {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::ExecuteReturnedResults) => {
                    conn.query_row(pragma, [], |_| Ok(())).map(|_| ())
                }
                Err(e) => Err(e),
            }
        };

        exec_pragma(&conn, "PRAGMA journal_mode=WAL")?;
        exec_pragma(&conn, "PRAGMA synchronous=NORMAL")?;
        exec_pragma(&conn, "PRAGMA busy_timeout=5000")?;
        exec_pragma(&conn, "PRAGMA temp_store=memory")?;

        init_database(&conn)?;
        Ok(conn)
    }

    async fn check(&self, conn: Self::Connection) -> std::result::Result<Self::Connection, Self::Error> {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(conn)
    }
}

pub type DbPool = Pool<SqliteManager>;

pub async fn create_db_pool(db_path: &str) -> Result<DbPool> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let manager = SqliteManager::new(db_path.to_string());
    let pool = Pool::builder().max_open(10).max_idle(5).build(manager);

    info!("✓ SQLite connection pool created: {}", db_path);
    Ok(pool)
}

fn init_database(conn: &Connection) -> SqliteResult<()> {
    // The UNIQUE constraint is the dedup gate: at most one row per
    // (org_key, address) pair, repeat recordings collapse into an update.
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS sent_emails (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            org_key TEXT NOT NULL,
            address TEXT NOT NULL,
            sent_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'sent',
            UNIQUE(org_key, address)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS processed_orgs (
            org_key TEXT PRIMARY KEY,
            processed_at TEXT NOT NULL,
            status TEXT NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS results (
            org_key TEXT PRIMARY KEY,
            organization TEXT NOT NULL,
            domain TEXT,
            contact_name TEXT,
            email TEXT,
            score REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL
        )
        "#,
        [],
    )?;

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_sent_emails_org ON sent_emails(org_key)",
        "CREATE INDEX IF NOT EXISTS idx_sent_emails_address ON sent_emails(address)",
        "CREATE INDEX IF NOT EXISTS idx_results_status ON results(status)",
    ];
    for index_sql in indexes.iter() {
        conn.execute(index_sql, [])?;
    }

    Ok(())
}

/// Has a message already gone out to this (organization, address) pair?
pub async fn has_sent(pool: &DbPool, org_key: &str, address: &str) -> Result<bool> {
    let conn = pool.get().await?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sent_emails WHERE org_key = ?1 AND LOWER(address) = LOWER(?2) AND status = 'sent'",
        params![org_key, address],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Idempotent: recording the same pair twice updates the existing row
/// instead of creating a second one.
pub async fn record_sent(pool: &DbPool, org_key: &str, address: &str, status: &str) -> Result<()> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        INSERT INTO sent_emails (org_key, address, sent_at, status)
        VALUES (?1, LOWER(?2), ?3, ?4)
        ON CONFLICT (org_key, address) DO UPDATE SET
            sent_at = excluded.sent_at,
            status = excluded.status
        "#,
        params![org_key, address, Utc::now().to_rfc3339(), status],
    )?;
    debug!("Recorded send: {} -> {} ({})", org_key, address, status);
    Ok(())
}

pub async fn sent_record_count(pool: &DbPool, org_key: &str, address: &str) -> Result<i64> {
    let conn = pool.get().await?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sent_emails WHERE org_key = ?1 AND LOWER(address) = LOWER(?2)",
        params![org_key, address],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Supports skip-already-searched reruns.
pub async fn has_processed(pool: &DbPool, org_key: &str) -> Result<bool> {
    let conn = pool.get().await?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM processed_orgs WHERE org_key = ?1",
        params![org_key],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub async fn mark_processed(pool: &DbPool, org_key: &str, status: &str) -> Result<()> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        INSERT INTO processed_orgs (org_key, processed_at, status)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (org_key) DO UPDATE SET
            processed_at = excluded.processed_at,
            status = excluded.status
        "#,
        params![org_key, Utc::now().to_rfc3339(), status],
    )?;
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestContactRow {
    pub org_key: String,
    pub organization: String,
    pub domain: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub score: f64,
    pub status: String,
    pub notes: String,
    pub updated_at: DateTime<Utc>,
}

pub async fn record_best(pool: &DbPool, result: &OutreachResult) -> Result<()> {
    let conn = pool.get().await?;
    conn.execute(
        r#"
        INSERT INTO results (org_key, organization, domain, contact_name, email, score, status, notes, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT (org_key) DO UPDATE SET
            organization = excluded.organization,
            domain = COALESCE(excluded.domain, domain),
            contact_name = excluded.contact_name,
            email = excluded.email,
            score = excluded.score,
            status = excluded.status,
            notes = excluded.notes,
            updated_at = excluded.updated_at
        "#,
        params![
            result.org_key,
            result.organization.name,
            result.organization.domain,
            result.contact_name,
            result.email,
            result.score,
            result.status.as_str(),
            result.notes,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub async fn fetch_results(pool: &DbPool) -> Result<Vec<BestContactRow>> {
    let conn = pool.get().await?;
    let mut stmt = conn.prepare(
        "SELECT org_key, organization, domain, contact_name, email, score, status, notes, updated_at
         FROM results ORDER BY organization",
    )?;

    let row_iter = stmt.query_map([], |row| {
        let get_optional_string = |idx: usize| -> Option<String> {
            match row.get::<_, Option<String>>(idx) {
                Ok(Some(s)) if !s.is_empty() => Some(s),
                _ => None,
            }
        };

        let updated_at_str: String = row.get(8)?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    8,
                    updated_at_str.clone(),
                    rusqlite::types::Type::Text,
                )
            })?
            .with_timezone(&Utc);

        Ok(BestContactRow {
            org_key: row.get(0)?,
            organization: row.get(1)?,
            domain: get_optional_string(2),
            contact_name: get_optional_string(3),
            email: get_optional_string(4),
            score: row.get(5)?,
            status: row.get(6)?,
            notes: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            updated_at,
        })
    })?;

    let mut rows = Vec::new();
    for row in row_iter {
        rows.push(row?);
    }
    Ok(rows)
}
