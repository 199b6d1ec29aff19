use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::task;
use tracing::{debug, warn};

use super::{RecordStatus, RunRecord, RunStore, RunSummary};

/// SQLite-backed run records
pub struct SqliteRunStore {
    db_path: PathBuf,
}

/// Open a SQLite connection with standard pragmas (busy_timeout).
fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database: {}", db_path.display()))?;
    conn.execute_batch("PRAGMA busy_timeout=5000;")
        .context("failed to set busy_timeout")?;
    Ok(conn)
}

fn decode(data: &str) -> Result<RunRecord> {
    serde_json::from_str(data).context("corrupt run record")
}

impl SqliteRunStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let store = Self { db_path };
        store.init_schema()?;

        Ok(store)
    }

    /// Store at the default location (~/.nl2hls/runs.db)
    pub fn default_location() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Self::new(PathBuf::from(home).join(".nl2hls").join("runs.db"))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn init_schema(&self) -> Result<()> {
        let conn = open_connection(&self.db_path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("failed to set WAL mode")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                requirement TEXT NOT NULL,
                pipeline TEXT NOT NULL,
                status TEXT NOT NULL,
                rounds INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                error TEXT,
                data TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create runs table")?;

        conn.execute("CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status)", [])
            .context("failed to create status index")?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_created ON runs(created_at)",
            [],
        )
        .context("failed to create created_at index")?;

        debug!(path = %self.db_path.display(), "initialized run store");
        Ok(())
    }
}

#[async_trait]
impl RunStore for SqliteRunStore {
    async fn save(&self, record: &RunRecord) -> Result<()> {
        let record = record.clone();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            let data = serde_json::to_string(&record)?;

            conn.execute(
                "INSERT OR REPLACE INTO runs (id, requirement, pipeline, status, rounds, created_at, updated_at, error, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    record.id,
                    record.requirement,
                    record.pipeline,
                    record.status.to_string(),
                    record.rounds as i64,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                    record.error,
                    data,
                ],
            )?;

            debug!(id = %record.id, status = %record.status, "saved run");
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")??;

        Ok(())
    }

    /// Load by full ID, or by a prefix that matches exactly one run.
    async fn load(&self, id: &str) -> Result<Option<RunRecord>> {
        let id = id.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;

            let exact = conn.query_row("SELECT data FROM runs WHERE id = ?1", [&id], |row| {
                row.get::<_, String>(0)
            });
            match exact {
                Ok(data) => return decode(&data).map(Some),
                Err(rusqlite::Error::QueryReturnedNoRows) => {}
                Err(e) => return Err(e.into()),
            }

            let pattern = format!("{}%", id.replace('%', "").replace('_', ""));
            let mut stmt = conn.prepare("SELECT data FROM runs WHERE id LIKE ?1 LIMIT 2")?;
            let matches = stmt
                .query_map([&pattern], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            match matches.as_slice() {
                [] => Ok(None),
                [data] => decode(data).map(Some),
                _ => anyhow::bail!("run ID prefix '{}' is ambiguous", id),
            }
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn list(&self, status: Option<RecordStatus>) -> Result<Vec<RunSummary>> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;

            let mut stmt = conn.prepare(
                "SELECT id, requirement, pipeline, status, rounds, created_at, error
                 FROM runs
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY created_at DESC",
            )?;

            let rows = stmt
                .query_map([status.map(|s| s.to_string())], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut result = Vec::with_capacity(rows.len());
            for (id, requirement, pipeline, status_str, rounds, created_at, error) in rows {
                let status = status_str.parse::<RecordStatus>().unwrap_or_else(|e| {
                    warn!(id = %id, status = %status_str, error = %e, "invalid status in database, treating as failed");
                    RecordStatus::Failed
                });
                result.push(RunSummary {
                    id,
                    requirement,
                    pipeline,
                    status,
                    rounds: usize::try_from(rounds).unwrap_or_default(),
                    created_at,
                    error,
                });
            }

            Ok(result)
        })
        .await
        .context("spawn_blocking failed")?
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            conn.execute("DELETE FROM runs WHERE id = ?1", [&id])?;
            if conn.changes() == 0 {
                anyhow::bail!("run '{}' not found", id);
            }
            debug!(id = %id, "deleted run");
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("spawn_blocking failed")??;

        Ok(())
    }
}
