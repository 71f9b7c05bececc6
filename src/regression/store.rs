//! Baseline persistence. Baselines are keyed by pipeline version and never
//! mutated once saved.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

use super::types::{CaseSnapshot, MetricSet, RegressionBaseline, RunRecord};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Baseline already exists for version {version}")]
    BaselineExists { version: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub trait BaselineStore {
    /// Fails with `BaselineExists` when the version is already stored.
    fn save_baseline(&self, baseline: &RegressionBaseline) -> Result<(), StoreError>;
    fn load_baseline(&self, version: &str) -> Result<Option<RegressionBaseline>, StoreError>;
    /// Most recently created baseline.
    fn latest_baseline(&self) -> Result<Option<RegressionBaseline>, StoreError>;
    fn list_versions(&self) -> Result<Vec<String>, StoreError>;
    fn record_run(&self, run: &RunRecord) -> Result<(), StoreError>;
    /// Runs against a baseline, oldest first.
    fn runs_for(&self, baseline_version: &str) -> Result<Vec<RunRecord>, StoreError>;
}

// ═══════════════════════════════════════════════════════════
// SQLite
// ═══════════════════════════════════════════════════════════

pub struct SqliteBaselineStore {
    conn: Connection,
}

impl SqliteBaselineStore {
    /// Open (creating parent directories) and migrate.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// In-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=DELETE;
             PRAGMA foreign_keys=ON;",
        )?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    fn row_to_baseline(
        version: String,
        id: String,
        created_at: DateTime<Utc>,
        cases_json: String,
    ) -> Result<RegressionBaseline, StoreError> {
        let cases: Vec<CaseSnapshot> = serde_json::from_str(&cases_json)?;
        Ok(RegressionBaseline {
            id: Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt(e.to_string()))?,
            pipeline_version: version,
            created_at,
            cases,
        })
    }

    fn query_baseline(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Option<RegressionBaseline>, StoreError> {
        let row = self
            .conn
            .query_row(sql, args, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, DateTime<Utc>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .optional()?;
        row.map(|(version, id, created_at, cases)| Self::row_to_baseline(version, id, created_at, cases))
            .transpose()
    }
}

/// Run all pending migrations.
fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version: i64 = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, i64>(0)
        })
        .unwrap_or(0);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_baselines.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running baseline store migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }
    Ok(())
}

impl BaselineStore for SqliteBaselineStore {
    fn save_baseline(&self, baseline: &RegressionBaseline) -> Result<(), StoreError> {
        let exists: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM baselines WHERE version = ?1",
            params![baseline.pipeline_version],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(StoreError::BaselineExists {
                version: baseline.pipeline_version.clone(),
            });
        }

        self.conn.execute(
            "INSERT INTO baselines (version, id, created_at, cases_json) VALUES (?1, ?2, ?3, ?4)",
            params![
                baseline.pipeline_version,
                baseline.id.to_string(),
                baseline.created_at,
                serde_json::to_string(&baseline.cases)?,
            ],
        )?;
        tracing::info!(
            version = %baseline.pipeline_version,
            cases = baseline.cases.len(),
            "Baseline saved"
        );
        Ok(())
    }

    fn load_baseline(&self, version: &str) -> Result<Option<RegressionBaseline>, StoreError> {
        self.query_baseline(
            "SELECT version, id, created_at, cases_json FROM baselines WHERE version = ?1",
            &[&version],
        )
    }

    fn latest_baseline(&self) -> Result<Option<RegressionBaseline>, StoreError> {
        self.query_baseline(
            "SELECT version, id, created_at, cases_json FROM baselines
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            &[],
        )
    }

    fn list_versions(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT version FROM baselines ORDER BY created_at, rowid")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut versions = Vec::new();
        for row in rows {
            versions.push(row?);
        }
        Ok(versions)
    }

    fn record_run(&self, run: &RunRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO regression_runs
             (id, pipeline_version, baseline_version, recorded_at, metrics_json, detected)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.id.to_string(),
                run.pipeline_version,
                run.baseline_version,
                run.recorded_at,
                serde_json::to_string(&run.metrics)?,
                run.detected,
            ],
        )?;
        Ok(())
    }

    fn runs_for(&self, baseline_version: &str) -> Result<Vec<RunRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, pipeline_version, baseline_version, recorded_at, metrics_json, detected
             FROM regression_runs WHERE baseline_version = ?1
             ORDER BY recorded_at, rowid",
        )?;
        let rows = stmt.query_map(params![baseline_version], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, DateTime<Utc>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?;

        let mut runs = Vec::new();
        for row in rows {
            let (id, pipeline_version, baseline_version, recorded_at, metrics, detected) = row?;
            let metrics: MetricSet = serde_json::from_str(&metrics)?;
            runs.push(RunRecord {
                id: Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt(e.to_string()))?,
                pipeline_version,
                baseline_version,
                recorded_at,
                metrics,
                detected,
            });
        }
        Ok(runs)
    }
}

// ═══════════════════════════════════════════════════════════
// In-memory
// ═══════════════════════════════════════════════════════════

/// Volatile store for tests and one-shot runs.
#[derive(Default)]
pub struct InMemoryBaselineStore {
    baselines: Mutex<Vec<RegressionBaseline>>,
    runs: Mutex<Vec<RunRecord>>,
}

impl InMemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BaselineStore for InMemoryBaselineStore {
    fn save_baseline(&self, baseline: &RegressionBaseline) -> Result<(), StoreError> {
        let mut baselines = self.baselines.lock().map_err(|_| StoreError::LockPoisoned)?;
        if baselines
            .iter()
            .any(|b| b.pipeline_version == baseline.pipeline_version)
        {
            return Err(StoreError::BaselineExists {
                version: baseline.pipeline_version.clone(),
            });
        }
        baselines.push(baseline.clone());
        Ok(())
    }

    fn load_baseline(&self, version: &str) -> Result<Option<RegressionBaseline>, StoreError> {
        let baselines = self.baselines.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(baselines
            .iter()
            .find(|b| b.pipeline_version == version)
            .cloned())
    }

    fn latest_baseline(&self) -> Result<Option<RegressionBaseline>, StoreError> {
        let baselines = self.baselines.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(baselines.last().cloned())
    }

    fn list_versions(&self) -> Result<Vec<String>, StoreError> {
        let baselines = self.baselines.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(baselines.iter().map(|b| b.pipeline_version.clone()).collect())
    }

    fn record_run(&self, run: &RunRecord) -> Result<(), StoreError> {
        self.runs
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .push(run.clone());
        Ok(())
    }

    fn runs_for(&self, baseline_version: &str) -> Result<Vec<RunRecord>, StoreError> {
        let runs = self.runs.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(runs
            .iter()
            .filter(|r| r.baseline_version == baseline_version)
            .cloned()
            .collect())
    }
}
