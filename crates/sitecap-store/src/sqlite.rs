//! SQLite capability store
//!
//! Reference persistence backend using sqlx. The catalogue table (`sources`)
//! is keyed on domain so repeated saves from finalize and partial-save paths
//! collapse into one row. Tasks and steps form the task-tracking side.

use crate::error::{Error, Result};
use crate::task::{StoredStep, TaskStatus, TaskTokens};
use crate::traits::CapabilityStore;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Capability store backed by SQLite
#[derive(Clone)]
pub struct SqliteCapabilityStore {
    pool: SqlitePool,
}

impl SqliteCapabilityStore {
    /// Open (or create) a store at the given path and run schema setup
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Open an in-process store (`sqlite::memory:`), mainly for tests
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::Database(e.to_string()))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Get a reference to the underlying connection pool
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool. The builder calls this once, never between retries.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                domain TEXT NOT NULL UNIQUE,
                capability TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                source_id INTEGER NOT NULL REFERENCES sources(id),
                scenario TEXT NOT NULL,
                start_url TEXT NOT NULL,
                status TEXT NOT NULL,
                duration_ms INTEGER,
                input_tokens INTEGER NOT NULL DEFAULT 0,
                output_tokens INTEGER NOT NULL DEFAULT 0,
                error_message TEXT,
                created_at TEXT NOT NULL,
                completed_at TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS steps (
                task_id TEXT NOT NULL REFERENCES tasks(id),
                ordinal INTEGER NOT NULL,
                tool TEXT NOT NULL,
                arguments TEXT NOT NULL,
                result TEXT,
                error TEXT,
                duration_ms INTEGER NOT NULL,
                page_type TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (task_id, ordinal)
            )
            "#,
        ];
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Database(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CapabilityStore for SqliteCapabilityStore {
    #[instrument(skip(self, capability), fields(domain = %domain))]
    async fn save(&self, domain: &str, capability: &serde_json::Value) -> Result<i64> {
        let payload = serde_json::to_string(capability)?;
        let row = sqlx::query(
            r#"
            INSERT INTO sources (domain, capability, recorded_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(domain) DO UPDATE SET
                capability = excluded.capability,
                recorded_at = excluded.recorded_at
            RETURNING id
            "#,
        )
        .bind(domain)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        let id: i64 = row.get("id");
        debug!(source_id = id, "Saved capability");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn create_task(&self, source_id: i64, scenario: &str, start_url: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO tasks (id, source_id, scenario, start_url, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(id.to_string())
        .bind(source_id)
        .bind(scenario)
        .bind(start_url)
        .bind(TaskStatus::Running.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        debug!(task_id = %id, source_id, "Created recording task");
        Ok(id)
    }

    #[instrument(skip(self, step), fields(task_id = %task_id, ordinal = step.ordinal))]
    async fn add_step(&self, task_id: Uuid, step: &StoredStep) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO steps (task_id, ordinal, tool, arguments, result, error,
                               duration_ms, page_type, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(task_id.to_string())
        .bind(step.ordinal as i64)
        .bind(&step.tool)
        .bind(serde_json::to_string(&step.arguments)?)
        .bind(
            step.result
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        )
        .bind(&step.error)
        .bind(step.duration_ms as i64)
        .bind(&step.page_type)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self), fields(task_id = %task_id, status = %status))]
    async fn complete_task(
        &self,
        task_id: Uuid,
        status: TaskStatus,
        duration_ms: u64,
        tokens: TaskTokens,
        error_message: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?2, duration_ms = ?3, input_tokens = ?4,
                output_tokens = ?5, error_message = ?6, completed_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(task_id.to_string())
        .bind(status.as_str())
        .bind(duration_ms as i64)
        .bind(tokens.input_tokens as i64)
        .bind(tokens.output_tokens as i64)
        .bind(error_message)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(Error::TaskNotFound(task_id.to_string()));
        }
        debug!("Task marked {}", status);
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
