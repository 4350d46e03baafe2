//! PostgreSQL job store backend.
//!
//! Records are stored as JSONB keyed by digest; `save` is an upsert so the
//! terminal write of whichever run finishes last wins, same as the other
//! backends.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use harmon_core::{ContentDigest, Job, JobStore, Result};

/// PostgreSQL implementation of [`JobStore`].
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create a new store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the given database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Create the jobs table if it does not exist. Deployments that manage
    /// schema externally can skip this.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS harmon_jobs (
                digest     TEXT PRIMARY KEY,
                record     JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn save(&self, digest: &ContentDigest, job: &Job) -> Result<()> {
        let record = serde_json::to_value(job)?;
        sqlx::query(
            r#"
            INSERT INTO harmon_jobs (digest, record, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (digest)
            DO UPDATE SET record = EXCLUDED.record, updated_at = now()
            "#,
        )
        .bind(digest.as_str())
        .bind(&record)
        .execute(&self.pool)
        .await?;
        debug!(digest = %digest, status = ?job.status, "Upserted job record");
        Ok(())
    }

    async fn get(&self, digest: &ContentDigest) -> Result<Option<Job>> {
        let row = sqlx::query("SELECT record FROM harmon_jobs WHERE digest = $1")
            .bind(digest.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let record: serde_json::Value = row.try_get("record")?;
                Ok(Some(serde_json::from_value(record)?))
            }
            None => Ok(None),
        }
    }
}
