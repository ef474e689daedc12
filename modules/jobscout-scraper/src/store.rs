//! Persistence boundary. The dedup cache in front of this is best-effort;
//! the unique URL constraint here is what actually guarantees uniqueness.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use jobscout_common::{JobRecord, JobScoutError};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert one scraped job. Returns `Conflict` when a record with the
    /// same URL already exists.
    async fn insert(&self, record: &JobRecord) -> Result<(), JobScoutError>;

    /// Cheap connectivity check, run once at run start.
    async fn ping(&self) -> Result<(), JobScoutError>;
}

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub async fn connect(database_url: &str) -> Result<Self, JobScoutError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| JobScoutError::Setup(format!("failed to connect to Postgres: {e}")))?;
        info!("Connected to Postgres");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), JobScoutError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scraped_jobs (
                id BIGSERIAL PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                job_id TEXT NOT NULL,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                tags TEXT[] NOT NULL DEFAULT '{}',
                source TEXT NOT NULL,
                search_keyword TEXT NOT NULL,
                posted_at TIMESTAMPTZ,
                scraped_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| JobScoutError::Setup(format!("migration failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn insert(&self, record: &JobRecord) -> Result<(), JobScoutError> {
        let result = sqlx::query(
            r#"
            INSERT INTO scraped_jobs
                (url, job_id, title, company, location, description, category,
                 tags, source, search_keyword, posted_at, scraped_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(&record.url)
        .bind(&record.job_id)
        .bind(&record.title)
        .bind(&record.company)
        .bind(&record.location)
        .bind(&record.description)
        .bind(&record.category)
        .bind(&record.tags)
        .bind(&record.source)
        .bind(&record.search_keyword)
        .bind(record.posted_at)
        .bind(record.scraped_at)
        .execute(&self.pool)
        .await
        .map_err(|e| JobScoutError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(JobScoutError::Conflict);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), JobScoutError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| JobScoutError::Setup(format!("Postgres unreachable: {e}")))?;
        Ok(())
    }
}
