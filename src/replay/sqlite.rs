use super::{ReplayCache, ReplayStore, now_ms};
use crate::config::ReplayBackend;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

const REPLAY_TABLE: &str = "
CREATE TABLE IF NOT EXISTS replay_signatures (
    signature TEXT PRIMARY KEY,
    expiry    INTEGER NOT NULL
)";
const REPLAY_EXPIRY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_replay_signatures_expiry ON replay_signatures(expiry)";

/// Replay cache mirrored to an embedded SQLite table.
pub struct SqliteReplayStore {
    cache: ReplayCache,
    pool: SqlitePool,
    max_entries: usize,
}

async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(REPLAY_TABLE)
        .execute(pool)
        .await
        .context("create replay_signatures table")?;
    sqlx::query(REPLAY_EXPIRY_INDEX)
        .execute(pool)
        .await
        .context("create replay_signatures expiry index")?;
    Ok(())
}

impl SqliteReplayStore {
    /// Open (or create) the database at `db_path` and load live entries.
    pub async fn open(db_path: &Path, max_entries: usize, now_ms: i64) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("create replay database directory")?;
        }

        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePool::connect(&url)
            .await
            .context("open replay SQLite database")?;

        Self::with_pool(pool, max_entries, now_ms).await
    }

    async fn with_pool(pool: SqlitePool, max_entries: usize, now_ms: i64) -> Result<Self> {
        init_schema(&pool).await?;

        sqlx::query("DELETE FROM replay_signatures WHERE expiry <= ?1")
            .bind(now_ms)
            .execute(&pool)
            .await
            .context("discard expired replay rows")?;

        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT signature, expiry FROM replay_signatures")
                .fetch_all(&pool)
                .await
                .context("load replay rows")?;

        Ok(Self {
            cache: ReplayCache::from_entries(rows, now_ms),
            pool,
            max_entries,
        })
    }

    /// Rows currently persisted, for inspection.
    pub async fn persisted_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM replay_signatures")
            .fetch_one(&self.pool)
            .await
            .context("count replay rows")?;
        Ok(count)
    }

    async fn write_rows(&self) -> Result<()> {
        let now = now_ms();
        let entries = self.cache.live_entries(now, self.max_entries);
        let max_rows = i64::try_from(self.max_entries).unwrap_or(i64::MAX);

        let mut tx = self.pool.begin().await.context("begin replay flush")?;

        for entry in &entries {
            sqlx::query(
                "INSERT INTO replay_signatures (signature, expiry) VALUES (?1, ?2)
                 ON CONFLICT(signature) DO UPDATE SET expiry = excluded.expiry",
            )
            .bind(&entry.signature)
            .bind(entry.expires_at_ms)
            .execute(&mut *tx)
            .await
            .context("upsert replay row")?;
        }

        sqlx::query("DELETE FROM replay_signatures WHERE expiry <= ?1")
            .bind(now)
            .execute(&mut *tx)
            .await
            .context("delete expired replay rows")?;

        sqlx::query(
            "DELETE FROM replay_signatures
             WHERE signature NOT IN (
                 SELECT signature FROM replay_signatures
                 ORDER BY expiry DESC, signature ASC
                 LIMIT ?1
             )",
        )
        .bind(max_rows)
        .execute(&mut *tx)
        .await
        .context("trim replay rows")?;

        tx.commit().await.context("commit replay flush")?;
        Ok(())
    }
}

impl ReplayStore for SqliteReplayStore {
    fn cache(&self) -> &ReplayCache {
        &self.cache
    }

    fn backend(&self) -> ReplayBackend {
        ReplayBackend::Sqlite
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.write_rows())
    }
}
