//! PostgreSQL-backed pieces, behind the `postgres` feature.
//!
//! Uses dynamic queries (sqlx::query) instead of compile-time checked
//! macros (sqlx::query!) to allow compilation without DATABASE_URL.

use crate::error::StoreError;
use crate::repository::SequenceAllocator;
use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::sync::Arc;
use tracing::debug;

/// Sequence allocator backed by a single-row counter table.
///
/// `SELECT ... FOR UPDATE` serializes concurrent allocators on the row
/// lock; each call runs in its own transaction, so the counter is
/// gapless and a value is handed out exactly once.
pub struct PgSequenceAllocator {
    pool: Arc<PgPool>,
    scheme: String,
}

impl PgSequenceAllocator {
    /// Create an allocator for the named counter row.
    pub fn new(pool: Arc<PgPool>, scheme: impl Into<String>) -> Self {
        Self {
            pool,
            scheme: scheme.into(),
        }
    }

    /// Create the counter table if missing and seed this scheme's row.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sequence_counter (
                scheme TEXT PRIMARY KEY,
                current BIGINT NOT NULL DEFAULT 0
            )",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "INSERT INTO sequence_counter (scheme, current)
             VALUES ($1, 0)
             ON CONFLICT (scheme) DO NOTHING",
        )
        .bind(&self.scheme)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SequenceAllocator for PgSequenceAllocator {
    async fn next_id(&self) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT current FROM sequence_counter WHERE scheme = $1 FOR UPDATE")
            .bind(&self.scheme)
            .fetch_one(&mut *tx)
            .await?;
        let next = row.get::<i64, _>("current") + 1;

        sqlx::query("UPDATE sequence_counter SET current = $1 WHERE scheme = $2")
            .bind(next)
            .bind(&self.scheme)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(scheme = %self.scheme, value = next, "allocated sequence value");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test]
    async fn test_next_id_counts_up(pool: PgPool) {
        let alloc = PgSequenceAllocator::new(Arc::new(pool), "test");
        alloc.ensure_schema().await.unwrap();

        assert_eq!(alloc.next_id().await.unwrap(), 1);
        assert_eq!(alloc.next_id().await.unwrap(), 2);
        assert_eq!(alloc.next_id().await.unwrap(), 3);
    }

    #[sqlx::test]
    async fn test_ensure_schema_is_idempotent(pool: PgPool) {
        let alloc = PgSequenceAllocator::new(Arc::new(pool), "test");
        alloc.ensure_schema().await.unwrap();
        alloc.next_id().await.unwrap();

        // Re-running must not reset the counter.
        alloc.ensure_schema().await.unwrap();
        assert_eq!(alloc.next_id().await.unwrap(), 2);
    }

    #[sqlx::test]
    async fn test_concurrent_allocations_never_collide(pool: PgPool) {
        let alloc = Arc::new(PgSequenceAllocator::new(Arc::new(pool), "test"));
        alloc.ensure_schema().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let alloc = alloc.clone();
            handles.push(tokio::spawn(async move { alloc.next_id().await.unwrap() }));
        }

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap());
        }
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), 20);
    }
}
