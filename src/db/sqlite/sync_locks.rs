use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{error::DbResult, repos::SyncLockRepo};

pub struct SqliteSyncLockRepo {
    pool: SqlitePool,
}

impl SqliteSyncLockRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncLockRepo for SqliteSyncLockRepo {
    async fn try_acquire(
        &self,
        tenant_id: Uuid,
        holder: Uuid,
        now_ms: i64,
        stale_before_ms: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO federation_sync_locks (tenant_id, holder, acquired_at)
            VALUES (?, ?, ?)
            ON CONFLICT(tenant_id) DO UPDATE SET
                holder = excluded.holder,
                acquired_at = excluded.acquired_at
            WHERE federation_sync_locks.acquired_at < ?
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(holder.to_string())
        .bind(now_ms)
        .bind(stale_before_ms)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, tenant_id: Uuid, holder: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM federation_sync_locks WHERE tenant_id = ? AND holder = ?")
            .bind(tenant_id.to_string())
            .bind(holder.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
