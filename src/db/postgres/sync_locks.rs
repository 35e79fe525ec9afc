use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{error::DbResult, repos::SyncLockRepo};

pub struct PostgresSyncLockRepo {
    write_pool: PgPool,
}

impl PostgresSyncLockRepo {
    pub fn new(write_pool: PgPool, _read_pool: Option<PgPool>) -> Self {
        Self { write_pool }
    }
}

#[async_trait]
impl SyncLockRepo for PostgresSyncLockRepo {
    async fn try_acquire(
        &self,
        tenant_id: Uuid,
        holder: Uuid,
        now_ms: i64,
        stale_before_ms: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO federation_sync_locks AS l (tenant_id, holder, acquired_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id) DO UPDATE SET
                holder = EXCLUDED.holder,
                acquired_at = EXCLUDED.acquired_at
            WHERE l.acquired_at < $4
            "#,
        )
        .bind(tenant_id)
        .bind(holder)
        .bind(now_ms)
        .bind(stale_before_ms)
        .execute(&self.write_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, tenant_id: Uuid, holder: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM federation_sync_locks WHERE tenant_id = $1 AND holder = $2")
            .bind(tenant_id)
            .bind(holder)
            .execute(&self.write_pool)
            .await?;

        Ok(())
    }
}
