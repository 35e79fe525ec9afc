use async_trait::async_trait;
use uuid::Uuid;

use crate::db::error::DbResult;

/// Per-tenant lease serializing directory sync runs across processes.
#[async_trait]
pub trait SyncLockRepo: Send + Sync {
    /// Take the lease for `tenant_id`, or take it over when the current
    /// holder acquired it before `stale_before_ms`. Returns `false` when a
    /// live lease is held by someone else.
    async fn try_acquire(
        &self,
        tenant_id: Uuid,
        holder: Uuid,
        now_ms: i64,
        stale_before_ms: i64,
    ) -> DbResult<bool>;

    /// Release the lease if `holder` still owns it.
    async fn release(&self, tenant_id: Uuid, holder: Uuid) -> DbResult<()>;
}
