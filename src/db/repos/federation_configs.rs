use async_trait::async_trait;
use uuid::Uuid;

use crate::{db::error::DbResult, models::TenantFederationConfig};

#[async_trait]
pub trait FederationConfigRepo: Send + Sync {
    async fn get(&self, tenant_id: Uuid) -> DbResult<Option<TenantFederationConfig>>;
    async fn upsert(&self, config: &TenantFederationConfig) -> DbResult<()>;
}
