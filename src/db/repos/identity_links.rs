use async_trait::async_trait;
use uuid::Uuid;

use crate::{db::error::DbResult, models::ExternalIdentityLink};

#[async_trait]
pub trait IdentityLinkRepo: Send + Sync {
    /// Insert or refresh the link for `(tenant_id, external_user_id)`.
    async fn upsert(&self, link: &ExternalIdentityLink) -> DbResult<()>;
    async fn get(
        &self,
        tenant_id: Uuid,
        external_user_id: &str,
    ) -> DbResult<Option<ExternalIdentityLink>>;
    async fn list_by_tenant(&self, tenant_id: Uuid) -> DbResult<Vec<ExternalIdentityLink>>;
}
