use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{ApiCredential, ApiCredentialWithOwner, CreateApiCredential},
};

#[async_trait]
pub trait CredentialRepo: Send + Sync {
    /// Insert a credential. A duplicate `secret_hash` is a `Conflict`.
    async fn create(&self, input: CreateApiCredential, secret_hash: &str)
    -> DbResult<ApiCredential>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<ApiCredential>>;

    /// Look up by hash, including inactive and expired credentials. Callers
    /// decide usability.
    async fn get_by_hash(&self, secret_hash: &str) -> DbResult<Option<ApiCredentialWithOwner>>;

    async fn list_by_tenant(&self, tenant_id: Uuid) -> DbResult<Vec<ApiCredential>>;

    /// Toggle `is_active`. `NotFound` when the id does not exist in the tenant.
    async fn set_active(&self, id: Uuid, tenant_id: Uuid, active: bool) -> DbResult<()>;

    /// `NotFound` when the id does not exist in the tenant.
    async fn delete(&self, id: Uuid, tenant_id: Uuid) -> DbResult<()>;

    async fn update_last_used(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()>;
}
