use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{DbError, DbPool, DbResult},
    models::{EnableFederation, TenantFederationConfig},
};

/// Administrator operations on per-tenant federation settings.
#[derive(Clone)]
pub struct FederationConfigService {
    db: Arc<DbPool>,
}

impl FederationConfigService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn status(&self, tenant_id: Uuid) -> DbResult<Option<TenantFederationConfig>> {
        self.db.federation_configs().get(tenant_id).await
    }

    /// Enable federation with the given directory tenant and application ids.
    pub async fn enable(
        &self,
        tenant_id: Uuid,
        input: EnableFederation,
    ) -> DbResult<TenantFederationConfig> {
        let input = EnableFederation {
            external_tenant_id: input.external_tenant_id.trim().to_string(),
            external_client_id: input.external_client_id.trim().to_string(),
        };
        input.validate()?;

        let config = TenantFederationConfig {
            tenant_id,
            enabled: true,
            external_tenant_id: Some(input.external_tenant_id),
            external_client_id: Some(input.external_client_id),
            updated_at: Utc::now(),
        };
        self.db.federation_configs().upsert(&config).await?;

        tracing::info!(tenant_id = %tenant_id, "Enabled directory federation");
        Ok(config)
    }

    /// Disable federation. The stored ids are kept so it can be re-enabled.
    pub async fn disable(&self, tenant_id: Uuid) -> DbResult<TenantFederationConfig> {
        let Some(mut config) = self.db.federation_configs().get(tenant_id).await? else {
            return Err(DbError::NotFound);
        };

        config.enabled = false;
        config.updated_at = Utc::now();
        self.db.federation_configs().upsert(&config).await?;

        tracing::info!(tenant_id = %tenant_id, "Disabled directory federation");
        Ok(config)
    }
}
