use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    db::{error::DbResult, repos::FederationConfigRepo},
    models::TenantFederationConfig,
};

pub struct PostgresFederationConfigRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresFederationConfigRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }
}

#[async_trait]
impl FederationConfigRepo for PostgresFederationConfigRepo {
    async fn get(&self, tenant_id: Uuid) -> DbResult<Option<TenantFederationConfig>> {
        let row = sqlx::query(
            r#"
            SELECT tenant_id, enabled, external_tenant_id, external_client_id, updated_at
            FROM tenant_federation_configs
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.map(|row| TenantFederationConfig {
            tenant_id: row.get("tenant_id"),
            enabled: row.get("enabled"),
            external_tenant_id: row.get("external_tenant_id"),
            external_client_id: row.get("external_client_id"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn upsert(&self, config: &TenantFederationConfig) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_federation_configs (
                tenant_id, enabled, external_tenant_id, external_client_id, updated_at
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                external_tenant_id = EXCLUDED.external_tenant_id,
                external_client_id = EXCLUDED.external_client_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(config.tenant_id)
        .bind(config.enabled)
        .bind(&config.external_tenant_id)
        .bind(&config.external_client_id)
        .bind(config.updated_at)
        .execute(&self.write_pool)
        .await?;

        Ok(())
    }
}
