use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{error::DbResult, repos::FederationConfigRepo},
    models::TenantFederationConfig,
};

pub struct SqliteFederationConfigRepo {
    pool: SqlitePool,
}

impl SqliteFederationConfigRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FederationConfigRepo for SqliteFederationConfigRepo {
    async fn get(&self, tenant_id: Uuid) -> DbResult<Option<TenantFederationConfig>> {
        let row = sqlx::query(
            r#"
            SELECT tenant_id, enabled, external_tenant_id, external_client_id, updated_at
            FROM tenant_federation_configs
            WHERE tenant_id = ?
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(TenantFederationConfig {
                tenant_id: parse_uuid(row.get("tenant_id"))?,
                enabled: row.get("enabled"),
                external_tenant_id: row.get("external_tenant_id"),
                external_client_id: row.get("external_client_id"),
                updated_at: row.get("updated_at"),
            })),
            None => Ok(None),
        }
    }

    async fn upsert(&self, config: &TenantFederationConfig) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tenant_federation_configs (
                tenant_id, enabled, external_tenant_id, external_client_id, updated_at
            )
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(tenant_id) DO UPDATE SET
                enabled = excluded.enabled,
                external_tenant_id = excluded.external_tenant_id,
                external_client_id = excluded.external_client_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(config.tenant_id.to_string())
        .bind(config.enabled)
        .bind(&config.external_tenant_id)
        .bind(&config.external_client_id)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
