use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::IdentityLinkRepo,
    },
    models::{ExternalIdentityLink, SyncStatus},
};

pub struct PostgresIdentityLinkRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresIdentityLinkRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_link(row: &sqlx::postgres::PgRow) -> DbResult<ExternalIdentityLink> {
        let status: String = row.get("sync_status");
        Ok(ExternalIdentityLink {
            tenant_id: row.get("tenant_id"),
            external_user_id: row.get("external_user_id"),
            local_person_id: row.get("local_person_id"),
            last_synced_at: row.get("last_synced_at"),
            sync_status: SyncStatus::parse(&status)
                .ok_or_else(|| DbError::Internal(format!("Invalid sync status: {}", status)))?,
            sync_error: row.get("sync_error"),
        })
    }
}

#[async_trait]
impl IdentityLinkRepo for PostgresIdentityLinkRepo {
    async fn upsert(&self, link: &ExternalIdentityLink) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO external_identity_links (
                tenant_id, external_user_id, local_person_id,
                last_synced_at, sync_status, sync_error
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tenant_id, external_user_id) DO UPDATE SET
                local_person_id = EXCLUDED.local_person_id,
                last_synced_at = EXCLUDED.last_synced_at,
                sync_status = EXCLUDED.sync_status,
                sync_error = EXCLUDED.sync_error
            "#,
        )
        .bind(link.tenant_id)
        .bind(&link.external_user_id)
        .bind(link.local_person_id)
        .bind(link.last_synced_at)
        .bind(link.sync_status.as_str())
        .bind(&link.sync_error)
        .execute(&self.write_pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        tenant_id: Uuid,
        external_user_id: &str,
    ) -> DbResult<Option<ExternalIdentityLink>> {
        let row = sqlx::query(
            r#"
            SELECT tenant_id, external_user_id, local_person_id,
                   last_synced_at, sync_status, sync_error
            FROM external_identity_links
            WHERE tenant_id = $1 AND external_user_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(external_user_id)
        .fetch_optional(&self.read_pool)
        .await?;

        row.as_ref().map(Self::parse_link).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> DbResult<Vec<ExternalIdentityLink>> {
        let rows = sqlx::query(
            r#"
            SELECT tenant_id, external_user_id, local_person_id,
                   last_synced_at, sync_status, sync_error
            FROM external_identity_links
            WHERE tenant_id = $1
            ORDER BY external_user_id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.read_pool)
        .await?;

        rows.iter().map(Self::parse_link).collect()
    }
}
