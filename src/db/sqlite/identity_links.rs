use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::IdentityLinkRepo,
    },
    models::{ExternalIdentityLink, SyncStatus},
};

pub struct SqliteIdentityLinkRepo {
    pool: SqlitePool,
}

impl SqliteIdentityLinkRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_link(row: &sqlx::sqlite::SqliteRow) -> DbResult<ExternalIdentityLink> {
        let status: String = row.get("sync_status");
        Ok(ExternalIdentityLink {
            tenant_id: parse_uuid(row.get("tenant_id"))?,
            external_user_id: row.get("external_user_id"),
            local_person_id: parse_uuid(row.get("local_person_id"))?,
            last_synced_at: row.get("last_synced_at"),
            sync_status: SyncStatus::parse(&status)
                .ok_or_else(|| DbError::Internal(format!("Invalid sync status: {}", status)))?,
            sync_error: row.get("sync_error"),
        })
    }
}

#[async_trait]
impl IdentityLinkRepo for SqliteIdentityLinkRepo {
    async fn upsert(&self, link: &ExternalIdentityLink) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO external_identity_links (
                tenant_id, external_user_id, local_person_id,
                last_synced_at, sync_status, sync_error
            )
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(tenant_id, external_user_id) DO UPDATE SET
                local_person_id = excluded.local_person_id,
                last_synced_at = excluded.last_synced_at,
                sync_status = excluded.sync_status,
                sync_error = excluded.sync_error
            "#,
        )
        .bind(link.tenant_id.to_string())
        .bind(&link.external_user_id)
        .bind(link.local_person_id.to_string())
        .bind(link.last_synced_at)
        .bind(link.sync_status.as_str())
        .bind(&link.sync_error)
        .execute(&self.pool)
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
            WHERE tenant_id = ? AND external_user_id = ?
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(external_user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_link).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> DbResult<Vec<ExternalIdentityLink>> {
        let rows = sqlx::query(
            r#"
            SELECT tenant_id, external_user_id, local_person_id,
                   last_synced_at, sync_status, sync_error
            FROM external_identity_links
            WHERE tenant_id = ?
            ORDER BY external_user_id
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_link).collect()
    }
}
