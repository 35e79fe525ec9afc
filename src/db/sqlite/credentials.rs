use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::CredentialRepo,
    },
    models::{ApiCredential, ApiCredentialWithOwner, CreateApiCredential},
};

pub struct SqliteCredentialRepo {
    pool: SqlitePool,
}

impl SqliteCredentialRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_credential(row: &sqlx::sqlite::SqliteRow) -> DbResult<ApiCredential> {
        Ok(ApiCredential {
            id: parse_uuid(row.get("id"))?,
            tenant_id: parse_uuid(row.get("tenant_id"))?,
            owner_principal_id: parse_uuid(row.get("owner_account_id"))?,
            display_name: row.get("display_name"),
            secret_hash: row.get("secret_hash"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            last_used_at: row.get("last_used_at"),
            expires_at: row.get("expires_at"),
        })
    }
}

#[async_trait]
impl CredentialRepo for SqliteCredentialRepo {
    async fn create(
        &self,
        input: CreateApiCredential,
        secret_hash: &str,
    ) -> DbResult<ApiCredential> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO api_credentials (
                id, tenant_id, owner_account_id, display_name, secret_hash,
                is_active, created_at, expires_at
            )
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(input.tenant_id.to_string())
        .bind(input.owner_principal_id.to_string())
        .bind(&input.display_name)
        .bind(secret_hash)
        .bind(now)
        .bind(input.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict("Credential with this hash already exists".to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                DbError::Validation("Owning account does not exist".to_string())
            }
            _ => DbError::from(e),
        })?;

        Ok(ApiCredential {
            id,
            tenant_id: input.tenant_id,
            owner_principal_id: input.owner_principal_id,
            display_name: input.display_name,
            secret_hash: secret_hash.to_string(),
            is_active: true,
            created_at: now,
            last_used_at: None,
            expires_at: input.expires_at,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<ApiCredential>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, owner_account_id, display_name, secret_hash,
                   is_active, created_at, last_used_at, expires_at
            FROM api_credentials
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_credential).transpose()
    }

    async fn get_by_hash(&self, secret_hash: &str) -> DbResult<Option<ApiCredentialWithOwner>> {
        let row = sqlx::query(
            r#"
            SELECT c.id, c.tenant_id, c.owner_account_id, c.display_name, c.secret_hash,
                   c.is_active, c.created_at, c.last_used_at, c.expires_at,
                   a.is_active AS owner_is_active
            FROM api_credentials c
            JOIN accounts a ON a.id = c.owner_account_id
            WHERE c.secret_hash = ?
            "#,
        )
        .bind(secret_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(ApiCredentialWithOwner {
                credential: Self::parse_credential(&row)?,
                owner_is_active: row.get("owner_is_active"),
            })),
            None => Ok(None),
        }
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> DbResult<Vec<ApiCredential>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, owner_account_id, display_name, secret_hash,
                   is_active, created_at, last_used_at, expires_at
            FROM api_credentials
            WHERE tenant_id = ?
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_credential).collect()
    }

    async fn set_active(&self, id: Uuid, tenant_id: Uuid, active: bool) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE api_credentials SET is_active = ? WHERE id = ? AND tenant_id = ?")
                .bind(active)
                .bind(id.to_string())
                .bind(tenant_id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid, tenant_id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM api_credentials WHERE id = ? AND tenant_id = ?")
            .bind(id.to_string())
            .bind(tenant_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn update_last_used(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE api_credentials SET last_used_at = ? WHERE id = ?")
            .bind(at)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
