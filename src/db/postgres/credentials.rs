use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::CredentialRepo,
    },
    models::{ApiCredential, ApiCredentialWithOwner, CreateApiCredential},
};

pub struct PostgresCredentialRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresCredentialRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_credential(row: &sqlx::postgres::PgRow) -> ApiCredential {
        ApiCredential {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            owner_principal_id: row.get("owner_account_id"),
            display_name: row.get("display_name"),
            secret_hash: row.get("secret_hash"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            last_used_at: row.get("last_used_at"),
            expires_at: row.get("expires_at"),
        }
    }
}

#[async_trait]
impl CredentialRepo for PostgresCredentialRepo {
    async fn create(
        &self,
        input: CreateApiCredential,
        secret_hash: &str,
    ) -> DbResult<ApiCredential> {
        let row = sqlx::query(
            r#"
            INSERT INTO api_credentials (
                id, tenant_id, owner_account_id, display_name, secret_hash,
                is_active, created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, TRUE, NOW(), $6)
            RETURNING id, tenant_id, owner_account_id, display_name, secret_hash,
                      is_active, created_at, last_used_at, expires_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.tenant_id)
        .bind(input.owner_principal_id)
        .bind(&input.display_name)
        .bind(secret_hash)
        .bind(input.expires_at)
        .fetch_one(&self.write_pool)
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

        Ok(Self::parse_credential(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<ApiCredential>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, owner_account_id, display_name, secret_hash,
                   is_active, created_at, last_used_at, expires_at
            FROM api_credentials
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_credential))
    }

    async fn get_by_hash(&self, secret_hash: &str) -> DbResult<Option<ApiCredentialWithOwner>> {
        // Read from the primary: a freshly revoked credential must not
        // verify from a lagging replica.
        let row = sqlx::query(
            r#"
            SELECT c.id, c.tenant_id, c.owner_account_id, c.display_name, c.secret_hash,
                   c.is_active, c.created_at, c.last_used_at, c.expires_at,
                   a.is_active AS owner_is_active
            FROM api_credentials c
            JOIN accounts a ON a.id = c.owner_account_id
            WHERE c.secret_hash = $1
            "#,
        )
        .bind(secret_hash)
        .fetch_optional(&self.write_pool)
        .await?;

        Ok(row.map(|row| ApiCredentialWithOwner {
            credential: Self::parse_credential(&row),
            owner_is_active: row.get("owner_is_active"),
        }))
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> DbResult<Vec<ApiCredential>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, owner_account_id, display_name, secret_hash,
                   is_active, created_at, last_used_at, expires_at
            FROM api_credentials
            WHERE tenant_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.read_pool)
        .await?;

        Ok(rows.iter().map(Self::parse_credential).collect())
    }

    async fn set_active(&self, id: Uuid, tenant_id: Uuid, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE api_credentials SET is_active = $1 WHERE id = $2 AND tenant_id = $3",
        )
        .bind(active)
        .bind(id)
        .bind(tenant_id)
        .execute(&self.write_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid, tenant_id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM api_credentials WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.write_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn update_last_used(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE api_credentials SET last_used_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.write_pool)
            .await?;

        Ok(())
    }
}
