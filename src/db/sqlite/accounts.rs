use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::AccountRepo,
    },
    models::{Account, CreateAccount},
};

pub struct SqliteAccountRepo {
    pool: SqlitePool,
}

impl SqliteAccountRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_account(row: &sqlx::sqlite::SqliteRow) -> DbResult<Account> {
        Ok(Account {
            id: parse_uuid(row.get("id"))?,
            tenant_id: parse_uuid(row.get("tenant_id"))?,
            email: row.get("email"),
            display_name: row.get("display_name"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl AccountRepo for SqliteAccountRepo {
    async fn create(&self, input: CreateAccount) -> DbResult<Account> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO accounts (id, tenant_id, email, display_name, is_active, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(input.tenant_id.to_string())
        .bind(&input.email)
        .bind(&input.display_name)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict(
                format!("Account with email '{}' already exists", input.email),
            ),
            _ => DbError::from(e),
        })?;

        Ok(Account {
            id,
            tenant_id: input.tenant_id,
            email: input.email,
            display_name: input.display_name,
            is_active: true,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, email, display_name, is_active, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_account).transpose()
    }

    async fn set_active(&self, id: Uuid, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE accounts SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
