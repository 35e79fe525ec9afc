use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::AccountRepo,
    },
    models::{Account, CreateAccount},
};

pub struct PostgresAccountRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresAccountRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }
}

#[async_trait]
impl AccountRepo for PostgresAccountRepo {
    async fn create(&self, input: CreateAccount) -> DbResult<Account> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO accounts (id, tenant_id, email, display_name, is_active, created_at)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            "#,
        )
        .bind(id)
        .bind(input.tenant_id)
        .bind(&input.email)
        .bind(&input.display_name)
        .bind(now)
        .execute(&self.write_pool)
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
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.map(|row| Account {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            email: row.get("email"),
            display_name: row.get("display_name"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
        }))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE accounts SET is_active = $1 WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(&self.write_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
