use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::StaffRepo,
    },
    models::{DirectoryProfileUpdate, NewStaffMember, StaffMember, SyncStatus},
};

pub struct PostgresStaffRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresStaffRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_staff(row: &sqlx::postgres::PgRow) -> StaffMember {
        StaffMember {
            id: row.get("id"),
            tenant_id: row.get("tenant_id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
            account_id: row.get("account_id"),
            reference_code: row.get("reference_code"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

const INSERT_STAFF: &str = r#"
    INSERT INTO staff_members (
        id, tenant_id, first_name, last_name, email, account_id,
        reference_code, created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
    RETURNING id, tenant_id, first_name, last_name, email, account_id,
              reference_code, created_at, updated_at
"#;

#[async_trait]
impl StaffRepo for PostgresStaffRepo {
    async fn create(&self, input: NewStaffMember) -> DbResult<StaffMember> {
        let row = sqlx::query(INSERT_STAFF)
            .bind(Uuid::new_v4())
            .bind(input.tenant_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(input.account_id)
            .bind(&input.reference_code)
            .fetch_one(&self.write_pool)
            .await?;

        Ok(Self::parse_staff(&row))
    }

    async fn create_with_link(
        &self,
        input: NewStaffMember,
        external_user_id: &str,
        synced_at: DateTime<Utc>,
    ) -> DbResult<StaffMember> {
        let mut tx = self.write_pool.begin().await?;

        let row = sqlx::query(INSERT_STAFF)
            .bind(Uuid::new_v4())
            .bind(input.tenant_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(input.account_id)
            .bind(&input.reference_code)
            .fetch_one(&mut *tx)
            .await?;
        let staff = Self::parse_staff(&row);

        sqlx::query(
            r#"
            INSERT INTO external_identity_links (
                tenant_id, external_user_id, local_person_id,
                last_synced_at, sync_status, sync_error
            )
            VALUES ($1, $2, $3, $4, $5, NULL)
            "#,
        )
        .bind(input.tenant_id)
        .bind(external_user_id)
        .bind(staff.id)
        .bind(synced_at)
        .bind(SyncStatus::Active.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict(
                format!("Directory user '{}' is already linked", external_user_id),
            ),
            _ => DbError::from(e),
        })?;

        tx.commit().await?;

        Ok(staff)
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<StaffMember>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, first_name, last_name, email, account_id,
                   reference_code, created_at, updated_at
            FROM staff_members
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_staff))
    }

    async fn find_by_email(&self, tenant_id: Uuid, email: &str) -> DbResult<Option<StaffMember>> {
        let row = sqlx::query(
            r#"
            SELECT s.id, s.tenant_id, s.first_name, s.last_name, s.email, s.account_id,
                   s.reference_code, s.created_at, s.updated_at
            FROM staff_members s
            LEFT JOIN accounts a ON a.id = s.account_id
            WHERE s.tenant_id = $1
              AND (lower(s.email) = lower($2) OR lower(a.email) = lower($2))
            ORDER BY s.created_at, s.id
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.write_pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_staff))
    }

    async fn update_directory_profile(
        &self,
        id: Uuid,
        update: &DirectoryProfileUpdate,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE staff_members
            SET first_name = $1,
                last_name = $2,
                reference_code = COALESCE($3, reference_code),
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.reference_code)
        .bind(id)
        .execute(&self.write_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn count_by_tenant(&self, tenant_id: Uuid) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM staff_members WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.read_pool)
            .await?;

        Ok(row.get("count"))
    }
}
