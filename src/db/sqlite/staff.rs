use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::common::{parse_opt_uuid, parse_uuid};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::StaffRepo,
    },
    models::{DirectoryProfileUpdate, NewStaffMember, StaffMember, SyncStatus},
};

pub struct SqliteStaffRepo {
    pool: SqlitePool,
}

impl SqliteStaffRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_staff(row: &sqlx::sqlite::SqliteRow) -> DbResult<StaffMember> {
        Ok(StaffMember {
            id: parse_uuid(row.get("id"))?,
            tenant_id: parse_uuid(row.get("tenant_id"))?,
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
            account_id: parse_opt_uuid(row.get("account_id"))?,
            reference_code: row.get("reference_code"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn new_record(input: NewStaffMember, id: Uuid, now: DateTime<Utc>) -> StaffMember {
        StaffMember {
            id,
            tenant_id: input.tenant_id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            account_id: input.account_id,
            reference_code: input.reference_code,
            created_at: now,
            updated_at: now,
        }
    }
}

const INSERT_STAFF: &str = r#"
    INSERT INTO staff_members (
        id, tenant_id, first_name, last_name, email, account_id,
        reference_code, created_at, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

#[async_trait]
impl StaffRepo for SqliteStaffRepo {
    async fn create(&self, input: NewStaffMember) -> DbResult<StaffMember> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(INSERT_STAFF)
            .bind(id.to_string())
            .bind(input.tenant_id.to_string())
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(input.account_id.map(|a| a.to_string()))
            .bind(&input.reference_code)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(Self::new_record(input, id, now))
    }

    async fn create_with_link(
        &self,
        input: NewStaffMember,
        external_user_id: &str,
        synced_at: DateTime<Utc>,
    ) -> DbResult<StaffMember> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(INSERT_STAFF)
            .bind(id.to_string())
            .bind(input.tenant_id.to_string())
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(input.account_id.map(|a| a.to_string()))
            .bind(&input.reference_code)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO external_identity_links (
                tenant_id, external_user_id, local_person_id,
                last_synced_at, sync_status, sync_error
            )
            VALUES (?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(input.tenant_id.to_string())
        .bind(external_user_id)
        .bind(id.to_string())
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

        Ok(Self::new_record(input, id, now))
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<StaffMember>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, first_name, last_name, email, account_id,
                   reference_code, created_at, updated_at
            FROM staff_members
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_staff).transpose()
    }

    async fn find_by_email(&self, tenant_id: Uuid, email: &str) -> DbResult<Option<StaffMember>> {
        let row = sqlx::query(
            r#"
            SELECT s.id, s.tenant_id, s.first_name, s.last_name, s.email, s.account_id,
                   s.reference_code, s.created_at, s.updated_at
            FROM staff_members s
            LEFT JOIN accounts a ON a.id = s.account_id
            WHERE s.tenant_id = ?
              AND (lower(s.email) = lower(?) OR lower(a.email) = lower(?))
            ORDER BY s.created_at, s.id
            LIMIT 1
            "#,
        )
        .bind(tenant_id.to_string())
        .bind(email)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::parse_staff).transpose()
    }

    async fn update_directory_profile(
        &self,
        id: Uuid,
        update: &DirectoryProfileUpdate,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE staff_members
            SET first_name = ?,
                last_name = ?,
                reference_code = COALESCE(?, reference_code),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.reference_code)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn count_by_tenant(&self, tenant_id: Uuid) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM staff_members WHERE tenant_id = ?")
            .bind(tenant_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("count"))
    }
}
