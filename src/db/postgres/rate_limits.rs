use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::{
    db::{error::DbResult, repos::RateLimitRepo},
    models::RateLimitCounter,
};

pub struct PostgresRateLimitRepo {
    write_pool: PgPool,
}

impl PostgresRateLimitRepo {
    /// Counters are always read and written on the primary.
    pub fn new(write_pool: PgPool, _read_pool: Option<PgPool>) -> Self {
        Self { write_pool }
    }

    fn parse_counter(row: &sqlx::postgres::PgRow) -> RateLimitCounter {
        RateLimitCounter {
            attempts: row.get("attempts"),
            window_start: row.get("window_start"),
            reset_at: row.get("reset_at"),
            admitted: row.get("last_admitted"),
        }
    }
}

#[async_trait]
impl RateLimitRepo for PostgresRateLimitRepo {
    async fn check_and_increment(
        &self,
        key: &str,
        max_attempts: i64,
        window_ms: i64,
        now_ms: i64,
    ) -> DbResult<RateLimitCounter> {
        let row = sqlx::query(
            r#"
            INSERT INTO rate_limit_counters AS c (key, attempts, window_start, reset_at, last_admitted)
            VALUES ($1, 1, $2, $2 + $3, TRUE)
            ON CONFLICT (key) DO UPDATE SET
                attempts = CASE
                    WHEN c.reset_at <= $2 THEN 1
                    WHEN c.attempts < $4 THEN c.attempts + 1
                    ELSE c.attempts
                END,
                window_start = CASE WHEN c.reset_at <= $2 THEN $2 ELSE c.window_start END,
                reset_at = CASE WHEN c.reset_at <= $2 THEN $2 + $3 ELSE c.reset_at END,
                last_admitted = (c.reset_at <= $2 OR c.attempts < $4)
            RETURNING attempts, window_start, reset_at, last_admitted
            "#,
        )
        .bind(key)
        .bind(now_ms)
        .bind(window_ms)
        .bind(max_attempts)
        .fetch_one(&self.write_pool)
        .await?;

        Ok(Self::parse_counter(&row))
    }

    async fn get(&self, key: &str) -> DbResult<Option<RateLimitCounter>> {
        let row = sqlx::query(
            r#"
            SELECT attempts, window_start, reset_at, last_admitted
            FROM rate_limit_counters
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.write_pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_counter))
    }

    async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM rate_limit_counters WHERE key = $1")
            .bind(key)
            .execute(&self.write_pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now_ms: i64) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM rate_limit_counters WHERE reset_at <= $1")
            .bind(now_ms)
            .execute(&self.write_pool)
            .await?;

        Ok(result.rows_affected())
    }
}
