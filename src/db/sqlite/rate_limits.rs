use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::{
    db::{error::DbResult, repos::RateLimitRepo},
    models::RateLimitCounter,
};

pub struct SqliteRateLimitRepo {
    pool: SqlitePool,
}

impl SqliteRateLimitRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_counter(row: &sqlx::sqlite::SqliteRow) -> RateLimitCounter {
        RateLimitCounter {
            attempts: row.get("attempts"),
            window_start: row.get("window_start"),
            reset_at: row.get("reset_at"),
            admitted: row.get("last_admitted"),
        }
    }
}

#[async_trait]
impl RateLimitRepo for SqliteRateLimitRepo {
    async fn check_and_increment(
        &self,
        key: &str,
        max_attempts: i64,
        window_ms: i64,
        now_ms: i64,
    ) -> DbResult<RateLimitCounter> {
        // SET expressions see the pre-update row, so every CASE tests the
        // old window and the old attempt count.
        let row = sqlx::query(
            r#"
            INSERT INTO rate_limit_counters (key, attempts, window_start, reset_at, last_admitted)
            VALUES (?1, 1, ?2, ?2 + ?3, 1)
            ON CONFLICT(key) DO UPDATE SET
                attempts = CASE
                    WHEN rate_limit_counters.reset_at <= ?2 THEN 1
                    WHEN rate_limit_counters.attempts < ?4 THEN rate_limit_counters.attempts + 1
                    ELSE rate_limit_counters.attempts
                END,
                window_start = CASE
                    WHEN rate_limit_counters.reset_at <= ?2 THEN ?2
                    ELSE rate_limit_counters.window_start
                END,
                reset_at = CASE
                    WHEN rate_limit_counters.reset_at <= ?2 THEN ?2 + ?3
                    ELSE rate_limit_counters.reset_at
                END,
                last_admitted = CASE
                    WHEN rate_limit_counters.reset_at <= ?2 THEN 1
                    WHEN rate_limit_counters.attempts < ?4 THEN 1
                    ELSE 0
                END
            RETURNING attempts, window_start, reset_at, last_admitted
            "#,
        )
        .bind(key)
        .bind(now_ms)
        .bind(window_ms)
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::parse_counter(&row))
    }

    async fn get(&self, key: &str) -> DbResult<Option<RateLimitCounter>> {
        let row = sqlx::query(
            r#"
            SELECT attempts, window_start, reset_at, last_admitted
            FROM rate_limit_counters
            WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::parse_counter))
    }

    async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM rate_limit_counters WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now_ms: i64) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM rate_limit_counters WHERE reset_at <= ?")
            .bind(now_ms)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
