use async_trait::async_trait;

use crate::{db::error::DbResult, models::RateLimitCounter};

/// Storage for fixed-window counters. All times are epoch milliseconds and
/// are passed in by the caller.
#[async_trait]
pub trait RateLimitRepo: Send + Sync {
    /// Atomically create, restart, increment or leave the counter for `key`
    /// and report the resulting state.
    ///
    /// - no counter, or `reset_at <= now_ms`: `attempts = 1`, new window, admitted
    /// - `attempts < max_attempts`: `attempts + 1`, admitted
    /// - otherwise: unchanged, not admitted
    ///
    /// Implementations must do this in a single statement so concurrent
    /// callers on one key cannot overshoot `max_attempts`.
    async fn check_and_increment(
        &self,
        key: &str,
        max_attempts: i64,
        window_ms: i64,
        now_ms: i64,
    ) -> DbResult<RateLimitCounter>;

    async fn get(&self, key: &str) -> DbResult<Option<RateLimitCounter>>;

    /// Returns whether a counter was removed.
    async fn delete(&self, key: &str) -> DbResult<bool>;

    /// Delete counters whose window ended at or before `now_ms`.
    async fn purge_expired(&self, now_ms: i64) -> DbResult<u64>;
}
