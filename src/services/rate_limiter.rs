use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::{
    config::RateLimitPolicies,
    db::{DbResult, RateLimitRepo},
    models::{RateLimitAction, RateLimitCounter, RateLimitDecision},
};

/// Fraction of `check` calls that also purge expired counters.
pub const DEFAULT_PURGE_SAMPLE_RATE: f64 = 0.01;

/// Longest accepted window (one year). Longer windows are clamped.
const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

/// Fixed-window rate limiter over the shared store.
///
/// The counter update is a single atomic statement in the database, so any
/// number of processes can share one limiter. When the store is unavailable
/// the limiter fails open and logs the degradation.
#[derive(Clone)]
pub struct RateLimiter {
    repo: Arc<dyn RateLimitRepo>,
    policies: RateLimitPolicies,
    purge_sample_rate: f64,
}

impl RateLimiter {
    pub fn new(repo: Arc<dyn RateLimitRepo>, policies: RateLimitPolicies) -> Self {
        Self {
            repo,
            policies,
            purge_sample_rate: DEFAULT_PURGE_SAMPLE_RATE,
        }
    }

    pub fn with_purge_sample_rate(mut self, rate: f64) -> Self {
        self.purge_sample_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Record an attempt for `key` and decide whether it is admitted.
    pub async fn check(&self, key: &str, max_attempts: u32, window_secs: u64) -> RateLimitDecision {
        self.check_at(key, max_attempts, window_secs, Utc::now())
            .await
    }

    /// Check using the configured policy for `action`, keyed by `subject`
    /// (caller IP, account id, credential id).
    pub async fn check_action(&self, action: RateLimitAction, subject: &str) -> RateLimitDecision {
        let policy = self.policies.policy(action);
        self.check(
            &action.key_for(subject),
            policy.max_attempts,
            policy.window_secs,
        )
        .await
    }

    pub(crate) async fn check_at(
        &self,
        key: &str,
        max_attempts: u32,
        window_secs: u64,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let window = Duration::seconds(window_secs.clamp(1, MAX_WINDOW_SECS) as i64);

        if max_attempts == 0 {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: now + window,
            };
        }

        let decision = match self
            .repo
            .check_and_increment(
                key,
                i64::from(max_attempts),
                window.num_milliseconds(),
                now.timestamp_millis(),
            )
            .await
        {
            Ok(counter) => decision_from_counter(&counter, max_attempts, now + window),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %key,
                    degraded = true,
                    "Rate limit storage unavailable, allowing request"
                );
                RateLimitDecision {
                    allowed: true,
                    remaining: max_attempts - 1,
                    reset_at: now + window,
                }
            }
        };

        if !decision.allowed {
            tracing::debug!(key = %key, reset_at = %decision.reset_at, "Rate limit exceeded");
        }

        if self.purge_sample_rate > 0.0 && rand::thread_rng().gen_bool(self.purge_sample_rate) {
            match self.repo.purge_expired(now.timestamp_millis()).await {
                Ok(purged) if purged > 0 => {
                    tracing::debug!(purged, "Purged expired rate limit counters");
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "Failed to purge rate limit counters"),
            }
        }

        decision
    }

    /// Forget all attempts for `key`. Failures are logged, never raised.
    pub async fn reset(&self, key: &str) {
        match self.repo.delete(key).await {
            Ok(true) => tracing::debug!(key = %key, "Reset rate limit counter"),
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, key = %key, "Failed to reset rate limit counter"),
        }
    }

    pub async fn reset_action(&self, action: RateLimitAction, subject: &str) {
        self.reset(&action.key_for(subject)).await
    }

    /// Delete every counter whose window has ended.
    pub async fn purge_expired(&self) -> DbResult<u64> {
        self.repo.purge_expired(Utc::now().timestamp_millis()).await
    }
}

fn decision_from_counter(
    counter: &RateLimitCounter,
    max_attempts: u32,
    fallback_reset: DateTime<Utc>,
) -> RateLimitDecision {
    let remaining = (i64::from(max_attempts) - counter.attempts).clamp(0, i64::from(max_attempts));
    RateLimitDecision {
        allowed: counter.admitted,
        remaining: remaining as u32,
        reset_at: DateTime::from_timestamp_millis(counter.reset_at).unwrap_or(fallback_reset),
    }
}
