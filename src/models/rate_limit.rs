use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rate-sensitive entry points with their own configured policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAction {
    Login,
    Registration,
    ContactForm,
    CredentialCreation,
}

impl RateLimitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Registration => "registration",
            Self::ContactForm => "contact_form",
            Self::CredentialCreation => "credential_creation",
        }
    }

    /// Counter key for this action and caller subject (IP, account id, ...).
    pub fn key_for(&self, subject: &str) -> String {
        format!("{}:{}", self.as_str(), subject)
    }
}

impl fmt::Display for RateLimitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counter state as left by one atomic check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitCounter {
    pub attempts: i64,
    /// Epoch milliseconds.
    pub window_start: i64,
    /// Epoch milliseconds.
    pub reset_at: i64,
    /// Whether the call that produced this state was admitted.
    pub admitted: bool,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Convert a rejected decision into an error for `?` propagation.
    pub fn into_result(self) -> Result<Self, RateLimitExceeded> {
        if self.allowed {
            Ok(self)
        } else {
            Err(RateLimitExceeded {
                reset_at: self.reset_at,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("Rate limit exceeded, retry after {reset_at}")]
pub struct RateLimitExceeded {
    pub reset_at: DateTime<Utc>,
}

impl RateLimitExceeded {
    /// Seconds until the window resets, never negative.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.reset_at - now).num_seconds().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_action_keys() {
        assert_eq!(RateLimitAction::Login.key_for("10.0.0.1"), "login:10.0.0.1");
        assert_eq!(
            RateLimitAction::CredentialCreation.key_for("acct"),
            "credential_creation:acct"
        );
    }

    #[test]
    fn test_into_result() {
        let reset_at = Utc::now() + Duration::seconds(30);
        let allowed = RateLimitDecision {
            allowed: true,
            remaining: 2,
            reset_at,
        };
        assert!(allowed.into_result().is_ok());

        let denied = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at,
        };
        let err = denied.into_result().unwrap_err();
        assert_eq!(err.reset_at, reset_at);
        assert!((29..=30).contains(&err.retry_after_secs(Utc::now())));
    }

    #[test]
    fn test_retry_after_never_negative() {
        let now = Utc::now();
        let exceeded = RateLimitExceeded {
            reset_at: now - Duration::seconds(5),
        };
        assert_eq!(exceeded.retry_after_secs(now), 0);
    }
}
