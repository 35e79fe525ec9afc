use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::RateLimitAction;

/// Limits configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Fixed-window policies for rate-sensitive entry points.
    #[serde(default)]
    pub rate_limits: RateLimitPolicies,
}

/// One fixed-window policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitPolicy {
    /// Attempts admitted per window.
    pub max_attempts: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub const fn new(max_attempts: u32, window_secs: u64) -> Self {
        Self {
            max_attempts,
            window_secs,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(format!(
                "limits.rate_limits.{name}.max_attempts must be at least 1"
            )));
        }
        if self.window_secs == 0 {
            return Err(ConfigError::Validation(format!(
                "limits.rate_limits.{name}.window_secs must be at least 1"
            )));
        }
        Ok(())
    }
}

/// Per-action policies. Omitted actions use their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitPolicies {
    #[serde(default = "default_login")]
    pub login: RateLimitPolicy,

    #[serde(default = "default_registration")]
    pub registration: RateLimitPolicy,

    #[serde(default = "default_contact_form")]
    pub contact_form: RateLimitPolicy,

    #[serde(default = "default_credential_creation")]
    pub credential_creation: RateLimitPolicy,
}

impl RateLimitPolicies {
    pub fn policy(&self, action: RateLimitAction) -> RateLimitPolicy {
        match action {
            RateLimitAction::Login => self.login,
            RateLimitAction::Registration => self.registration,
            RateLimitAction::ContactForm => self.contact_form,
            RateLimitAction::CredentialCreation => self.credential_creation,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.login.validate("login")?;
        self.registration.validate("registration")?;
        self.contact_form.validate("contact_form")?;
        self.credential_creation.validate("credential_creation")
    }
}

impl Default for RateLimitPolicies {
    fn default() -> Self {
        Self {
            login: default_login(),
            registration: default_registration(),
            contact_form: default_contact_form(),
            credential_creation: default_credential_creation(),
        }
    }
}

fn default_login() -> RateLimitPolicy {
    RateLimitPolicy::new(5, 900)
}

fn default_registration() -> RateLimitPolicy {
    RateLimitPolicy::new(3, 3600)
}

fn default_contact_form() -> RateLimitPolicy {
    RateLimitPolicy::new(5, 3600)
}

fn default_credential_creation() -> RateLimitPolicy {
    RateLimitPolicy::new(10, 3600)
}
