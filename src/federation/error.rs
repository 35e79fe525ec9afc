use uuid::Uuid;

use crate::{db::DbError, secrets::SecretError};

#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    /// Federation is disabled or incomplete for the tenant, or the client
    /// secret is not available.
    #[error("Federation is not configured: {0}")]
    FederationConfigMissing(String),

    #[error("Token exchange failed{}: {message}", status_suffix(.status))]
    TokenExchangeFailure {
        status: Option<u16>,
        message: String,
    },

    #[error("Directory fetch failed{}: {message}", status_suffix(.status))]
    DirectoryFetchFailure {
        status: Option<u16>,
        message: String,
    },

    #[error("A directory sync is already running for tenant {0}")]
    SyncInProgress(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FederationError {
    /// Upstream HTTP status, when the failure came from an HTTP response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::TokenExchangeFailure { status, .. } | Self::DirectoryFetchFailure { status, .. } => {
                *status
            }
            _ => None,
        }
    }
}

impl From<SecretError> for FederationError {
    fn from(e: SecretError) -> Self {
        match e {
            SecretError::NotFound(key) => Self::FederationConfigMissing(format!(
                "client secret environment variable {key} is not set"
            )),
            SecretError::Internal(msg) => Self::Internal(msg),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_status() {
        let e = FederationError::DirectoryFetchFailure {
            status: Some(503),
            message: "service unavailable".into(),
        };
        assert_eq!(
            e.to_string(),
            "Directory fetch failed (HTTP 503): service unavailable"
        );
        assert_eq!(e.upstream_status(), Some(503));

        let e = FederationError::TokenExchangeFailure {
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(e.to_string(), "Token exchange failed: connection refused");
        assert_eq!(e.upstream_status(), None);
    }

    #[test]
    fn test_missing_secret_is_config_missing() {
        let e: FederationError = SecretError::NotFound("ENTRA_CLIENT_SECRET".into()).into();
        assert!(matches!(e, FederationError::FederationConfigMissing(msg) if msg.contains("ENTRA_CLIENT_SECRET")));
    }
}
