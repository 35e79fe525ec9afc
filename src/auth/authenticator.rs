use std::sync::Arc;

use axum::http::{HeaderMap, header::AUTHORIZATION};

use super::{AuthError, Principal, SessionResolver};
use crate::services::CredentialService;

/// Header for callers that cannot set `Authorization`.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Find a presented credential secret.
///
/// Checked in order: `Authorization: Bearer <t>`, `Authorization: ApiKey <t>`,
/// then `X-API-Key: <t>`. Schemes match case-insensitively. Empty tokens and
/// non-UTF-8 header values are ignored.
pub fn extract_credential(headers: &HeaderMap) -> Option<&str> {
    authorization_token(headers, "bearer")
        .or_else(|| authorization_token(headers, "apikey"))
        .or_else(|| {
            headers
                .get_all(API_KEY_HEADER)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::trim)
                .find(|t| !t.is_empty())
        })
}

fn authorization_token<'a>(headers: &'a HeaderMap, scheme: &str) -> Option<&'a str> {
    headers
        .get_all(AUTHORIZATION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.trim_start().split_once(' '))
        .filter(|(s, _)| s.eq_ignore_ascii_case(scheme))
        .map(|(_, token)| token.trim())
        .find(|t| !t.is_empty())
}

/// Resolves the calling principal for API handlers.
#[derive(Clone)]
pub struct RequestAuthenticator {
    credentials: CredentialService,
    sessions: Arc<dyn SessionResolver>,
}

impl RequestAuthenticator {
    pub fn new(credentials: CredentialService, sessions: Arc<dyn SessionResolver>) -> Self {
        Self {
            credentials,
            sessions,
        }
    }

    /// Credential first, session second.
    ///
    /// `Ok(None)` means no identity could be established; only storage or
    /// session backend failures are errors.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<Option<Principal>, AuthError> {
        if let Some(secret) = extract_credential(headers) {
            match self.credentials.verify(secret).await {
                Ok(Some(identity)) => return Ok(Some(identity.into())),
                Ok(None) => tracing::debug!("Presented credential was not accepted"),
                Err(e) => {
                    tracing::error!(error = %e, "Credential lookup failed");
                    return Err(e.into());
                }
            }
        }

        self.sessions.resolve_session(headers).await
    }
}
