use async_trait::async_trait;
use axum::http::HeaderMap;

use super::{AuthError, Principal};

/// Bridge to the surrounding application's session handling.
///
/// Session cookies, login and CSRF belong to the external auth package; an
/// implementation only has to say who the logged-in user is, if anyone.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// `Ok(None)` when there is no logged-in session.
    async fn resolve_session(&self, headers: &HeaderMap) -> Result<Option<Principal>, AuthError>;
}

/// Resolver for deployments without browser sessions; never finds one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessionResolver;

#[async_trait]
impl SessionResolver for NoSessionResolver {
    async fn resolve_session(&self, _headers: &HeaderMap) -> Result<Option<Principal>, AuthError> {
        Ok(None)
    }
}
