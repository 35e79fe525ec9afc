use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, RequestAuthenticator};

/// Resolve the caller and insert its [`Principal`](crate::auth::Principal)
/// into request extensions, or answer `401`.
pub async fn require_principal(
    State(authenticator): State<RequestAuthenticator>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = authenticator
        .resolve(req.headers())
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    tracing::debug!(
        tenant_id = %principal.tenant_id,
        principal_id = %principal.principal_id,
        integration = principal.is_integration(),
        "Resolved request principal"
    );
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
