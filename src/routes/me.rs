use axum::{Extension, Json};
use serde::Serialize;

use crate::auth::{AuthMethod, Principal};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub tenant_id: uuid::Uuid,
    pub principal_id: uuid::Uuid,
    pub method: AuthMethod,
    pub integration: bool,
}

/// The identity the request was authenticated as.
pub async fn me(Extension(principal): Extension<Principal>) -> Json<MeResponse> {
    Json(MeResponse {
        tenant_id: principal.tenant_id,
        principal_id: principal.principal_id,
        method: principal.method,
        integration: principal.is_integration(),
    })
}
