mod health;
mod me;

use axum::{Router, routing::get};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{AppState, middleware::require_principal};

/// Build the HTTP router: public health probe plus the authenticated API.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/me", get(me::me))
        .route_layer(axum::middleware::from_fn_with_state(
            state.authenticator.clone(),
            require_principal,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(
            state.config.server.body_limit_bytes,
        ))
        .with_state(state)
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{
        auth::NoSessionResolver,
        config::StaffgateConfig,
        db::tests::harness::create_sqlite_db,
        models::{CreateAccount, CreateApiCredential},
        secrets::MemorySecretManager,
    };

    async fn test_state() -> AppState {
        let db = create_sqlite_db().await;
        AppState::new(
            StaffgateConfig::default(),
            db,
            Arc::new(MemorySecretManager::new()),
            Arc::new(NoSessionResolver),
        )
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state().await);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_me_requires_identity() {
        let app = build_router(test_state().await);
        let response = app
            .oneshot(Request::builder().uri("/api/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"]["code"], "unauthenticated");
    }

    #[tokio::test]
    async fn test_me_with_credential() {
        let state = test_state().await;
        let tenant_id = Uuid::new_v4();
        let owner = state
            .services
            .accounts
            .create(CreateAccount {
                tenant_id,
                email: "sync-bot@example.com".into(),
                display_name: None,
            })
            .await
            .unwrap();
        let created = state
            .services
            .credentials
            .issue(CreateApiCredential {
                tenant_id,
                owner_principal_id: owner.id,
                display_name: "sync bot".into(),
                expires_at: None,
            })
            .await
            .unwrap();

        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/me")
                    .header("Authorization", format!("ApiKey {}", created.secret))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["tenant_id"], tenant_id.to_string());
        assert_eq!(body["principal_id"], owner.id.to_string());
        assert_eq!(body["integration"], true);
        assert_eq!(body["method"]["type"], "credential");
        assert_eq!(
            body["method"]["credential_id"],
            created.credential.id.to_string()
        );
    }
}
