//! Trust boundary for a multi-tenant staff-records manager.
//!
//! Resolves who is calling (API credentials, then session), throttles
//! rate-sensitive entry points, and keeps local staff records in step with an
//! Entra ID directory.

pub mod auth;
pub mod config;
pub mod db;
pub mod federation;
pub mod middleware;
pub mod models;
#[cfg(feature = "server")]
pub mod observability;
pub mod routes;
pub mod secrets;
pub mod services;

use std::sync::Arc;

use auth::{RequestAuthenticator, SessionResolver};
use config::StaffgateConfig;
use db::DbPool;
use federation::FederationClient;
use secrets::SecretManager;
use services::Services;

/// Shared state handed to every HTTP handler and CLI command.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StaffgateConfig>,
    pub db: Arc<DbPool>,
    pub services: Services,
    pub authenticator: RequestAuthenticator,
}

impl AppState {
    pub fn new(
        config: StaffgateConfig,
        db: Arc<DbPool>,
        secrets: Arc<dyn SecretManager>,
        sessions: Arc<dyn SessionResolver>,
    ) -> Self {
        let federation = FederationClient::new(
            config.federation.clone(),
            db.federation_configs(),
            secrets,
        );
        let services = Services::new(
            db.clone(),
            Arc::new(federation),
            config.limits.rate_limits.clone(),
            config.federation.sync_lock_ttl_secs,
        );
        let authenticator = RequestAuthenticator::new(services.credentials.clone(), sessions);

        Self {
            config: Arc::new(config),
            db,
            services,
            authenticator,
        }
    }
}
