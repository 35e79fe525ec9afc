mod accounts;
mod credentials;
mod directory_sync;
mod federation_configs;
mod rate_limiter;

use std::sync::Arc;

pub use accounts::AccountService;
pub use credentials::CredentialService;
pub use directory_sync::DirectorySyncService;
pub use federation_configs::FederationConfigService;
pub use rate_limiter::{DEFAULT_PURGE_SAMPLE_RATE, RateLimiter};

use crate::{config::RateLimitPolicies, db::DbPool, federation::FederationClient};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub credentials: CredentialService,
    pub rate_limiter: RateLimiter,
    pub federation_configs: FederationConfigService,
    pub directory_sync: DirectorySyncService,
}

impl Services {
    pub fn new(
        db: Arc<DbPool>,
        federation: Arc<FederationClient>,
        rate_limits: RateLimitPolicies,
        sync_lock_ttl_secs: u64,
    ) -> Self {
        Self {
            accounts: AccountService::new(db.clone()),
            credentials: CredentialService::new(db.clone()),
            rate_limiter: RateLimiter::new(db.rate_limits(), rate_limits),
            federation_configs: FederationConfigService::new(db.clone()),
            directory_sync: DirectorySyncService::new(db, federation, sync_lock_ttl_secs),
        }
    }
}
