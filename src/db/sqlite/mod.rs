mod accounts;
pub(crate) mod common;
mod credentials;
mod federation_configs;
mod identity_links;
mod rate_limits;
mod staff;
mod sync_locks;

pub use accounts::SqliteAccountRepo;
pub use credentials::SqliteCredentialRepo;
pub use federation_configs::SqliteFederationConfigRepo;
pub use identity_links::SqliteIdentityLinkRepo;
pub use rate_limits::SqliteRateLimitRepo;
pub use staff::SqliteStaffRepo;
pub use sync_locks::SqliteSyncLockRepo;
