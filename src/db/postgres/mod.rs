mod accounts;
mod credentials;
mod federation_configs;
mod identity_links;
mod rate_limits;
mod staff;
mod sync_locks;

pub use accounts::PostgresAccountRepo;
pub use credentials::PostgresCredentialRepo;
pub use federation_configs::PostgresFederationConfigRepo;
pub use identity_links::PostgresIdentityLinkRepo;
pub use rate_limits::PostgresRateLimitRepo;
pub use staff::PostgresStaffRepo;
pub use sync_locks::PostgresSyncLockRepo;
