mod accounts;
mod credentials;
mod federation_configs;
mod identity_links;
mod rate_limits;
mod staff;
mod sync_locks;

pub use accounts::*;
pub use credentials::*;
pub use federation_configs::*;
pub use identity_links::*;
pub use rate_limits::*;
pub use staff::*;
pub use sync_locks::*;
