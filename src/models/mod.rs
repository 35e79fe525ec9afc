mod account;
mod credential;
mod credential_gen;
mod federation;
mod rate_limit;
mod staff;

pub use account::*;
pub use credential::*;
pub use credential_gen::*;
pub use federation::*;
pub use rate_limit::*;
pub use staff::*;
