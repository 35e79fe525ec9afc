//! Request identity resolution.
//!
//! A caller is identified by an API credential when one is presented, and
//! otherwise by the surrounding application's session. Handlers only ever
//! see the resulting [`Principal`].

mod authenticator;
mod error;
mod principal;
mod session;

pub use authenticator::{RequestAuthenticator, extract_credential};
pub use error::AuthError;
pub use principal::{AuthMethod, Principal};
pub use session::{NoSessionResolver, SessionResolver};
