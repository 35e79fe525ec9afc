//! Microsoft Entra ID federation: OAuth2 flows and directory retrieval.

mod client;
mod error;

pub use client::{AccessToken, AuthorizationRequest, FederationClient, TokenResponse};
pub use error::FederationError;
