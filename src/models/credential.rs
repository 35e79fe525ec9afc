use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A long-lived bearer credential ("API key") scoped to one tenant and one owner.
///
/// Only the SHA-256 hash of the secret is ever stored. The raw secret is
/// returned once, from [`crate::services::CredentialService::issue`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCredential {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_principal_id: Uuid,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub secret_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiCredential {
    /// Whether the credential has passed its expiry time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

/// A credential joined with the activation state of its owning account.
/// Returned by hash lookups so verification needs a single query.
#[derive(Debug, Clone)]
pub struct ApiCredentialWithOwner {
    pub credential: ApiCredential,
    pub owner_is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateApiCredential {
    pub tenant_id: Uuid,
    pub owner_principal_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of issuing a credential: the stored record plus the raw secret.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedApiCredential {
    #[serde(flatten)]
    pub credential: ApiCredential,
    /// The raw secret. Shown once, never persisted.
    pub secret: String,
}

/// Identity established by a successfully verified credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CredentialIdentity {
    pub credential_id: Uuid,
    pub tenant_id: Uuid,
    pub principal_id: Uuid,
}
