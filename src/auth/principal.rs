use serde::Serialize;
use uuid::Uuid;

use crate::models::CredentialIdentity;

/// How the caller proved its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMethod {
    /// An API credential presented in a request header.
    Credential { credential_id: Uuid },
    /// A browser session owned by the surrounding application.
    Session,
}

/// The authenticated actor making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub tenant_id: Uuid,
    pub principal_id: Uuid,
    pub method: AuthMethod,
}

impl Principal {
    pub fn session(tenant_id: Uuid, principal_id: Uuid) -> Self {
        Self {
            tenant_id,
            principal_id,
            method: AuthMethod::Session,
        }
    }

    /// Whether the caller is an external integration rather than a person
    /// at a browser.
    pub fn is_integration(&self) -> bool {
        matches!(self.method, AuthMethod::Credential { .. })
    }

    pub fn credential_id(&self) -> Option<Uuid> {
        match self.method {
            AuthMethod::Credential { credential_id } => Some(credential_id),
            AuthMethod::Session => None,
        }
    }
}

impl From<CredentialIdentity> for Principal {
    fn from(identity: CredentialIdentity) -> Self {
        Self {
            tenant_id: identity.tenant_id,
            principal_id: identity.principal_id,
            method: AuthMethod::Credential {
                credential_id: identity.credential_id,
            },
        }
    }
}
