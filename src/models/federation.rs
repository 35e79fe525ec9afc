use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Per-tenant Entra ID settings. The client secret is never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantFederationConfig {
    pub tenant_id: Uuid,
    pub enabled: bool,
    pub external_tenant_id: Option<String>,
    pub external_client_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TenantFederationConfig {
    /// The external ids, when federation is enabled and both are present.
    pub fn ready_ids(&self) -> Option<(&str, &str)> {
        if !self.enabled {
            return None;
        }
        match (
            self.external_tenant_id.as_deref().filter(|s| !s.is_empty()),
            self.external_client_id.as_deref().filter(|s| !s.is_empty()),
        ) {
            (Some(tenant), Some(client)) => Some((tenant, client)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EnableFederation {
    #[validate(length(min = 1, max = 255))]
    pub external_tenant_id: String,
    #[validate(length(min = 1, max = 255))]
    pub external_client_id: String,
}

/// A user record as returned by the Graph `/v1.0/users` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub account_enabled: Option<bool>,
}

impl DirectoryUser {
    /// Explicitly disabled upstream. A missing flag counts as enabled.
    pub fn is_disabled(&self) -> bool {
        self.account_enabled == Some(false)
    }

    /// Normalized email: `mail`, else a UPN that is an address and not a
    /// guest (`#EXT#`) principal name.
    pub fn usable_email(&self) -> Option<String> {
        let mail = self
            .mail
            .as_deref()
            .map(str::trim)
            .filter(|m| m.contains('@'));
        let upn = self
            .user_principal_name
            .as_deref()
            .map(str::trim)
            .filter(|u| u.contains('@') && !u.to_ascii_uppercase().contains("#EXT#"));

        mail.or(upn).map(str::to_lowercase)
    }

    /// `(first, last)`, from the explicit name fields or else the display
    /// name split on its first space.
    pub fn names(&self) -> (String, String) {
        let given = trimmed(&self.given_name);
        let surname = trimmed(&self.surname);
        if !given.is_empty() || !surname.is_empty() {
            return (given.to_string(), surname.to_string());
        }

        let display = trimmed(&self.display_name);
        match display.split_once(' ') {
            Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
            None => (display.to_string(), String::new()),
        }
    }

    pub fn reference_code(&self) -> Option<&str> {
        self.employee_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Active,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link between a local staff record and a directory user.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalIdentityLink {
    pub tenant_id: Uuid,
    pub external_user_id: String,
    pub local_person_id: Uuid,
    pub last_synced_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub sync_error: Option<String>,
}

/// Summary of one directory sync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub warnings: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub fn total(&self) -> u32 {
        self.created + self.updated + self.skipped
    }

    pub(crate) fn skip_with_warning(&mut self, warning: String) {
        self.skipped += 1;
        self.warnings.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> DirectoryUser {
        DirectoryUser {
            id: "u1".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_usable_email_prefers_mail() {
        let u = DirectoryUser {
            mail: Some(" Ada@Example.COM ".into()),
            user_principal_name: Some("ada@contoso.onmicrosoft.com".into()),
            ..user()
        };
        assert_eq!(u.usable_email().as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_usable_email_falls_back_to_upn() {
        let u = DirectoryUser {
            user_principal_name: Some("Grace@Example.com".into()),
            ..user()
        };
        assert_eq!(u.usable_email().as_deref(), Some("grace@example.com"));
    }

    #[test]
    fn test_usable_email_rejects_guest_upn() {
        let u = DirectoryUser {
            user_principal_name: Some("bob_gmail.com#EXT#@contoso.onmicrosoft.com".into()),
            ..user()
        };
        assert_eq!(u.usable_email(), None);
    }

    #[test]
    fn test_usable_email_none_without_address() {
        let u = DirectoryUser {
            mail: Some("   ".into()),
            user_principal_name: Some("not-an-address".into()),
            ..user()
        };
        assert_eq!(u.usable_email(), None);
    }

    #[test]
    fn test_names_from_explicit_fields() {
        let u = DirectoryUser {
            given_name: Some("Ada".into()),
            surname: Some("Lovelace".into()),
            display_name: Some("Countess Ada".into()),
            ..user()
        };
        assert_eq!(u.names(), ("Ada".into(), "Lovelace".into()));
    }

    #[test]
    fn test_names_split_display_name_on_first_space() {
        let u = DirectoryUser {
            display_name: Some("Mary Ann Evans".into()),
            ..user()
        };
        assert_eq!(u.names(), ("Mary".into(), "Ann Evans".into()));

        let single = DirectoryUser {
            display_name: Some("Cher".into()),
            ..user()
        };
        assert_eq!(single.names(), ("Cher".into(), String::new()));
    }

    #[test]
    fn test_disabled_only_when_explicit() {
        assert!(!user().is_disabled());
        let u = DirectoryUser {
            account_enabled: Some(false),
            ..user()
        };
        assert!(u.is_disabled());
    }

    #[test]
    fn test_ready_ids_requires_enabled_and_both_ids() {
        let mut cfg = TenantFederationConfig {
            tenant_id: Uuid::new_v4(),
            enabled: true,
            external_tenant_id: Some("tid".into()),
            external_client_id: Some(String::new()),
            updated_at: Utc::now(),
        };
        assert!(cfg.ready_ids().is_none());

        cfg.external_client_id = Some("cid".into());
        assert_eq!(cfg.ready_ids(), Some(("tid", "cid")));

        cfg.enabled = false;
        assert!(cfg.ready_ids().is_none());
    }

    #[test]
    fn test_deserialize_graph_user() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "displayName": "Ada Lovelace",
            "givenName": "Ada",
            "surname": "Lovelace",
            "mail": "ada@example.com",
            "userPrincipalName": "ada@example.com",
            "employeeId": "E-17",
            "accountEnabled": true
        }"#;
        let u: DirectoryUser = serde_json::from_str(json).unwrap();
        assert_eq!(u.reference_code(), Some("E-17"));
        assert_eq!(u.account_enabled, Some(true));
    }
}
