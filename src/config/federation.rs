use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;

/// Entra ID / Microsoft Graph settings shared by all tenants.
///
/// Per-tenant ids live in the database. The client secret is read from the
/// environment variable named by `client_secret_env` every time a token is
/// requested, so rotating it needs no restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FederationConfig {
    /// Base URL of the identity provider's login authority.
    #[serde(default = "default_authority_base_url")]
    pub authority_base_url: String,

    /// Base URL of the directory REST API.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,

    /// Name of the environment variable holding the application client secret.
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,

    /// Scopes requested in the interactive authorization-code flow.
    #[serde(default = "default_interactive_scopes")]
    pub interactive_scopes: Vec<String>,

    /// `$top` page size for directory listings.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Upper bound on pages followed during one fetch.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Timeout for each outbound HTTP request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// A sync lease older than this is considered abandoned and may be taken over.
    #[serde(default = "default_sync_lock_ttl_secs")]
    pub sync_lock_ttl_secs: u64,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            authority_base_url: default_authority_base_url(),
            graph_base_url: default_graph_base_url(),
            client_secret_env: default_client_secret_env(),
            interactive_scopes: default_interactive_scopes(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            request_timeout_secs: default_request_timeout_secs(),
            sync_lock_ttl_secs: default_sync_lock_ttl_secs(),
        }
    }
}

impl FederationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("authority_base_url", &self.authority_base_url),
            ("graph_base_url", &self.graph_base_url),
        ] {
            let url = Url::parse(value).map_err(|e| {
                ConfigError::Validation(format!("federation.{name} is not a valid URL: {e}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Validation(format!(
                    "federation.{name} must be an http(s) URL"
                )));
            }
        }
        if self.client_secret_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "federation.client_secret_env cannot be empty".into(),
            ));
        }
        if self.page_size == 0 || self.page_size > 999 {
            return Err(ConfigError::Validation(
                "federation.page_size must be between 1 and 999".into(),
            ));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Validation(
                "federation.max_pages must be at least 1".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "federation.request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_authority_base_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com".to_string()
}

fn default_client_secret_env() -> String {
    "ENTRA_CLIENT_SECRET".to_string()
}

fn default_interactive_scopes() -> Vec<String> {
    vec![
        "openid".to_string(),
        "profile".to_string(),
        "email".to_string(),
        "offline_access".to_string(),
    ]
}

fn default_page_size() -> u32 {
    999
}

fn default_max_pages() -> u32 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_sync_lock_ttl_secs() -> u64 {
    3600
}
