use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use uuid::Uuid;

use super::FederationError;
use crate::{
    config::FederationConfig,
    db::FederationConfigRepo,
    models::DirectoryUser,
    secrets::SecretManager,
};

/// Properties requested for each directory user.
const USER_SELECT: &str =
    "id,displayName,givenName,surname,mail,userPrincipalName,employeeId,accountEnabled";

/// Authorization URL and the `state` the callback must echo back.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_id_token", &self.id_token.is_some())
            .field("scope", &self.scope)
            .finish()
    }
}

/// Application (client-credentials) token for the directory API.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct UsersPage {
    #[serde(default)]
    value: Vec<DirectoryUser>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
}

/// Client for the identity provider's OAuth2 endpoints and the directory API.
///
/// Per-tenant directory ids come from [`FederationConfigRepo`]; the client
/// secret is resolved through the [`SecretManager`] on every token request.
pub struct FederationClient {
    config: FederationConfig,
    configs: Arc<dyn FederationConfigRepo>,
    secrets: Arc<dyn SecretManager>,
    http_client: reqwest::Client,
}

impl FederationClient {
    pub fn new(
        config: FederationConfig,
        configs: Arc<dyn FederationConfigRepo>,
        secrets: Arc<dyn SecretManager>,
    ) -> Self {
        Self::with_client(config, configs, secrets, reqwest::Client::new())
    }

    pub fn with_client(
        config: FederationConfig,
        configs: Arc<dyn FederationConfigRepo>,
        secrets: Arc<dyn SecretManager>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            config,
            configs,
            secrets,
            http_client,
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// `(external_tenant_id, external_client_id)` for an enabled tenant, or
    /// `None` when federation is absent or disabled.
    async fn enabled_ids(&self, tenant_id: Uuid) -> Result<Option<(String, String)>, FederationError> {
        let Some(config) = self.configs.get(tenant_id).await? else {
            return Ok(None);
        };
        if !config.enabled {
            return Ok(None);
        }
        match config.ready_ids() {
            Some((tenant, client)) => Ok(Some((tenant.to_string(), client.to_string()))),
            None => Err(FederationError::FederationConfigMissing(format!(
                "tenant {tenant_id} is enabled without directory tenant and client ids"
            ))),
        }
    }

    async fn required_ids(&self, tenant_id: Uuid) -> Result<(String, String), FederationError> {
        self.enabled_ids(tenant_id).await?.ok_or_else(|| {
            FederationError::FederationConfigMissing(format!(
                "federation is not enabled for tenant {tenant_id}"
            ))
        })
    }

    async fn client_secret(&self) -> Result<String, FederationError> {
        Ok(self.secrets.require(&self.config.client_secret_env).await?)
    }

    fn authority_endpoint(&self, external_tenant_id: &str, leaf: &str) -> Result<Url, FederationError> {
        let mut url = Url::parse(&self.config.authority_base_url)
            .map_err(|e| FederationError::Internal(format!("Invalid authority URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FederationError::Internal("Authority URL cannot be a base".into()))?
            .pop_if_empty()
            .push(external_tenant_id)
            .extend(["oauth2", "v2.0", leaf]);
        Ok(url)
    }

    fn graph_url(&self) -> Result<Url, FederationError> {
        Url::parse(&self.config.graph_base_url)
            .map_err(|e| FederationError::Internal(format!("Invalid graph URL: {e}")))
    }

    /// Build the interactive sign-in URL for a tenant.
    ///
    /// Returns `None` when federation is not enabled for the tenant.
    pub async fn build_authorization_url(
        &self,
        tenant_id: Uuid,
        redirect_uri: &str,
    ) -> Result<Option<AuthorizationRequest>, FederationError> {
        let Some((external_tenant_id, client_id)) = self.enabled_ids(tenant_id).await? else {
            return Ok(None);
        };

        let state = Uuid::new_v4().to_string();
        let mut url = self.authority_endpoint(&external_tenant_id, "authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &client_id);
            query.append_pair("response_type", "code");
            query.append_pair("redirect_uri", redirect_uri);
            query.append_pair("response_mode", "query");
            query.append_pair("scope", &self.config.interactive_scopes.join(" "));
            query.append_pair("state", &state);
        }

        Ok(Some(AuthorizationRequest {
            url: url.to_string(),
            state,
        }))
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code_for_token(
        &self,
        tenant_id: Uuid,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, FederationError> {
        let (external_tenant_id, client_id) = self.required_ids(tenant_id).await?;
        let client_secret = self.client_secret().await?;
        let scope = self.config.interactive_scopes.join(" ");

        self.request_token(
            tenant_id,
            &external_tenant_id,
            &[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
            ],
        )
        .await
    }

    /// Obtain an application token for the directory API.
    pub async fn get_application_token(&self, tenant_id: Uuid) -> Result<AccessToken, FederationError> {
        let (external_tenant_id, client_id) = self.required_ids(tenant_id).await?;
        let client_secret = self.client_secret().await?;
        let scope = format!("{}/.default", self.config.graph_base_url.trim_end_matches('/'));

        let tokens = self
            .request_token(
                tenant_id,
                &external_tenant_id,
                &[
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("grant_type", "client_credentials"),
                    ("scope", scope.as_str()),
                ],
            )
            .await?;

        Ok(AccessToken {
            expires_at: tokens
                .expires_in
                .and_then(|secs| i64::try_from(secs).ok())
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
            token: tokens.access_token,
        })
    }

    async fn request_token(
        &self,
        tenant_id: Uuid,
        external_tenant_id: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, FederationError> {
        let endpoint = self.authority_endpoint(external_tenant_id, "token")?;

        let response = self
            .http_client
            .post(endpoint)
            .timeout(self.request_timeout())
            .form(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, tenant_id = %tenant_id, "Token request failed");
                FederationError::TokenExchangeFailure {
                    status: e.status().map(|s| s.as_u16()),
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error_code = serde_json::from_str::<TokenErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| status_reason(status));
            tracing::error!(
                status = %status,
                error_code = %error_code,
                tenant_id = %tenant_id,
                "Token endpoint returned error"
            );
            return Err(FederationError::TokenExchangeFailure {
                status: Some(status.as_u16()),
                message: error_code,
            });
        }

        let tokens: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, tenant_id = %tenant_id, "Failed to parse token response");
            FederationError::TokenExchangeFailure {
                status: Some(status.as_u16()),
                message: format!("Failed to parse token response: {e}"),
            }
        })?;

        if tokens.access_token.trim().is_empty() {
            tracing::error!(tenant_id = %tenant_id, "Token response has no access_token");
            return Err(FederationError::TokenExchangeFailure {
                status: Some(status.as_u16()),
                message: "response contained no access_token".into(),
            });
        }

        Ok(tokens)
    }

    /// Fetch every user in the tenant's directory, following `@odata.nextLink`.
    ///
    /// Any failing page discards everything fetched so far.
    pub async fn fetch_all_directory_users(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<DirectoryUser>, FederationError> {
        let token = self.get_application_token(tenant_id).await?;

        let graph = self.graph_url()?;
        let graph_origin = graph.origin();
        let mut next = graph
            .join("v1.0/users")
            .map_err(|e| FederationError::Internal(format!("Invalid graph URL: {e}")))?;
        next.query_pairs_mut()
            .append_pair("$select", USER_SELECT)
            .append_pair("$top", &self.config.page_size.to_string());

        let mut users = Vec::new();
        let mut pages: u32 = 0;

        loop {
            if pages >= self.config.max_pages {
                tracing::error!(
                    tenant_id = %tenant_id,
                    max_pages = self.config.max_pages,
                    "Directory listing exceeded page limit"
                );
                return Err(FederationError::DirectoryFetchFailure {
                    status: None,
                    message: format!("exceeded {} pages", self.config.max_pages),
                });
            }
            pages += 1;

            let page = self.fetch_users_page(tenant_id, next, &token).await?;
            users.extend(page.value);

            let Some(link) = page.next_link else {
                break;
            };
            let link = Url::parse(&link).map_err(|e| FederationError::DirectoryFetchFailure {
                status: None,
                message: format!("invalid nextLink: {e}"),
            })?;
            if link.origin() != graph_origin {
                tracing::error!(
                    tenant_id = %tenant_id,
                    host = ?link.host_str(),
                    "Directory nextLink points outside the directory API"
                );
                return Err(FederationError::DirectoryFetchFailure {
                    status: None,
                    message: "nextLink points to a different origin".into(),
                });
            }
            next = link;
        }

        tracing::debug!(tenant_id = %tenant_id, pages, users = users.len(), "Fetched directory users");
        Ok(users)
    }

    async fn fetch_users_page(
        &self,
        tenant_id: Uuid,
        url: Url,
        token: &AccessToken,
    ) -> Result<UsersPage, FederationError> {
        let response = self
            .http_client
            .get(url)
            .timeout(self.request_timeout())
            .bearer_auth(&token.token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, tenant_id = %tenant_id, "Directory request failed");
                FederationError::DirectoryFetchFailure {
                    status: e.status().map(|s| s.as_u16()),
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = %status, tenant_id = %tenant_id, "Directory API returned error");
            return Err(FederationError::DirectoryFetchFailure {
                status: Some(status.as_u16()),
                message: status_reason(status),
            });
        }

        response.json().await.map_err(|e| {
            tracing::error!(error = %e, tenant_id = %tenant_id, "Failed to decode directory page");
            FederationError::DirectoryFetchFailure {
                status: Some(status.as_u16()),
                message: format!("Failed to decode directory page: {e}"),
            }
        })
    }
}

fn status_reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}
