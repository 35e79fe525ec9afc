//! Secret lookup for federation client credentials.
//!
//! The client secret is never stored in the config file or the database;
//! the config names an environment variable and the secret manager resolves it.
//! Tests swap in [`MemorySecretManager`].

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SecretResult<T> = Result<T, SecretError>;

#[async_trait]
pub trait SecretManager: Send + Sync {
    /// Get a secret by key. Returns None if not found.
    async fn get(&self, key: &str) -> SecretResult<Option<String>>;

    /// Get a secret that must be present and non-empty.
    async fn require(&self, key: &str) -> SecretResult<String> {
        match self.get(key).await? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(SecretError::NotFound(key.to_string())),
        }
    }
}

/// In-memory secret manager (for testing only)
pub struct MemorySecretManager {
    secrets: dashmap::DashMap<String, String>,
}

impl MemorySecretManager {
    pub fn new() -> Self {
        Self {
            secrets: dashmap::DashMap::new(),
        }
    }

    pub fn with_secret(self, key: &str, value: &str) -> Self {
        self.secrets.insert(key.to_string(), value.to_string());
        self
    }
}

impl Default for MemorySecretManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretManager for MemorySecretManager {
    async fn get(&self, key: &str) -> SecretResult<Option<String>> {
        Ok(self.secrets.get(key).map(|v| v.value().clone()))
    }
}

/// Environment-based secret manager (reads from env vars)
pub struct EnvSecretManager;

impl EnvSecretManager {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnvSecretManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretManager for EnvSecretManager {
    async fn get(&self, key: &str) -> SecretResult<Option<String>> {
        match std::env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e @ std::env::VarError::NotUnicode(_)) => {
                Err(SecretError::Internal(format!("{key}: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_require() {
        let secrets = MemorySecretManager::new()
            .with_secret("PRESENT", "s3cret")
            .with_secret("BLANK", "   ");

        assert_eq!(secrets.require("PRESENT").await.unwrap(), "s3cret");
        assert!(matches!(
            secrets.require("BLANK").await,
            Err(SecretError::NotFound(_))
        ));
        assert!(matches!(
            secrets.require("MISSING").await,
            Err(SecretError::NotFound(key)) if key == "MISSING"
        ));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_manager_reads_process_env() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let manager = EnvSecretManager::new();

        temp_env::with_var("STAFFGATE_TEST_ENV_SECRET", Some("from-env"), || {
            let value = rt.block_on(manager.require("STAFFGATE_TEST_ENV_SECRET"));
            assert_eq!(value.unwrap(), "from-env");
        });

        temp_env::with_var_unset("STAFFGATE_TEST_ENV_SECRET", || {
            let value = rt.block_on(manager.get("STAFFGATE_TEST_ENV_SECRET"));
            assert!(value.unwrap().is_none());
        });
    }
}
