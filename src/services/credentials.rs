use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{DbError, DbPool, DbResult},
    models::{
        ApiCredential, CreateApiCredential, CreatedApiCredential, CredentialIdentity,
        generate_credential_secret, hash_credential_secret, is_plausible_secret,
        verify_credential_secret,
    },
};

/// Service layer for API credentials.
///
/// Every tenant-scoped operation treats a credential from another tenant as
/// absent, so callers cannot probe for ids they do not own.
#[derive(Clone)]
pub struct CredentialService {
    db: Arc<DbPool>,
}

impl CredentialService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Issue a new credential for an active account of the same tenant.
    ///
    /// The raw secret is only available on the returned value.
    pub async fn issue(&self, input: CreateApiCredential) -> DbResult<CreatedApiCredential> {
        input.validate()?;

        match self.db.accounts().get_by_id(input.owner_principal_id).await? {
            Some(owner) if owner.tenant_id == input.tenant_id && owner.is_active => {}
            Some(owner) if owner.tenant_id == input.tenant_id => {
                return Err(DbError::Validation(format!(
                    "Owner account {} is inactive",
                    owner.id
                )));
            }
            _ => {
                return Err(DbError::Validation(format!(
                    "Owner account {} does not exist in tenant {}",
                    input.owner_principal_id, input.tenant_id
                )));
            }
        }

        let (secret, secret_hash) = generate_credential_secret();
        let credential = self.db.credentials().create(input, &secret_hash).await?;

        tracing::info!(
            credential_id = %credential.id,
            tenant_id = %credential.tenant_id,
            owner_principal_id = %credential.owner_principal_id,
            "Issued API credential"
        );

        Ok(CreatedApiCredential { credential, secret })
    }

    /// Resolve a presented secret to the identity it grants.
    ///
    /// Malformed, unknown, inactive and expired secrets, and secrets whose
    /// owner is inactive, all yield `Ok(None)`. Only storage failures are errors.
    pub async fn verify(&self, raw_secret: &str) -> DbResult<Option<CredentialIdentity>> {
        if !is_plausible_secret(raw_secret) {
            return Ok(None);
        }

        let secret_hash = hash_credential_secret(raw_secret);
        let Some(found) = self.db.credentials().get_by_hash(&secret_hash).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        let credential = found.credential;
        if !verify_credential_secret(raw_secret, &credential.secret_hash) {
            tracing::warn!(credential_id = %credential.id, "Stored hash does not match lookup");
            return Ok(None);
        }
        if !credential.is_active {
            tracing::debug!(credential_id = %credential.id, "Rejected inactive credential");
            return Ok(None);
        }
        if !found.owner_is_active {
            tracing::debug!(credential_id = %credential.id, "Rejected credential of inactive owner");
            return Ok(None);
        }
        if credential.is_expired_at(now) {
            tracing::debug!(credential_id = %credential.id, "Rejected expired credential");
            return Ok(None);
        }

        let repo = self.db.credentials();
        let credential_id = credential.id;
        tokio::spawn(async move {
            if let Err(e) = repo.update_last_used(credential_id, now).await {
                tracing::debug!(
                    error = %e,
                    credential_id = %credential_id,
                    "Failed to update credential last_used_at"
                );
            }
        });

        Ok(Some(CredentialIdentity {
            credential_id: credential.id,
            tenant_id: credential.tenant_id,
            principal_id: credential.owner_principal_id,
        }))
    }

    pub async fn get(&self, id: Uuid, tenant_id: Uuid) -> DbResult<Option<ApiCredential>> {
        Ok(self
            .db
            .credentials()
            .get_by_id(id)
            .await?
            .filter(|c| c.tenant_id == tenant_id))
    }

    pub async fn list_by_tenant(&self, tenant_id: Uuid) -> DbResult<Vec<ApiCredential>> {
        self.db.credentials().list_by_tenant(tenant_id).await
    }

    /// Deactivate a credential. It stays listed and can be re-enabled.
    pub async fn revoke(&self, id: Uuid, tenant_id: Uuid) -> DbResult<()> {
        self.set_active(id, tenant_id, false).await
    }

    pub async fn set_active(&self, id: Uuid, tenant_id: Uuid, active: bool) -> DbResult<()> {
        self.db
            .credentials()
            .set_active(id, tenant_id, active)
            .await?;
        tracing::info!(
            credential_id = %id,
            tenant_id = %tenant_id,
            active,
            "Changed API credential state"
        );
        Ok(())
    }

    pub async fn delete(&self, id: Uuid, tenant_id: Uuid) -> DbResult<()> {
        self.db.credentials().delete(id, tenant_id).await?;
        tracing::info!(credential_id = %id, tenant_id = %tenant_id, "Deleted API credential");
        Ok(())
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{db::tests::harness::create_sqlite_db, models::CreateAccount};

    struct Fixture {
        db: Arc<DbPool>,
        service: CredentialService,
        tenant_id: Uuid,
        owner_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let db = create_sqlite_db().await;
        let tenant_id = Uuid::new_v4();
        let owner = db
            .accounts()
            .create(CreateAccount {
                tenant_id,
                email: "integration@example.com".into(),
                display_name: None,
            })
            .await
            .unwrap();
        Fixture {
            service: CredentialService::new(db.clone()),
            db,
            tenant_id,
            owner_id: owner.id,
        }
    }

    fn issue_input(f: &Fixture, name: &str) -> CreateApiCredential {
        CreateApiCredential {
            tenant_id: f.tenant_id,
            owner_principal_id: f.owner_id,
            display_name: name.into(),
            expires_at: None,
        }
    }

    fn flip_last_char(secret: &str) -> String {
        let mut flipped = secret.to_string();
        let last = flipped.pop().unwrap();
        flipped.push(if last == 'a' { 'b' } else { 'a' });
        flipped
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let f = fixture().await;
        let created = f.service.issue(issue_input(&f, "payroll export")).await.unwrap();

        assert_eq!(created.secret.len(), 64);
        assert_ne!(created.credential.secret_hash, created.secret);
        assert!(verify_credential_secret(
            &created.secret,
            &created.credential.secret_hash
        ));

        let identity = f.service.verify(&created.secret).await.unwrap().unwrap();
        assert_eq!(identity.credential_id, created.credential.id);
        assert_eq!(identity.tenant_id, f.tenant_id);
        assert_eq!(identity.principal_id, f.owner_id);
    }

    #[tokio::test]
    async fn test_single_flipped_char_is_rejected() {
        let f = fixture().await;
        let created = f.service.issue(issue_input(&f, "key")).await.unwrap();

        let result = f.service.verify(&flip_last_char(&created.secret)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_malformed_secrets_are_none_not_errors() {
        let f = fixture().await;
        let oversized = "f".repeat(600);
        for token in ["", "two words", oversized.as_str()] {
            assert!(f.service.verify(token).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_revoked_credential_is_rejected() {
        let f = fixture().await;
        let mut input = issue_input(&f, "key");
        input.expires_at = Some(Utc::now() + Duration::days(30));
        let created = f.service.issue(input).await.unwrap();

        f.service
            .revoke(created.credential.id, f.tenant_id)
            .await
            .unwrap();

        assert!(f.service.verify(&created.secret).await.unwrap().is_none());

        // Toggling back restores it
        f.service
            .set_active(created.credential.id, f.tenant_id, true)
            .await
            .unwrap();
        assert!(f.service.verify(&created.secret).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_credential_is_rejected() {
        let f = fixture().await;
        let mut input = issue_input(&f, "key");
        input.expires_at = Some(Utc::now() - Duration::minutes(1));
        let created = f.service.issue(input).await.unwrap();

        assert!(f.service.verify(&created.secret).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inactive_owner_invalidates_credential() {
        let f = fixture().await;
        let created = f.service.issue(issue_input(&f, "key")).await.unwrap();

        f.db.accounts().set_active(f.owner_id, false).await.unwrap();

        assert!(f.service.verify(&created.secret).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_issue_requires_owner_in_same_tenant() {
        let f = fixture().await;
        let mut input = issue_input(&f, "key");
        input.tenant_id = Uuid::new_v4();

        let result = f.service.issue(input).await;
        assert!(matches!(result, Err(DbError::Validation(_))));
        assert!(f.service.list_by_tenant(f.tenant_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_issue_rejects_empty_name() {
        let f = fixture().await;
        let result = f.service.issue(issue_input(&f, "")).await;
        assert!(matches!(result, Err(DbError::Validation(_))));
    }

    #[tokio::test]
    async fn test_cross_tenant_access_is_not_found() {
        let f = fixture().await;
        let created = f.service.issue(issue_input(&f, "key")).await.unwrap();
        let other_tenant = Uuid::new_v4();

        assert!(
            f.service
                .get(created.credential.id, other_tenant)
                .await
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            f.service.revoke(created.credential.id, other_tenant).await,
            Err(DbError::NotFound)
        ));
        assert!(matches!(
            f.service.delete(created.credential.id, other_tenant).await,
            Err(DbError::NotFound)
        ));

        // Still usable
        assert!(f.service.verify(&created.secret).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_credential() {
        let f = fixture().await;
        let created = f.service.issue(issue_input(&f, "key")).await.unwrap();

        f.service
            .delete(created.credential.id, f.tenant_id)
            .await
            .unwrap();

        assert!(f.service.verify(&created.secret).await.unwrap().is_none());
        assert!(f.service.list_by_tenant(f.tenant_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_records_last_used() {
        let f = fixture().await;
        let created = f.service.issue(issue_input(&f, "key")).await.unwrap();
        assert!(created.credential.last_used_at.is_none());

        f.service.verify(&created.secret).await.unwrap().unwrap();

        // The update is fire-and-forget; give it a moment to land
        let mut last_used = None;
        for _ in 0..50 {
            last_used = f
                .service
                .get(created.credential.id, f.tenant_id)
                .await
                .unwrap()
                .and_then(|c| c.last_used_at);
            if last_used.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(last_used.is_some());
    }
}
