use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{DbPool, DbResult},
    models::{Account, CreateAccount},
};

/// Owning principals for credentials. Full account management lives in the
/// external auth package; this covers what credential checks need.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DbPool>,
}

impl AccountService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn create(&self, mut input: CreateAccount) -> DbResult<Account> {
        input.email = input.email.trim().to_lowercase();
        input.validate()?;
        self.db.accounts().create(input).await
    }

    pub async fn get(&self, id: Uuid) -> DbResult<Option<Account>> {
        self.db.accounts().get_by_id(id).await
    }

    /// Deactivating an account makes every credential it owns unusable.
    pub async fn set_active(&self, id: Uuid, active: bool) -> DbResult<()> {
        self.db.accounts().set_active(id, active).await
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use super::*;
    use crate::db::{DbError, tests::harness::create_sqlite_db};

    #[tokio::test]
    async fn test_create_normalizes_email() {
        let service = AccountService::new(create_sqlite_db().await);
        let account = service
            .create(CreateAccount {
                tenant_id: Uuid::new_v4(),
                email: "  Grace@Example.ORG ".into(),
                display_name: Some("Grace".into()),
            })
            .await
            .unwrap();

        assert_eq!(account.email, "grace@example.org");
        assert!(account.is_active);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_email() {
        let service = AccountService::new(create_sqlite_db().await);
        let result = service
            .create(CreateAccount {
                tenant_id: Uuid::new_v4(),
                email: "not-an-email".into(),
                display_name: None,
            })
            .await;

        assert!(matches!(result, Err(DbError::Validation(_))));
    }

    #[tokio::test]
    async fn test_set_active_missing_account() {
        let service = AccountService::new(create_sqlite_db().await);
        let result = service.set_active(Uuid::new_v4(), false).await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }
}
