//! Shared tests for AccountRepo implementations

use uuid::Uuid;

use crate::{
    db::{error::DbError, repos::AccountRepo},
    models::CreateAccount,
};

fn create_account_input(tenant_id: Uuid, email: &str) -> CreateAccount {
    CreateAccount {
        tenant_id,
        email: email.to_string(),
        display_name: Some("Test Account".to_string()),
    }
}

pub async fn test_create_account(repo: &dyn AccountRepo) {
    let tenant_id = Uuid::new_v4();
    let account = repo
        .create(create_account_input(tenant_id, "ada@example.com"))
        .await
        .expect("Failed to create account");

    assert_eq!(account.tenant_id, tenant_id);
    assert_eq!(account.email, "ada@example.com");
    assert!(account.is_active);

    let fetched = repo
        .get_by_id(account.id)
        .await
        .expect("Failed to get account")
        .expect("Account should exist");
    assert_eq!(fetched.email, "ada@example.com");
    assert_eq!(fetched.display_name.as_deref(), Some("Test Account"));
}

pub async fn test_duplicate_email_same_tenant_conflicts(repo: &dyn AccountRepo) {
    let tenant_id = Uuid::new_v4();
    repo.create(create_account_input(tenant_id, "dup@example.com"))
        .await
        .expect("Failed to create account");

    let result = repo
        .create(create_account_input(tenant_id, "dup@example.com"))
        .await;
    assert!(matches!(result, Err(DbError::Conflict(_))));

    // Same address in another tenant is a different principal
    repo.create(create_account_input(Uuid::new_v4(), "dup@example.com"))
        .await
        .expect("Other tenant should accept the same email");
}

pub async fn test_set_active(repo: &dyn AccountRepo) {
    let account = repo
        .create(create_account_input(Uuid::new_v4(), "toggle@example.com"))
        .await
        .expect("Failed to create account");

    repo.set_active(account.id, false)
        .await
        .expect("Failed to deactivate");
    let fetched = repo.get_by_id(account.id).await.unwrap().unwrap();
    assert!(!fetched.is_active);

    repo.set_active(account.id, true)
        .await
        .expect("Failed to reactivate");
    let fetched = repo.get_by_id(account.id).await.unwrap().unwrap();
    assert!(fetched.is_active);
}

pub async fn test_set_active_not_found(repo: &dyn AccountRepo) {
    let result = repo.set_active(Uuid::new_v4(), false).await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

pub async fn test_get_by_id_not_found(repo: &dyn AccountRepo) {
    let result = repo.get_by_id(Uuid::new_v4()).await.expect("Query failed");
    assert!(result.is_none());
}

// ============================================================================
// SQLite Tests - Fast, in-memory
// ============================================================================

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use super::*;
    use crate::db::{
        sqlite::SqliteAccountRepo,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repo() -> SqliteAccountRepo {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        SqliteAccountRepo::new(pool)
    }

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let repo = create_repo().await;
                super::$name(&repo).await;
            }
        };
    }

    sqlite_test!(test_create_account);
    sqlite_test!(test_duplicate_email_same_tenant_conflicts);
    sqlite_test!(test_set_active);
    sqlite_test!(test_set_active_not_found);
    sqlite_test!(test_get_by_id_not_found);
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-postgres"))]
mod postgres_tests {
    use super::*;
    use crate::db::{
        postgres::PostgresAccountRepo,
        tests::harness::postgres::{create_isolated_postgres_pool, run_postgres_migrations},
    };

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = create_isolated_postgres_pool().await;
                run_postgres_migrations(&pool).await;
                let repo = PostgresAccountRepo::new(pool, None);
                super::$name(&repo).await;
            }
        };
    }

    postgres_test!(test_create_account);
    postgres_test!(test_duplicate_email_same_tenant_conflicts);
    postgres_test!(test_set_active);
    postgres_test!(test_set_active_not_found);
    postgres_test!(test_get_by_id_not_found);
}
