//! Shared tests for FederationConfigRepo implementations

use chrono::Utc;
use uuid::Uuid;

use crate::{db::repos::FederationConfigRepo, models::TenantFederationConfig};

fn config(tenant_id: Uuid, enabled: bool) -> TenantFederationConfig {
    TenantFederationConfig {
        tenant_id,
        enabled,
        external_tenant_id: Some("contoso-tenant".to_string()),
        external_client_id: Some("app-client".to_string()),
        updated_at: Utc::now(),
    }
}

pub async fn test_get_missing(repo: &dyn FederationConfigRepo) {
    assert!(repo.get(Uuid::new_v4()).await.unwrap().is_none());
}

pub async fn test_upsert_inserts(repo: &dyn FederationConfigRepo) {
    let tenant_id = Uuid::new_v4();
    repo.upsert(&config(tenant_id, true))
        .await
        .expect("Failed to upsert");

    let stored = repo.get(tenant_id).await.unwrap().expect("Config stored");
    assert!(stored.enabled);
    assert_eq!(stored.external_tenant_id.as_deref(), Some("contoso-tenant"));
    assert_eq!(stored.external_client_id.as_deref(), Some("app-client"));
    assert_eq!(stored.ready_ids(), Some(("contoso-tenant", "app-client")));
}

pub async fn test_upsert_overwrites(repo: &dyn FederationConfigRepo) {
    let tenant_id = Uuid::new_v4();
    repo.upsert(&config(tenant_id, true)).await.unwrap();

    let mut updated = config(tenant_id, false);
    updated.external_client_id = Some("rotated-client".to_string());
    repo.upsert(&updated).await.unwrap();

    let stored = repo.get(tenant_id).await.unwrap().unwrap();
    assert!(!stored.enabled);
    assert_eq!(stored.external_client_id.as_deref(), Some("rotated-client"));
    assert!(stored.ready_ids().is_none());
}

pub async fn test_tenants_are_isolated(repo: &dyn FederationConfigRepo) {
    let enabled = Uuid::new_v4();
    let disabled = Uuid::new_v4();
    repo.upsert(&config(enabled, true)).await.unwrap();
    repo.upsert(&config(disabled, false)).await.unwrap();

    assert!(repo.get(enabled).await.unwrap().unwrap().enabled);
    assert!(!repo.get(disabled).await.unwrap().unwrap().enabled);
}

// ============================================================================
// SQLite Tests - Fast, in-memory
// ============================================================================

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use super::*;
    use crate::db::{
        sqlite::SqliteFederationConfigRepo,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repo() -> SqliteFederationConfigRepo {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        SqliteFederationConfigRepo::new(pool)
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

    sqlite_test!(test_get_missing);
    sqlite_test!(test_upsert_inserts);
    sqlite_test!(test_upsert_overwrites);
    sqlite_test!(test_tenants_are_isolated);
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-postgres"))]
mod postgres_tests {
    use super::*;
    use crate::db::{
        postgres::PostgresFederationConfigRepo,
        tests::harness::postgres::{create_isolated_postgres_pool, run_postgres_migrations},
    };

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = create_isolated_postgres_pool().await;
                run_postgres_migrations(&pool).await;
                let repo = PostgresFederationConfigRepo::new(pool, None);
                super::$name(&repo).await;
            }
        };
    }

    postgres_test!(test_get_missing);
    postgres_test!(test_upsert_inserts);
    postgres_test!(test_upsert_overwrites);
    postgres_test!(test_tenants_are_isolated);
}
