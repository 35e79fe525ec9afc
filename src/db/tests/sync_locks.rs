//! Shared tests for SyncLockRepo implementations

use uuid::Uuid;

use crate::db::repos::SyncLockRepo;

const T0: i64 = 1_700_000_000_000;
const TTL_MS: i64 = 3_600_000;

pub async fn test_acquire_free_lease(repo: &dyn SyncLockRepo) {
    let acquired = repo
        .try_acquire(Uuid::new_v4(), Uuid::new_v4(), T0, T0 - TTL_MS)
        .await
        .expect("Acquire failed");
    assert!(acquired);
}

pub async fn test_live_lease_blocks_others(repo: &dyn SyncLockRepo) {
    let tenant_id = Uuid::new_v4();
    assert!(
        repo.try_acquire(tenant_id, Uuid::new_v4(), T0, T0 - TTL_MS)
            .await
            .unwrap()
    );

    let now = T0 + 1_000;
    let second = repo
        .try_acquire(tenant_id, Uuid::new_v4(), now, now - TTL_MS)
        .await
        .unwrap();
    assert!(!second);
}

pub async fn test_stale_lease_taken_over(repo: &dyn SyncLockRepo) {
    let tenant_id = Uuid::new_v4();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    assert!(repo.try_acquire(tenant_id, first, T0, T0 - TTL_MS).await.unwrap());

    let now = T0 + TTL_MS + 1;
    assert!(repo.try_acquire(tenant_id, second, now, now - TTL_MS).await.unwrap());

    // The old holder's release must not free the new holder's lease
    repo.release(tenant_id, first).await.unwrap();
    let third = repo
        .try_acquire(tenant_id, Uuid::new_v4(), now, now - TTL_MS)
        .await
        .unwrap();
    assert!(!third);
}

pub async fn test_release_frees_lease(repo: &dyn SyncLockRepo) {
    let tenant_id = Uuid::new_v4();
    let holder = Uuid::new_v4();
    assert!(repo.try_acquire(tenant_id, holder, T0, T0 - TTL_MS).await.unwrap());

    repo.release(tenant_id, holder).await.expect("Release failed");

    assert!(
        repo.try_acquire(tenant_id, Uuid::new_v4(), T0, T0 - TTL_MS)
            .await
            .unwrap()
    );
}

pub async fn test_tenants_do_not_contend(repo: &dyn SyncLockRepo) {
    assert!(
        repo.try_acquire(Uuid::new_v4(), Uuid::new_v4(), T0, T0 - TTL_MS)
            .await
            .unwrap()
    );
    assert!(
        repo.try_acquire(Uuid::new_v4(), Uuid::new_v4(), T0, T0 - TTL_MS)
            .await
            .unwrap()
    );
}

// ============================================================================
// SQLite Tests - Fast, in-memory
// ============================================================================

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use super::*;
    use crate::db::{
        sqlite::SqliteSyncLockRepo,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repo() -> SqliteSyncLockRepo {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        SqliteSyncLockRepo::new(pool)
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

    sqlite_test!(test_acquire_free_lease);
    sqlite_test!(test_live_lease_blocks_others);
    sqlite_test!(test_stale_lease_taken_over);
    sqlite_test!(test_release_frees_lease);
    sqlite_test!(test_tenants_do_not_contend);
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-postgres"))]
mod postgres_tests {
    use super::*;
    use crate::db::{
        postgres::PostgresSyncLockRepo,
        tests::harness::postgres::{create_isolated_postgres_pool, run_postgres_migrations},
    };

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = create_isolated_postgres_pool().await;
                run_postgres_migrations(&pool).await;
                let repo = PostgresSyncLockRepo::new(pool, None);
                super::$name(&repo).await;
            }
        };
    }

    postgres_test!(test_acquire_free_lease);
    postgres_test!(test_live_lease_blocks_others);
    postgres_test!(test_stale_lease_taken_over);
    postgres_test!(test_release_frees_lease);
    postgres_test!(test_tenants_do_not_contend);
}
