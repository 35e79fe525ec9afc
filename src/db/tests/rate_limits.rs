//! Shared tests for RateLimitRepo implementations
//!
//! Times are passed in explicitly, so window arithmetic is tested without
//! sleeping.

use crate::db::repos::RateLimitRepo;

const WINDOW_MS: i64 = 60_000;
const T0: i64 = 1_700_000_000_000;

pub async fn test_first_check_opens_window(repo: &dyn RateLimitRepo) {
    let counter = repo
        .check_and_increment("login:10.0.0.1", 5, WINDOW_MS, T0)
        .await
        .expect("Check failed");

    assert_eq!(counter.attempts, 1);
    assert_eq!(counter.window_start, T0);
    assert_eq!(counter.reset_at, T0 + WINDOW_MS);
    assert!(counter.admitted);
}

pub async fn test_increments_until_max_then_holds(repo: &dyn RateLimitRepo) {
    for expected in 1..=3 {
        let counter = repo
            .check_and_increment("k", 3, WINDOW_MS, T0 + expected)
            .await
            .unwrap();
        assert_eq!(counter.attempts, expected);
        assert!(counter.admitted);
        assert_eq!(counter.reset_at, T0 + 1 + WINDOW_MS);
    }

    for _ in 0..2 {
        let counter = repo
            .check_and_increment("k", 3, WINDOW_MS, T0 + 10)
            .await
            .unwrap();
        assert_eq!(counter.attempts, 3, "Rejected checks must not increment");
        assert!(!counter.admitted);
        assert_eq!(counter.reset_at, T0 + 1 + WINDOW_MS);
    }
}

pub async fn test_expired_window_restarts(repo: &dyn RateLimitRepo) {
    for _ in 0..2 {
        repo.check_and_increment("k", 2, WINDOW_MS, T0).await.unwrap();
    }
    let rejected = repo.check_and_increment("k", 2, WINDOW_MS, T0).await.unwrap();
    assert!(!rejected.admitted);

    // reset_at itself counts as expired
    let later = T0 + WINDOW_MS;
    let counter = repo
        .check_and_increment("k", 2, WINDOW_MS, later)
        .await
        .unwrap();
    assert_eq!(counter.attempts, 1);
    assert_eq!(counter.window_start, later);
    assert_eq!(counter.reset_at, later + WINDOW_MS);
    assert!(counter.admitted);
}

pub async fn test_keys_are_independent(repo: &dyn RateLimitRepo) {
    repo.check_and_increment("a", 1, WINDOW_MS, T0).await.unwrap();
    let a = repo.check_and_increment("a", 1, WINDOW_MS, T0).await.unwrap();
    let b = repo.check_and_increment("b", 1, WINDOW_MS, T0).await.unwrap();

    assert!(!a.admitted);
    assert!(b.admitted);
    assert_eq!(b.attempts, 1);
}

pub async fn test_get_and_delete(repo: &dyn RateLimitRepo) {
    assert!(repo.get("k").await.unwrap().is_none());
    assert!(!repo.delete("k").await.unwrap());

    repo.check_and_increment("k", 5, WINDOW_MS, T0).await.unwrap();
    let stored = repo.get("k").await.unwrap().expect("Counter should exist");
    assert_eq!(stored.attempts, 1);

    assert!(repo.delete("k").await.unwrap());
    assert!(repo.get("k").await.unwrap().is_none());
}

pub async fn test_purge_expired(repo: &dyn RateLimitRepo) {
    repo.check_and_increment("old", 5, WINDOW_MS, T0).await.unwrap();
    repo.check_and_increment("new", 5, WINDOW_MS, T0 + WINDOW_MS)
        .await
        .unwrap();

    let purged = repo.purge_expired(T0 + WINDOW_MS).await.unwrap();
    assert_eq!(purged, 1);
    assert!(repo.get("old").await.unwrap().is_none());
    assert!(repo.get("new").await.unwrap().is_some());
}

// ============================================================================
// SQLite Tests - Fast, in-memory
// ============================================================================

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use super::*;
    use crate::db::{
        sqlite::SqliteRateLimitRepo,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repo() -> SqliteRateLimitRepo {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        SqliteRateLimitRepo::new(pool)
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

    sqlite_test!(test_first_check_opens_window);
    sqlite_test!(test_increments_until_max_then_holds);
    sqlite_test!(test_expired_window_restarts);
    sqlite_test!(test_keys_are_independent);
    sqlite_test!(test_get_and_delete);
    sqlite_test!(test_purge_expired);
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-postgres"))]
mod postgres_tests {
    use super::*;
    use crate::db::{
        postgres::PostgresRateLimitRepo,
        tests::harness::postgres::{create_isolated_postgres_pool, run_postgres_migrations},
    };

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = create_isolated_postgres_pool().await;
                run_postgres_migrations(&pool).await;
                let repo = PostgresRateLimitRepo::new(pool, None);
                super::$name(&repo).await;
            }
        };
    }

    postgres_test!(test_first_check_opens_window);
    postgres_test!(test_increments_until_max_then_holds);
    postgres_test!(test_expired_window_restarts);
    postgres_test!(test_keys_are_independent);
    postgres_test!(test_get_and_delete);
    postgres_test!(test_purge_expired);
}
