//! Shared database repository test infrastructure
//!
//! Each repository has a test module containing:
//! - Shared test functions that take `&dyn XxxRepo` (or a small context of repos)
//! - SQLite-specific setup using in-memory databases
//! - PostgreSQL-specific setup using testcontainers (marked `#[ignore]`)
//!
//! # Running tests
//!
//! ```bash
//! cargo test                       # Run fast SQLite tests only
//! cargo test -- --ignored          # Run PostgreSQL integration tests (requires Docker)
//! cargo test -- --include-ignored  # Run all tests
//! ```

mod accounts;
mod federation_configs;
mod rate_limits;
mod sync_locks;
