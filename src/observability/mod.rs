//! Structured logging setup for the server and CLI.

mod tracing_init;

pub use tracing_init::*;
