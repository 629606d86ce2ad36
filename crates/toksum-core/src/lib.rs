//! Core domain types for toksum
//!
//! This crate contains:
//! - Result types handed back to callers (`TokenCount`, `FallbackReason`)
//! - Pool observability snapshots (`PoolHealth`, `PoolStats`)
//! - The pool configuration (`PoolConfig`)
//! - The error taxonomy

pub mod config;
pub mod error;
pub mod types;

pub use config::PoolConfig;
pub use error::{PoolError, Result};
pub use types::{FallbackReason, PoolHealth, PoolStats, TokenCount};
