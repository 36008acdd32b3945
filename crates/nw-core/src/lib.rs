//! Core types, errors, and utilities for the ngxwatch workspace.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`ConfigPaths`] - layout of the web-server configuration tree and
//!   include-path resolution
//! - [`ScanConfig`] - tunables for the scanner (settle delay, rescan interval)
//! - [`ConfigError`] - configuration validation errors
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)
//!
//! # Crate Dependencies
//!
//! ```text
//! nw-cli ──► nw-scanner ──► nw-watcher ──► nw-core
//!                       └────────────────────────►
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod paths;

// Re-export configuration types
pub use config::ScanConfig;

// Re-export error types
pub use error::ConfigError;

// Re-export hash aliases
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};

// Re-export path types
pub use paths::ConfigPaths;
