#![deny(missing_docs)]
//! followwatch core library.
//!
//! Upstream API client, pagination reconciler, tracking store and the
//! tracker that ties them together.

/// Configuration management.
pub mod config;
/// Resolving a following-count delta into concrete accounts.
pub mod reconcile;
/// Storage layer (JSON file).
pub mod storage;
/// Check orchestration: delta computation and persistence.
pub mod tracker;
/// Upstream Twitter API client.
pub mod twitter;
/// Utility functions.
pub mod utils;

#[cfg(test)]
pub mod testing;
