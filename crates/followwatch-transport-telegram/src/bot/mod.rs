/// Allowlist and access-denied throttling
pub mod access;
/// Command and callback handlers
pub mod handlers;
/// Resilient messaging with automatic retry for Telegram API operations
pub mod resilient;
/// View layer for UI components (keyboards, messages)
pub mod views;

pub use access::{Access, AccessGate};
