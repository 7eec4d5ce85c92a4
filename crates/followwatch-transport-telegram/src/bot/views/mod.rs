//! View layer for bot UI components
//!
//! Contains keyboards, messages, and formatting for Telegram UI. Every text
//! is Telegram HTML; provider-supplied strings are escaped here.

pub mod keyboards;
pub mod messages;

pub use keyboards::*;
pub use messages::*;
