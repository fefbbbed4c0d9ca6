//! Command handlers for chatvault
//!
//! Each CLI command has a handler module; handlers wire configuration
//! into the store, manager, and provider and drive the requested action.

pub mod serve;
pub mod sessions;
