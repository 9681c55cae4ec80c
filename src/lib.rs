//! Bankroll overlay — live bankroll and session readouts for streaming
//! browser-source widgets.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod backend;
pub mod poller;
pub mod registry;
pub mod overlay;
pub mod server;
