//! REST server for the pokerdesk tournament library.
//!
//! Exposed as a library so the router can be driven from integration tests.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
