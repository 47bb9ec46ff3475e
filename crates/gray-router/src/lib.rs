//! Gray-release traffic router.
//!
//! Decides per request whether a client is served by the new or the old
//! version of a frontend project, then forwards the request to that origin.

pub mod admin;
pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod proxy;
pub mod routing;
