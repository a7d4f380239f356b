//! Security monitoring and adaptive rate limiting for the Comanda platform.
//!
//! This crate tracks authentication attempts, session activity, and
//! per-connection event rates, and drives the automated threat response.
//! It owns all of its transient state in-process; durable collaborators
//! (audit trail, session store, report store) are reached through the
//! adapter traits in `comanda-types`.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod analyzer;
pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod interceptor;
pub mod membership;
pub mod monitor;
pub mod prelude;
pub mod reaper;
pub mod registry;
pub mod report;
pub mod window;

// Re-export commonly used types
pub use api::{EngineDirective, RateDecision, SecurityStats, ThreatCategory, ThreatEvent};
pub use config::SecurityConfig;
pub use error::RateLimitError;
pub use monitor::SecurityMonitor;

// vim: ts=4
