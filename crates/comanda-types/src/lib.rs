//! Shared types, adapter traits, and core utilities for the Comanda platform.
//!
//! This crate contains the foundational types that are shared between the
//! security engine and all adapter implementations. Extracting these into a
//! separate crate allows adapter crates to compile in parallel with the
//! engine's feature modules.

pub mod audit_adapter;
pub mod error;
pub mod prelude;
pub mod report_adapter;
pub mod session_adapter;
pub mod types;
pub mod utils;

// vim: ts=4
