//! Convenience re-exports for engine modules.

pub use comanda_types::prelude::*;

// vim: ts=4
