//! Tracing/logging setup shared by taskdesk binaries and test harnesses.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogFormat, init, init_with};
