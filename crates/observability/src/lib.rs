//! Process-wide logging setup shared by the service binaries.

pub mod tracing;

pub use crate::tracing::{LogFormat, LoggingConfig};

/// Install JSON logging filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    crate::tracing::init(&LoggingConfig::default());
}
