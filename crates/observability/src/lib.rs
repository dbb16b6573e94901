//! Process-wide tracing setup shared by the server binary and tools.

pub mod tracing;

pub use tracing::{LogFormat, LogSettings};

/// Initialize logging with the defaults (JSON, `RUST_LOG` or `info`).
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init(&LogSettings::default());
}
