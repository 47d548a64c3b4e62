//! Logging utilities
//!
//! The library itself only emits through the `log` facade; binaries pick the
//! sink. `init` wires up `env_logger` for the common case.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
pub fn init() {
    env_logger::init();
}
