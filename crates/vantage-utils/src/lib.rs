//! # Vantage Utilities
//!
//! Logging setup shared by the hosts of `vantage-core`.
//!
//! Library code only emits `tracing` events; whoever embeds the core (the
//! `vantage` CLI, an engine plugin) decides where they go by calling one of
//! the initialisers here.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_to_file, init_logging_with_level, LogFormat, LogLevel, LoggingError,
};
pub use tracing::{debug, error, info, trace, warn};
