//! Logging utilities.
//!
//! Everything in the engine logs through the `log` facade. This module only
//! owns the one-time `env_logger` initialization for binaries and tests that
//! want console output.

mod init;

pub use init::{init_logging, LoggingConfig};
