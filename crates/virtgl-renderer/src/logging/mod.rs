//! Logging setup.
//!
//! The crate logs through the `log` facade only. Hosts without a logger of
//! their own call [`init_logging`] early; it installs `env_logger` once.

mod init;

pub use init::{LoggingConfig, init_logging};
