//! Observability
//!
//! Structured logging setup for hosts embedding the analytics kernels. The
//! kernels themselves only emit `tracing` events; installing a subscriber is
//! the host's call.

pub mod logging;

pub use logging::{LogConfig, LogLevel};
