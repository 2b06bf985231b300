//! # TradeKernel Core
//!
//! Core abstractions shared by the TradeKernel analytics crates.
//!
//! This crate provides:
//! - Domain and kernel metadata definitions
//! - Error type and tagged component results
//! - Trait definitions for batch kernels
//! - Kernel registry
//! - Runtime configuration and a deterministic worker pool
//! - Logging setup

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod error;
pub mod kernel;
pub mod messages;
pub mod observability;
pub mod registry;
pub mod runtime;
pub mod traits;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::domain::Domain;
    pub use crate::error::{KernelError, Result};
    pub use crate::kernel::{KernelMetadata, KernelMode};
    pub use crate::messages::ComponentResult;
    pub use crate::observability::{LogConfig, LogLevel};
    pub use crate::registry::{KernelRegistry, RegistryStats};
    pub use crate::runtime::{RuntimeConfig, WorkerPool};
    pub use crate::traits::{AnalyticsKernel, BatchKernel, ExecutionContext};
}
