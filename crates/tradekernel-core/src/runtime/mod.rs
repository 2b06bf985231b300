//! Host runtime support.
//!
//! - Runtime configuration (worker threads, run deadline, logging)
//! - Fixed-size worker pool with ordered, deterministic results
//!
//! # Example
//!
//! ```rust,ignore
//! use tradekernel_core::runtime::{RuntimeConfig, WorkerPool};
//!
//! let config = RuntimeConfig::production();
//! let pool = WorkerPool::new(config.worker_threads)?;
//! let squares = pool.map_indexed(8, |i| i * i);
//! ```

pub mod config;
pub mod pool;

pub use config::{ConfigError, RuntimeConfig, RuntimeConfigBuilder};
pub use pool::WorkerPool;
