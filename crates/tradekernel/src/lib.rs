//! # TradeKernel
//!
//! Cycle, regime and analogue analytics with statistical validation for
//! per-entity trading activity.
//!
//! Raw activity events are bucketed into a regular series, analysed by three
//! independent models, checked by a walk-forward validation gate, and combined
//! into one directional prediction with a confidence and anomaly flags.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tradekernel::prelude::*;
//!
//! let config = AnalysisConfig::builder().forecast_days(14.0).build()?;
//! let prediction = EnsemblePredictor::predict_events(&events, &config, &WorkerPool::global())?;
//! println!("{:?} ({:.2})", prediction.direction, prediction.confidence);
//! ```
//!
//! ## Domain Organization
//!
//! - **TemporalAnalysis**: Series building, cycle detection, outlier check
//! - **RegimeAnalysis**: Gaussian hidden Markov model
//! - **PatternMatching**: DTW analogue search
//! - **StatisticalValidation**: Walk-forward and significance gate
//! - **EnsembleForecasting**: Weighted directional vote

#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export core crate
pub use tradekernel_core as core;

// Re-export analytics crate
pub use tradekernel_temporal as temporal;

/// Prelude module for convenient imports.
///
/// Import everything you need with:
/// ```rust,ignore
/// use tradekernel::prelude::*;
/// ```
pub mod prelude {
    pub use tradekernel_core::prelude::*;
    pub use tradekernel_temporal::prelude::*;
}

/// Kernel catalog.
pub mod catalog {
    use tradekernel_core::domain::Domain;

    /// Domain information.
    #[derive(Debug, Clone)]
    pub struct DomainInfo {
        /// Domain enum value.
        pub domain: Domain,
        /// Human-readable name.
        pub name: &'static str,
        /// Description.
        pub description: &'static str,
        /// Number of kernels.
        pub kernel_count: usize,
    }

    /// Get all domain information.
    pub fn domains() -> Vec<DomainInfo> {
        vec![
            DomainInfo {
                domain: Domain::TemporalAnalysis,
                name: "Temporal Analysis",
                description: "Series building, FFT cycle detection, recent-activity outlier check",
                kernel_count: 3,
            },
            DomainInfo {
                domain: Domain::RegimeAnalysis,
                name: "Regime Analysis",
                description: "Gaussian HMM fitted by EM with Viterbi decoding",
                kernel_count: 1,
            },
            DomainInfo {
                domain: Domain::PatternMatching,
                name: "Pattern Matching",
                description: "Banded DTW search for historical analogues",
                kernel_count: 1,
            },
            DomainInfo {
                domain: Domain::StatisticalValidation,
                name: "Statistical Validation",
                description: "Walk-forward efficiency, significance tests, reliability score",
                kernel_count: 1,
            },
            DomainInfo {
                domain: Domain::EnsembleForecasting,
                name: "Ensemble Forecasting",
                description: "Weighted directional vote with anomaly flags",
                kernel_count: 1,
            },
        ]
    }

    /// Get total kernel count.
    pub fn total_kernel_count() -> usize {
        domains().iter().map(|d| d.kernel_count).sum()
    }
}

/// Register all kernels with a registry.
pub fn register_all(
    registry: &tradekernel_core::registry::KernelRegistry,
) -> tradekernel_core::error::Result<()> {
    tradekernel_temporal::register_all(registry)
}

/// Version information.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
