//! # TradeKernel Temporal
//!
//! Analytics kernels over entity-level trading activity.
//!
//! ## Kernels
//!
//! ### Series (2 kernels)
//! - `SeriesBuilder` - Bucket raw events into a regular series with gap filling
//! - `ActivityOutlierCheck` - Z-score of recent activity against its history
//!
//! ### Cycles (1 kernel)
//! - `CycleDetection` - FFT peaks, surrogate significance, sinusoid fit and projection
//!
//! ### Regimes (1 kernel)
//! - `RegimeDetection` - Gaussian HMM fitted by EM, Viterbi decoding, next-state outlook
//!
//! ### Matching (1 kernel)
//! - `PatternMatcher` - Banded DTW search for historical analogues
//!
//! ### Validation (1 kernel)
//! - `PatternValidator` - Walk-forward, t-test, chi-square, Bonferroni, effect size,
//!   bootstrap and a composite reliability score
//!
//! ### Ensemble (1 kernel)
//! - `EnsemblePredictor` - Weighted directional vote with anomaly flags

#![warn(missing_docs)]

pub mod config;
pub mod cycles;
pub mod ensemble;
pub mod matching;
pub mod messages;
pub mod outlier;
pub mod regime;
pub mod series;
pub mod stats;
pub mod types;
pub mod validation;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::*;
    pub use crate::cycles::*;
    pub use crate::ensemble::*;
    pub use crate::matching::*;
    pub use crate::messages::*;
    pub use crate::outlier::*;
    pub use crate::regime::*;
    pub use crate::series::*;
    pub use crate::types::*;
    pub use crate::validation::*;
}

use tradekernel_core::traits::AnalyticsKernel;

/// Register all analytics kernels with a registry.
pub fn register_all(
    registry: &tradekernel_core::registry::KernelRegistry,
) -> tradekernel_core::error::Result<()> {
    tracing::info!("Registering trading activity kernels");

    // Series kernels (2)
    registry.register(series::SeriesBuilder::new().metadata().clone())?;
    registry.register(outlier::ActivityOutlierCheck::new().metadata().clone())?;

    // Detectors (3)
    registry.register(cycles::CycleDetection::new().metadata().clone())?;
    registry.register(regime::RegimeDetection::new().metadata().clone())?;
    registry.register(matching::PatternMatcher::new().metadata().clone())?;

    // Validation and ensemble (2)
    registry.register(validation::PatternValidator::new().metadata().clone())?;
    registry.register(ensemble::EnsemblePredictor::new().metadata().clone())?;

    tracing::info!("Registered 7 trading activity kernels");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradekernel_core::domain::Domain;
    use tradekernel_core::registry::KernelRegistry;

    #[test]
    fn test_register_all() {
        let registry = KernelRegistry::new();
        register_all(&registry).expect("Failed to register kernels");
        assert_eq!(registry.total_count(), 7);
        assert!(registry.contains("regime/hmm-detection"));
        assert_eq!(registry.by_domain(Domain::TemporalAnalysis).len(), 3);
    }

    #[test]
    fn test_register_twice_fails() {
        let registry = KernelRegistry::new();
        register_all(&registry).unwrap();
        assert!(register_all(&registry).is_err());
    }
}
