//! Domain definitions for kernel categorization.
//!
//! Kernels are grouped by the analytical question they answer. Domains drive
//! catalogue listing and registry statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Analytical domain for kernel categorization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Domain {
    /// Series construction and spectral cycle analysis
    TemporalAnalysis,

    /// Hidden-state regime inference
    RegimeAnalysis,

    /// Elastic nearest-neighbour search over historical windows
    PatternMatching,

    /// Significance, overfitting and reliability gating
    StatisticalValidation,

    /// Multi-model aggregation and anomaly flags
    EnsembleForecasting,

    /// Infrastructure validation
    Core,
}

impl Domain {
    /// All available domains.
    pub const ALL: &'static [Domain] = &[
        Domain::TemporalAnalysis,
        Domain::RegimeAnalysis,
        Domain::PatternMatching,
        Domain::StatisticalValidation,
        Domain::EnsembleForecasting,
        Domain::Core,
    ];

    /// Returns the domain name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Domain::TemporalAnalysis => "TemporalAnalysis",
            Domain::RegimeAnalysis => "RegimeAnalysis",
            Domain::PatternMatching => "PatternMatching",
            Domain::StatisticalValidation => "StatisticalValidation",
            Domain::EnsembleForecasting => "EnsembleForecasting",
            Domain::Core => "Core",
        }
    }

    /// Kernel id prefix used by kernels of this domain.
    #[must_use]
    pub const fn prefix(&self) -> &'static str {
        match self {
            Domain::TemporalAnalysis => "temporal",
            Domain::RegimeAnalysis => "regime",
            Domain::PatternMatching => "matching",
            Domain::StatisticalValidation => "validation",
            Domain::EnsembleForecasting => "ensemble",
            Domain::Core => "core",
        }
    }

    /// Parse a domain from its name or prefix (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().to_ascii_lowercase() == lower || d.prefix() == lower)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
