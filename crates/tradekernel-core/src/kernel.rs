//! Kernel metadata.
//!
//! Every analytical component is published as a kernel with a stable id,
//! a domain and rough cost expectations so a host can decide how to schedule
//! it (inline vs. worker pool).

use crate::domain::Domain;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kernel execution mode.
///
/// - `Batch`: pure function of its input, nothing retained between calls
/// - `Stateful`: must be fitted before it can answer queries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelMode {
    /// One-shot computation over an immutable input.
    Batch,

    /// Fit-then-query model (e.g. the regime detector).
    Stateful,
}

impl KernelMode {
    /// Returns true if this is a batch kernel.
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(self, KernelMode::Batch)
    }

    /// Returns true if this kernel holds a fitted model.
    #[must_use]
    pub const fn is_stateful(&self) -> bool {
        matches!(self, KernelMode::Stateful)
    }

    /// Returns the mode name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            KernelMode::Batch => "batch",
            KernelMode::Stateful => "stateful",
        }
    }
}

impl fmt::Display for KernelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kernel metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelMetadata {
    /// Unique kernel identifier (e.g., "temporal/cycle-detection").
    pub id: String,

    /// Kernel execution mode.
    pub mode: KernelMode,

    /// Analytical domain.
    pub domain: Domain,

    /// Human-readable description.
    pub description: String,

    /// Expected throughput in series per second for a 1,000-point input.
    pub expected_throughput: u64,

    /// Target latency in microseconds for a 1,000-point input.
    pub target_latency_us: f64,

    /// Whether the kernel fans work out to the worker pool.
    pub parallel: bool,

    /// Version of the kernel implementation.
    pub version: u32,
}

impl KernelMetadata {
    /// Create new batch kernel metadata.
    #[must_use]
    pub fn batch(id: impl Into<String>, domain: Domain) -> Self {
        Self {
            id: id.into(),
            mode: KernelMode::Batch,
            domain,
            description: String::new(),
            expected_throughput: 1_000,
            target_latency_us: 1_000.0,
            parallel: false,
            version: 1,
        }
    }

    /// Create new stateful kernel metadata.
    #[must_use]
    pub fn stateful(id: impl Into<String>, domain: Domain) -> Self {
        Self {
            mode: KernelMode::Stateful,
            ..Self::batch(id, domain)
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the expected throughput.
    #[must_use]
    pub fn with_throughput(mut self, per_sec: u64) -> Self {
        self.expected_throughput = per_sec;
        self
    }

    /// Set the target latency.
    #[must_use]
    pub fn with_latency_us(mut self, latency_us: f64) -> Self {
        self.target_latency_us = latency_us;
        self
    }

    /// Mark the kernel as using the worker pool.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Returns a PascalCase display name derived from the id.
    ///
    /// `temporal/cycle-detection` becomes `TemporalAnalysis.CycleDetection`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = self.id.rsplit('/').next().unwrap_or(&self.id);
        format!("{}.{}", self.domain, to_pascal_case(name))
    }
}

impl Default for KernelMetadata {
    fn default() -> Self {
        Self::batch("unnamed", Domain::Core)
    }
}

/// Convert a kebab-case or snake_case string to PascalCase.
fn to_pascal_case(s: &str) -> String {
    s.split(|c| c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
