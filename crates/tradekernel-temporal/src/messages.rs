//! Message types for the analytics kernels.
//!
//! Input/output message types for the `BatchKernel` trait implementations.

use serde::{Deserialize, Serialize};

use crate::config::{
    AnalysisConfig, CycleConfig, EnsembleConfig, MatcherConfig, RegimeConfig, SeriesConfig,
    ValidationConfig,
};
use crate::types::{
    ActivityEvent, ActivitySeries, CycleAnalysis, EnsemblePrediction, MatchResult, OutlierCheck,
    RegimeAnalysis, ValidationResult,
};
use crate::validation::ScheduledPattern;

// ============================================================================
// Series Builder Messages
// ============================================================================

/// Input for series construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesBuilderInput {
    /// Raw activity events, any order.
    pub events: Vec<ActivityEvent>,
    /// Bucketing parameters.
    pub config: SeriesConfig,
}

impl SeriesBuilderInput {
    /// Create a new series builder input.
    pub fn new(events: Vec<ActivityEvent>, config: SeriesConfig) -> Self {
        Self { events, config }
    }

    /// Daily buckets, zero fill.
    pub fn with_defaults(events: Vec<ActivityEvent>) -> Self {
        Self::new(events, SeriesConfig::default())
    }
}

/// Output from series construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesBuilderOutput {
    /// Regularly spaced series.
    pub result: ActivitySeries,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}

// ============================================================================
// Cycle Detection Messages
// ============================================================================

/// Input for cycle detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleDetectionInput {
    /// Activity series.
    pub series: ActivitySeries,
    /// Detection parameters.
    pub config: CycleConfig,
    /// Seed for the surrogate significance test.
    pub seed: u64,
}

impl CycleDetectionInput {
    /// Create a new cycle detection input.
    pub fn new(series: ActivitySeries, config: CycleConfig, seed: u64) -> Self {
        Self {
            series,
            config,
            seed,
        }
    }

    /// Default parameters and seed.
    pub fn with_defaults(series: ActivitySeries) -> Self {
        Self::new(series, CycleConfig::default(), AnalysisConfig::default().seed)
    }
}

/// Output from cycle detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleDetectionOutput {
    /// Detected cycles and projection.
    pub result: CycleAnalysis,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}

// ============================================================================
// Regime Detection Messages
// ============================================================================

/// Input for regime detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeDetectionInput {
    /// Activity series.
    pub series: ActivitySeries,
    /// Model parameters.
    pub config: RegimeConfig,
}

impl RegimeDetectionInput {
    /// Create a new regime detection input.
    pub fn new(series: ActivitySeries, config: RegimeConfig) -> Self {
        Self { series, config }
    }

    /// Four-state model.
    pub fn with_defaults(series: ActivitySeries) -> Self {
        Self::new(series, RegimeConfig::default())
    }
}

/// Output from regime detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeDetectionOutput {
    /// Fitted model, decoded states and outlook.
    pub result: RegimeAnalysis,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}

// ============================================================================
// Pattern Matching Messages
// ============================================================================

/// Input for analogue matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatchingInput {
    /// Activity series; the query is its tail.
    pub series: ActivitySeries,
    /// Search parameters.
    pub config: MatcherConfig,
}

impl PatternMatchingInput {
    /// Create a new pattern matching input.
    pub fn new(series: ActivitySeries, config: MatcherConfig) -> Self {
        Self { series, config }
    }

    /// 30-sample window, top 5.
    pub fn with_defaults(series: ActivitySeries) -> Self {
        Self::new(series, MatcherConfig::default())
    }
}

/// Output from analogue matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatchingOutput {
    /// Ranked matches and forecast.
    pub result: MatchResult,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}

// ============================================================================
// Pattern Validation Messages
// ============================================================================

/// Input for pattern validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternValidationInput {
    /// Activity series.
    pub series: ActivitySeries,
    /// Patterns tested together; the Bonferroni count defaults to their number.
    pub patterns: Vec<ScheduledPattern>,
    /// Gate parameters.
    pub config: ValidationConfig,
    /// Seed for bootstrap resampling.
    pub seed: u64,
}

impl PatternValidationInput {
    /// Create a new pattern validation input.
    pub fn new(
        series: ActivitySeries,
        patterns: Vec<ScheduledPattern>,
        config: ValidationConfig,
        seed: u64,
    ) -> Self {
        Self {
            series,
            patterns,
            config,
            seed,
        }
    }

    /// Default gate parameters and seed.
    pub fn with_defaults(series: ActivitySeries, patterns: Vec<ScheduledPattern>) -> Self {
        Self::new(
            series,
            patterns,
            ValidationConfig::default(),
            AnalysisConfig::default().seed,
        )
    }
}

/// Output from pattern validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternValidationOutput {
    /// One result per pattern, in input order.
    pub results: Vec<ValidationResult>,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}

// ============================================================================
// Outlier Check Messages
// ============================================================================

/// Input for the recent-activity outlier check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierCheckInput {
    /// Activity series.
    pub series: ActivitySeries,
    /// Number of trailing samples treated as recent.
    pub recent_window: usize,
    /// `|z|` above which the window is flagged.
    pub z_threshold: f64,
}

impl OutlierCheckInput {
    /// Create a new outlier check input.
    pub fn new(series: ActivitySeries, recent_window: usize, z_threshold: f64) -> Self {
        Self {
            series,
            recent_window,
            z_threshold,
        }
    }

    /// Window and threshold from the ensemble defaults.
    pub fn with_defaults(series: ActivitySeries) -> Self {
        let defaults = EnsembleConfig::default();
        Self::new(
            series,
            defaults.outlier_recent_window,
            defaults.outlier_z_threshold,
        )
    }
}

/// Output from the outlier check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierCheckOutput {
    /// Check result.
    pub result: OutlierCheck,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}

// ============================================================================
// Ensemble Prediction Messages
// ============================================================================

/// Where the ensemble gets its series from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum PredictionSource {
    /// Raw events, bucketed with the series config.
    Events(Vec<ActivityEvent>),
    /// A prepared series.
    Series(ActivitySeries),
}

/// Input for ensemble prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsemblePredictionInput {
    /// Events or series.
    pub source: PredictionSource,
    /// Full analysis configuration.
    pub config: AnalysisConfig,
}

impl EnsemblePredictionInput {
    /// Predict from raw events.
    pub fn from_events(events: Vec<ActivityEvent>, config: AnalysisConfig) -> Self {
        Self {
            source: PredictionSource::Events(events),
            config,
        }
    }

    /// Predict from a prepared series.
    pub fn from_series(series: ActivitySeries, config: AnalysisConfig) -> Self {
        Self {
            source: PredictionSource::Series(series),
            config,
        }
    }
}

/// Output from ensemble prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsemblePredictionOutput {
    /// Combined prediction with per-model detail.
    pub result: EnsemblePrediction,
    /// Computation time in microseconds.
    pub compute_time_us: u64,
}
