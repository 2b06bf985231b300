//! Analysis configuration.
//!
//! One serializable object carries every tunable of the analysis pipeline.
//! Load it from TOML or JSON, override from `TRADEKERNEL_*` environment
//! variables, or build it in code; `validate()` rejects out-of-range values
//! with `InvalidConfiguration`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{CalendarConvention, FillPolicy, Frequency};
use tradekernel_core::error::{KernelError, Result};

// ============================================================================
// Sections
// ============================================================================

/// Series builder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    /// Bucket frequency.
    pub frequency: Frequency,
    /// Gap fill policy.
    pub fill: FillPolicy,
    /// Minimum number of buckets.
    pub min_points: usize,
    /// Maximum number of buckets (guards against a stray timestamp).
    pub max_points: usize,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            frequency: Frequency::Daily,
            fill: FillPolicy::Zero,
            min_points: 60,
            max_points: 200_000,
        }
    }
}

/// Cyclical detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Minimum normalized spectral power of a reported peak.
    pub min_strength: f64,
    /// Shortest period searched, in days.
    pub min_period_days: f64,
    /// Longest period searched, in days; half the series when unset.
    pub max_period_days: Option<f64>,
    /// Maximum number of reported cycles.
    pub max_cycles: usize,
    /// Number of surrogate series for the confidence estimate.
    pub n_surrogates: usize,
    /// Forecast horizon in days.
    pub forecast_days: f64,
    /// Annual band convention.
    pub calendar: CalendarConvention,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_strength: 0.15,
            min_period_days: 2.0,
            max_period_days: None,
            max_cycles: 5,
            n_surrogates: 200,
            forecast_days: 30.0,
            calendar: CalendarConvention::Trading,
        }
    }
}

/// Regime detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Number of hidden states, in [2, 8].
    pub n_states: usize,
    /// EM iteration cap.
    pub max_iter: usize,
    /// Log-likelihood change that counts as converged.
    pub tolerance: f64,
    /// Rolling window for the volatility feature.
    pub volatility_window: usize,
    /// Floor on emission variances.
    pub min_variance: f64,
    /// Minimum observations regardless of state count.
    pub min_observations: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            n_states: 4,
            max_iter: 100,
            tolerance: 1e-4,
            volatility_window: 10,
            min_variance: 1e-3,
            min_observations: 30,
        }
    }
}

/// Pattern matcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Query window length in samples.
    pub window_size: usize,
    /// Maximum number of matches returned.
    pub top_k: usize,
    /// Forward horizon for realized outcomes, at most `window_size`.
    pub horizon: usize,
    /// Sakoe-Chiba band as a fraction of the window.
    pub band_fraction: f64,
    /// Smallest accepted window.
    pub min_window: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            window_size: 30,
            top_k: 5,
            horizon: 10,
            band_fraction: 0.1,
            min_window: 5,
        }
    }
}

/// Monotonic map from a raw statistic onto [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreMapping {
    /// 0 at `low`, 1 at `high`, clamped; `low > high` gives a decreasing map.
    Linear {
        /// Value mapped to 0.
        low: f64,
        /// Value mapped to 1.
        high: f64,
    },
    /// `1 / (1 + exp(-steepness * (x - midpoint)))`.
    Logistic {
        /// Value mapped to 0.5.
        midpoint: f64,
        /// Slope; negative for a decreasing map.
        steepness: f64,
    },
}

impl ScoreMapping {
    /// Map `x` onto [0, 1].
    pub fn apply(&self, x: f64) -> f64 {
        let score = match *self {
            ScoreMapping::Linear { low, high } => {
                if (high - low).abs() < f64::EPSILON {
                    if x >= high {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    (x - low) / (high - low)
                }
            }
            ScoreMapping::Logistic {
                midpoint,
                steepness,
            } => 1.0 / (1.0 + (-steepness * (x - midpoint)).exp()),
        };
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }
}

/// Weights of the five reliability sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityWeights {
    /// Significance weight.
    pub significance: f64,
    /// Walk-forward efficiency weight.
    pub walk_forward: f64,
    /// Occurrence count weight.
    pub sample_size: f64,
    /// Recency weight.
    pub recency: f64,
    /// Cross-period consistency weight.
    pub consistency: f64,
}

impl Default for ReliabilityWeights {
    fn default() -> Self {
        Self {
            significance: 0.30,
            walk_forward: 0.25,
            sample_size: 0.20,
            recency: 0.15,
            consistency: 0.10,
        }
    }
}

impl ReliabilityWeights {
    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.significance + self.walk_forward + self.sample_size + self.recency + self.consistency
    }
}

/// Mappings of the five reliability sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityMappings {
    /// Applied to `-log10(corrected p)`.
    pub significance: ScoreMapping,
    /// Applied to walk-forward efficiency.
    pub walk_forward: ScoreMapping,
    /// Applied to the occurrence count.
    pub sample_size: ScoreMapping,
    /// Applied to days since last confirmation.
    pub recency: ScoreMapping,
    /// Applied to the share of positive out-of-sample folds.
    pub consistency: ScoreMapping,
}

impl Default for ReliabilityMappings {
    fn default() -> Self {
        Self {
            significance: ScoreMapping::Linear { low: 0.0, high: 4.0 },
            walk_forward: ScoreMapping::Linear { low: 0.0, high: 1.0 },
            sample_size: ScoreMapping::Linear { low: 0.0, high: 30.0 },
            recency: ScoreMapping::Linear {
                low: 365.0,
                high: 0.0,
            },
            consistency: ScoreMapping::Linear { low: 0.0, high: 1.0 },
        }
    }
}

/// Validator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Walk-forward folds.
    pub num_folds: usize,
    /// Bootstrap resamples.
    pub bootstrap_iterations: usize,
    /// Tests for the Bonferroni correction; the batch size when unset.
    pub bonferroni_n_tests: Option<usize>,
    /// Significance level after correction.
    pub alpha: f64,
    /// Minimum walk-forward efficiency.
    pub min_wfe: f64,
    /// Minimum evaluable occurrences.
    pub min_occurrences: usize,
    /// Minimum history in days.
    pub min_history_days: f64,
    /// A profitable occurrence must fall within this many days of the end.
    pub confirmation_window_days: f64,
    /// Sub-score weights.
    pub weights: ReliabilityWeights,
    /// Sub-score mappings.
    pub mappings: ReliabilityMappings,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            num_folds: 5,
            bootstrap_iterations: 1000,
            bonferroni_n_tests: None,
            alpha: 0.05,
            min_wfe: 0.5,
            min_occurrences: 5,
            min_history_days: 1095.0,
            confirmation_window_days: 365.0,
            weights: ReliabilityWeights::default(),
            mappings: ReliabilityMappings::default(),
        }
    }
}

/// Ensemble base weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseWeights {
    /// Cycle projection weight.
    pub fourier: f64,
    /// Regime outlook weight.
    pub regime: f64,
    /// Analogue forecast weight.
    pub matcher: f64,
}

impl Default for BaseWeights {
    fn default() -> Self {
        Self {
            fourier: 0.35,
            regime: 0.35,
            matcher: 0.30,
        }
    }
}

/// How base weights become contributing weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Renormalize base weights over usable models.
    #[default]
    Renormalize,
    /// Scale base weights by model confidence, then renormalize.
    ConfidenceAdjusted,
}

/// Ensemble settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Base weights.
    pub base_weights: BaseWeights,
    /// Weighting policy.
    pub weight_policy: WeightPolicy,
    /// Agreement below this with confident models raises the anomaly flag.
    pub anomaly_agreement_threshold: f64,
    /// Confidence counted as "high".
    pub high_confidence: f64,
    /// Dead zone around zero for directional calls.
    pub direction_epsilon: f64,
    /// Outlier z-score threshold.
    pub outlier_z_threshold: f64,
    /// Recent window of the outlier check, in samples.
    pub outlier_recent_window: usize,
    /// Scale rejected patterns' confidence by their reliability.
    pub validation_gate: bool,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            base_weights: BaseWeights::default(),
            weight_policy: WeightPolicy::Renormalize,
            anomaly_agreement_threshold: 0.3,
            high_confidence: 0.7,
            direction_epsilon: 0.05,
            outlier_z_threshold: 3.0,
            outlier_recent_window: 7,
            validation_gate: true,
        }
    }
}

// ============================================================================
// AnalysisConfig
// ============================================================================

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Series builder.
    pub series: SeriesConfig,
    /// Cyclical detector.
    pub cycles: CycleConfig,
    /// Regime detector.
    pub regime: RegimeConfig,
    /// Pattern matcher.
    pub matcher: MatcherConfig,
    /// Validator.
    pub validation: ValidationConfig,
    /// Ensemble.
    pub ensemble: EnsembleConfig,
    /// Base seed for surrogates and bootstrap.
    pub seed: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            series: SeriesConfig::default(),
            cycles: CycleConfig::default(),
            regime: RegimeConfig::default(),
            matcher: MatcherConfig::default(),
            validation: ValidationConfig::default(),
            ensemble: EnsembleConfig::default(),
            seed: 42,
        }
    }
}

impl AnalysisConfig {
    /// Lighter resampling for tests and quick looks.
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.cycles.n_surrogates = 50;
        config.validation.bootstrap_iterations = 200;
        config.regime.max_iter = 50;
        config
    }

    /// Create a builder starting from defaults.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Load configuration from a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

        let config: Self = match ext {
            "json" => serde_json::from_str(&contents)
                .map_err(|e| KernelError::ConfigError(format!("{}: {e}", path.display())))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| KernelError::ConfigError(format!("{}: {e}", path.display())))?,
            other => {
                return Err(KernelError::ConfigError(format!(
                    "unsupported config format: {other}"
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `TRADEKERNEL_*` environment overrides.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `TRADEKERNEL_*` environment overrides on top of `self`.
    ///
    /// Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        fn var<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|v| v.parse().ok())
        }

        if let Some(v) = var("TRADEKERNEL_MIN_STRENGTH") {
            self.cycles.min_strength = v;
        }
        if let Some(v) = var("TRADEKERNEL_FORECAST_DAYS") {
            self.cycles.forecast_days = v;
        }
        if let Some(v) = var("TRADEKERNEL_N_SURROGATES") {
            self.cycles.n_surrogates = v;
        }
        if let Some(v) = var("TRADEKERNEL_N_STATES") {
            self.regime.n_states = v;
        }
        if let Some(v) = var("TRADEKERNEL_WINDOW_SIZE") {
            self.matcher.window_size = v;
        }
        if let Some(v) = var("TRADEKERNEL_TOP_K") {
            self.matcher.top_k = v;
        }
        if let Some(v) = var("TRADEKERNEL_NUM_FOLDS") {
            self.validation.num_folds = v;
        }
        if let Some(v) = var("TRADEKERNEL_BOOTSTRAP_ITERATIONS") {
            self.validation.bootstrap_iterations = v;
        }
        if let Some(v) = var("TRADEKERNEL_BONFERRONI_N_TESTS") {
            self.validation.bonferroni_n_tests = Some(v);
        }
        if let Some(v) = var("TRADEKERNEL_ANOMALY_AGREEMENT_THRESHOLD") {
            self.ensemble.anomaly_agreement_threshold = v;
        }
        if let Some(v) = var::<String>("TRADEKERNEL_FREQUENCY").and_then(|s| Frequency::parse(&s)) {
            self.series.frequency = v;
        }
        if let Some(v) = var("TRADEKERNEL_SEED") {
            self.seed = v;
        }
        self
    }

    /// Check every parameter range.
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, msg: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(KernelError::invalid_config(msg))
            }
        }
        fn unit(x: f64) -> bool {
            (0.0..=1.0).contains(&x)
        }

        let s = &self.series;
        check(s.min_points >= 2, "series.min_points must be >= 2")?;
        check(s.max_points >= s.min_points, "series.max_points must be >= min_points")?;

        let c = &self.cycles;
        check(unit(c.min_strength), "cycles.min_strength must be in [0, 1]")?;
        check(c.min_period_days > 0.0, "cycles.min_period_days must be > 0")?;
        if let Some(max) = c.max_period_days {
            check(max > c.min_period_days, "cycles.max_period_days must exceed min_period_days")?;
        }
        check(c.max_cycles >= 1, "cycles.max_cycles must be >= 1")?;
        check(c.n_surrogates >= 1, "cycles.n_surrogates must be >= 1")?;
        check(c.forecast_days > 0.0, "cycles.forecast_days must be > 0")?;

        let r = &self.regime;
        check((2..=8).contains(&r.n_states), "regime.n_states must be in [2, 8]")?;
        check(r.max_iter >= 1, "regime.max_iter must be >= 1")?;
        check(r.tolerance > 0.0, "regime.tolerance must be > 0")?;
        check(r.volatility_window >= 2, "regime.volatility_window must be >= 2")?;
        check(r.min_variance > 0.0, "regime.min_variance must be > 0")?;

        let m = &self.matcher;
        check(m.top_k >= 1, "matcher.top_k must be >= 1")?;
        check(m.horizon >= 1, "matcher.horizon must be >= 1")?;
        check(m.horizon <= m.window_size, "matcher.horizon must not exceed window_size")?;
        check(
            m.band_fraction > 0.0 && m.band_fraction <= 1.0,
            "matcher.band_fraction must be in (0, 1]",
        )?;
        check(m.min_window >= 2, "matcher.min_window must be >= 2")?;

        let v = &self.validation;
        check(v.num_folds >= 2, "validation.num_folds must be >= 2")?;
        check(v.bootstrap_iterations >= 1, "validation.bootstrap_iterations must be >= 1")?;
        check(
            v.bonferroni_n_tests.map_or(true, |n| n >= 1),
            "validation.bonferroni_n_tests must be >= 1",
        )?;
        check(v.alpha > 0.0 && v.alpha < 1.0, "validation.alpha must be in (0, 1)")?;
        check(v.weights.total() > 0.0, "validation.weights must not all be zero")?;
        let w = &v.weights;
        check(
            [w.significance, w.walk_forward, w.sample_size, w.recency, w.consistency]
                .iter()
                .all(|x| *x >= 0.0),
            "validation.weights must be non-negative",
        )?;

        let e = &self.ensemble;
        let b = &e.base_weights;
        check(
            b.fourier >= 0.0 && b.regime >= 0.0 && b.matcher >= 0.0,
            "ensemble.base_weights must be non-negative",
        )?;
        check(
            b.fourier + b.regime + b.matcher > 0.0,
            "ensemble.base_weights must not all be zero",
        )?;
        check(
            unit(e.anomaly_agreement_threshold),
            "ensemble.anomaly_agreement_threshold must be in [0, 1]",
        )?;
        check(unit(e.high_confidence), "ensemble.high_confidence must be in [0, 1]")?;
        check(e.direction_epsilon >= 0.0, "ensemble.direction_epsilon must be >= 0")?;
        check(e.outlier_z_threshold > 0.0, "ensemble.outlier_z_threshold must be > 0")?;
        check(e.outlier_recent_window >= 1, "ensemble.outlier_recent_window must be >= 1")?;

        Ok(())
    }

    /// Stable BLAKE3 hash of the canonical JSON form, hex encoded.
    pub fn fingerprint(&self) -> String {
        match serde_json::to_vec(self) {
            Ok(bytes) => blake3::hash(&bytes).to_hex().to_string(),
            // Serializing plain data cannot fail; hash the debug form if it does.
            Err(_) => blake3::hash(format!("{self:?}").as_bytes())
                .to_hex()
                .to_string(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    /// Sampling frequency.
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.config.series.frequency = frequency;
        self
    }

    /// Gap fill policy.
    pub fn fill(mut self, fill: FillPolicy) -> Self {
        self.config.series.fill = fill;
        self
    }

    /// Minimum cycle strength.
    pub fn min_strength(mut self, value: f64) -> Self {
        self.config.cycles.min_strength = value;
        self
    }

    /// Cycle forecast horizon in days.
    pub fn forecast_days(mut self, days: f64) -> Self {
        self.config.cycles.forecast_days = days;
        self
    }

    /// Surrogate count.
    pub fn n_surrogates(mut self, n: usize) -> Self {
        self.config.cycles.n_surrogates = n;
        self
    }

    /// Number of hidden states.
    pub fn n_states(mut self, n: usize) -> Self {
        self.config.regime.n_states = n;
        self
    }

    /// Matcher window.
    pub fn window_size(mut self, n: usize) -> Self {
        self.config.matcher.window_size = n;
        self
    }

    /// Maximum number of matches.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.matcher.top_k = k;
        self
    }

    /// Matcher outcome horizon.
    pub fn horizon(mut self, h: usize) -> Self {
        self.config.matcher.horizon = h;
        self
    }

    /// Walk-forward folds.
    pub fn num_folds(mut self, k: usize) -> Self {
        self.config.validation.num_folds = k;
        self
    }

    /// Bootstrap resamples.
    pub fn bootstrap_iterations(mut self, n: usize) -> Self {
        self.config.validation.bootstrap_iterations = n;
        self
    }

    /// Fixed Bonferroni test count.
    pub fn bonferroni_n_tests(mut self, n: usize) -> Self {
        self.config.validation.bonferroni_n_tests = Some(n);
        self
    }

    /// Ensemble base weights.
    pub fn base_weights(mut self, weights: BaseWeights) -> Self {
        self.config.ensemble.base_weights = weights;
        self
    }

    /// Ensemble weight policy.
    pub fn weight_policy(mut self, policy: WeightPolicy) -> Self {
        self.config.ensemble.weight_policy = policy;
        self
    }

    /// Anomaly agreement threshold.
    pub fn anomaly_agreement_threshold(mut self, value: f64) -> Self {
        self.config.ensemble.anomaly_agreement_threshold = value;
        self
    }

    /// Base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<AnalysisConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
