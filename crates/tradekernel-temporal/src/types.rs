//! Activity analysis types and data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::stats;
use tradekernel_core::messages::ComponentResult;

// ============================================================================
// Series Types
// ============================================================================

/// One timestamped trading event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Event time.
    pub timestamp: DateTime<Utc>,
    /// Traded volume or value.
    pub value: f64,
}

impl ActivityEvent {
    /// Create a new event.
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Sampling frequency of an activity series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One bucket per hour.
    Hourly,
    /// One bucket per UTC day.
    #[default]
    Daily,
    /// One bucket per week, starting Monday 00:00 UTC.
    Weekly,
}

impl Frequency {
    /// Bucket length in seconds.
    pub const fn bucket_seconds(&self) -> i64 {
        match self {
            Frequency::Hourly => 3_600,
            Frequency::Daily => 86_400,
            Frequency::Weekly => 604_800,
        }
    }

    /// Days covered by one sample.
    pub fn days_per_sample(&self) -> f64 {
        self.bucket_seconds() as f64 / 86_400.0
    }

    /// Bucket alignment offset from the Unix epoch (1970-01-05 was a Monday).
    pub(crate) const fn origin_seconds(&self) -> i64 {
        match self {
            Frequency::Weekly => 4 * 86_400,
            _ => 0,
        }
    }

    /// Bucket number containing `timestamp`.
    pub fn bucket_of(&self, timestamp: &DateTime<Utc>) -> i64 {
        (timestamp.timestamp() - self.origin_seconds()).div_euclid(self.bucket_seconds())
    }

    /// Start time of bucket number `bucket`.
    pub fn bucket_start(&self, bucket: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(bucket * self.bucket_seconds() + self.origin_seconds(), 0)
    }

    /// Parse from a name (`hourly`, `daily`, `weekly`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" | "h" => Some(Frequency::Hourly),
            "daily" | "d" => Some(Frequency::Daily),
            "weekly" | "w" => Some(Frequency::Weekly),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Hourly => write!(f, "hourly"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
        }
    }
}

/// How buckets without events are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Empty bucket means no activity.
    #[default]
    Zero,
    /// Empty bucket repeats the last observed bucket.
    ForwardFill,
}

/// First and last bucket start of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpan {
    /// First bucket start.
    pub start: DateTime<Utc>,
    /// Last bucket start.
    pub end: DateTime<Utc>,
}

/// Regularly spaced activity series for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySeries {
    /// Per-bucket activity.
    pub values: Vec<f64>,
    /// Bucket start times, same length as `values`.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Sampling frequency.
    pub frequency: Frequency,
    /// Covered time range.
    pub span: SeriesSpan,
}

impl ActivitySeries {
    /// Build a series from raw values, one bucket per value starting at `start`.
    pub fn from_values(values: Vec<f64>, frequency: Frequency, start: DateTime<Utc>) -> Self {
        let step = chrono::Duration::seconds(frequency.bucket_seconds());
        let timestamps: Vec<DateTime<Utc>> = (0..values.len())
            .map(|i| start + step * i as i32)
            .collect();
        let end = timestamps.last().copied().unwrap_or(start);
        Self {
            values,
            timestamps,
            frequency,
            span: SeriesSpan { start, end },
        }
    }

    /// Daily series starting at the Unix epoch.
    pub fn daily(values: Vec<f64>) -> Self {
        Self::from_values(values, Frequency::Daily, DateTime::<Utc>::default())
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean activity.
    pub fn mean(&self) -> f64 {
        stats::mean(&self.values)
    }

    /// Sample standard deviation of activity.
    pub fn std_dev(&self) -> f64 {
        stats::std_dev(&self.values)
    }

    /// First differences, one shorter than the series.
    pub fn differences(&self) -> Vec<f64> {
        self.values.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Days per sample for this frequency.
    pub fn days_per_sample(&self) -> f64 {
        self.frequency.days_per_sample()
    }

    /// Days covered, counting each sample as a full bucket.
    pub fn span_days(&self) -> f64 {
        self.len() as f64 * self.days_per_sample()
    }

    /// Last `n` values (all values when shorter).
    pub fn tail(&self, n: usize) -> &[f64] {
        &self.values[self.len().saturating_sub(n)..]
    }

    /// Stable BLAKE3 hash of the series contents, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.frequency.to_string().as_bytes());
        for (ts, v) in self.timestamps.iter().zip(&self.values) {
            hasher.update(&ts.timestamp().to_le_bytes());
            hasher.update(&v.to_bits().to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Signed direction of a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Activity expected to rise.
    Up,
    /// Activity expected to fall.
    Down,
    /// No directional view.
    #[default]
    Flat,
}

impl Direction {
    /// Classify a signed value with a dead zone of `epsilon`.
    pub fn from_signal(value: f64, epsilon: f64) -> Self {
        if value > epsilon {
            Direction::Up
        } else if value < -epsilon {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    /// +1, -1 or 0.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
            Direction::Flat => 0.0,
        }
    }
}

// ============================================================================
// Cycle Types
// ============================================================================

/// Day-count convention for the annual band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarConvention {
    /// 252 trading days per year.
    #[default]
    Trading,
    /// 365 calendar days per year.
    Calendar,
}

impl CalendarConvention {
    /// Days in one year under this convention.
    pub fn annual_days(&self) -> f64 {
        match self {
            CalendarConvention::Trading => 252.0,
            CalendarConvention::Calendar => 365.0,
        }
    }
}

/// Named period band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleBand {
    /// 7 ± 2 days.
    Weekly,
    /// 30 ± 5 days.
    Monthly,
    /// 90 ± 10 days.
    Quarterly,
    /// 252 or 365 ± 20 days.
    Annual,
    /// Anything else.
    Other,
}

impl CycleBand {
    /// Bucket a period in days.
    pub fn classify(period_days: f64, convention: CalendarConvention) -> Self {
        if (period_days - 7.0).abs() <= 2.0 {
            CycleBand::Weekly
        } else if (period_days - 30.0).abs() <= 5.0 {
            CycleBand::Monthly
        } else if (period_days - 90.0).abs() <= 10.0 {
            CycleBand::Quarterly
        } else if (period_days - convention.annual_days()).abs() <= 20.0 {
            CycleBand::Annual
        } else {
            CycleBand::Other
        }
    }
}

/// One detected periodicity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclePattern {
    /// Period in days.
    pub period_days: f64,
    /// Share of non-DC spectral power around the peak, in [0, 1].
    pub strength: f64,
    /// Phase in radians of `amplitude * cos(2π t / period + phase)`, t in samples.
    pub phase: f64,
    /// Sinusoid amplitude in activity units.
    pub amplitude: f64,
    /// Period range implied by half a frequency bin either side.
    pub confidence_interval: (f64, f64),
    /// Fraction of surrogate series whose peak amplitude is below this one.
    pub confidence: f64,
    /// Named band.
    pub band: CycleBand,
}

impl CyclePattern {
    /// Period in samples for a given sampling frequency.
    pub fn period_samples(&self, frequency: Frequency) -> f64 {
        self.period_days / frequency.days_per_sample()
    }
}

/// Projection of trend plus fitted sinusoids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleForecast {
    /// Point forecast per future sample.
    pub values: Vec<f64>,
    /// Lower band (−1.96σ of residuals).
    pub lower: Vec<f64>,
    /// Upper band (+1.96σ of residuals).
    pub upper: Vec<f64>,
    /// Forecast horizon in days.
    pub horizon_days: f64,
}

/// Full cycle detection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleAnalysis {
    /// Detected cycles, strongest first.
    pub cycles: Vec<CyclePattern>,
    /// Linear trend `(slope per sample, intercept)`.
    pub trend: (f64, f64),
    /// Standard deviation of residuals after trend and cycles.
    pub residual_std: f64,
    /// Fitted value (trend plus cycles) at the last sample.
    pub last_fitted: f64,
    /// Forward projection; `None` when no cycle was found.
    pub forecast: Option<CycleForecast>,
    /// Number of samples analysed.
    pub n_points: usize,
}

// ============================================================================
// Regime Types
// ============================================================================

/// Human label for a regime, ranked by mean activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeLabel {
    /// Quietest regime.
    LowActivity,
    /// Below-median regime.
    Moderate,
    /// Above-median regime.
    Elevated,
    /// Busiest regime.
    Aggressive,
}

impl RegimeLabel {
    /// Label for the state with activity rank `rank` out of `n_states`.
    pub fn from_rank(rank: usize, n_states: usize) -> Self {
        let scaled = if n_states <= 1 {
            0.0
        } else {
            rank as f64 * 3.0 / (n_states - 1) as f64
        };
        match scaled.round() as usize {
            0 => RegimeLabel::LowActivity,
            1 => RegimeLabel::Moderate,
            2 => RegimeLabel::Elevated,
            _ => RegimeLabel::Aggressive,
        }
    }
}

/// Per-feature standardization used during fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaling {
    /// Feature means (return, volatility, volume).
    pub means: Vec<f64>,
    /// Feature standard deviations; 1 for constant features.
    pub stds: Vec<f64>,
}

/// Fitted hidden Markov model over standardized activity features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeModel {
    /// Number of hidden states.
    pub n_states: usize,
    /// Initial state distribution.
    pub initial_probs: Vec<f64>,
    /// Row-stochastic transition matrix.
    pub transition_matrix: Vec<Vec<f64>>,
    /// Per-state emission means (z-space: return, volatility, volume).
    pub state_centroids: Vec<Vec<f64>>,
    /// Per-state diagonal emission variances.
    pub state_variances: Vec<Vec<f64>>,
    /// Per-state labels.
    pub state_labels: Vec<RegimeLabel>,
    /// Per-state mean activity in original units.
    pub state_activity: Vec<f64>,
    /// Log-likelihood of the training features.
    pub log_likelihood: f64,
    /// EM iterations run.
    pub iterations: usize,
    /// Whether EM met the tolerance before the iteration cap.
    pub converged: bool,
    /// Training length.
    pub n_observations: usize,
    /// Standardization of the training features.
    pub scaling: FeatureScaling,
    /// Rolling volatility window used for features.
    pub volatility_window: usize,
}

impl RegimeModel {
    /// Expected run length in samples, `1 / (1 - a_ii)`.
    pub fn expected_duration(&self, state: usize) -> f64 {
        let stay = self
            .transition_matrix
            .get(state)
            .and_then(|row| row.get(state))
            .copied()
            .unwrap_or(0.0)
            .min(1.0 - 1e-9);
        1.0 / (1.0 - stay)
    }

    /// Number of free parameters (initial, transition, means, variances).
    pub fn n_parameters(&self) -> usize {
        let k = self.n_states;
        let d = self.scaling.means.len();
        (k - 1) + k * (k - 1) + 2 * k * d
    }
}

/// State label for one timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeAssignment {
    /// Sample index.
    pub index: usize,
    /// Bucket start, when the series carries timestamps.
    pub timestamp: Option<DateTime<Utc>>,
    /// Decoded state.
    pub state_id: usize,
    /// Label of the decoded state.
    pub label: RegimeLabel,
    /// Expected run length of the state in samples.
    pub expected_duration: f64,
}

/// One-step-ahead regime outlook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeForecast {
    /// Most likely current state.
    pub current_state: usize,
    /// Its label.
    pub current_label: RegimeLabel,
    /// Next-step state distribution.
    pub next_state_probs: Vec<f64>,
    /// Posterior-weighted activity now.
    pub current_activity: f64,
    /// Expected activity at the next step.
    pub expected_activity: f64,
    /// Directional signal in [-1, 1].
    pub signal: f64,
    /// Probability of the most likely next state.
    pub confidence: f64,
}

/// Regime detection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeAnalysis {
    /// Fitted model.
    pub model: RegimeModel,
    /// Viterbi state per sample.
    pub state_sequence: Vec<usize>,
    /// One-step outlook from the end of the series.
    pub forecast: RegimeForecast,
}

// ============================================================================
// Pattern Matching Types
// ============================================================================

/// One historical analogue of the recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Start index of the historical window.
    pub offset: usize,
    /// Similarity in [0, 1], 1 = identical shape.
    pub similarity: f64,
    /// Banded DTW distance (RMS per step, z-space).
    pub distance: f64,
    /// Mean of the next `horizon` values minus the window mean, in window std units.
    pub subsequent_outcome: f64,
    /// Mean of the next `horizon` values minus the window's last value.
    pub raw_change: f64,
}

/// Analogue search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Start index of the query window.
    pub query_offset: usize,
    /// Window length.
    pub window_size: usize,
    /// Outcome horizon.
    pub horizon: usize,
    /// Matches, most similar first.
    pub matches: Vec<PatternMatch>,
    /// Similarity-weighted outcome in standardized units.
    pub weighted_outcome: f64,
    /// Forecast level over the horizon in activity units.
    pub forecast: f64,
    /// Fraction of matches whose outcome has the same sign as the weighted outcome.
    pub outcome_agreement: f64,
    /// Number of candidate windows scored.
    pub candidates_evaluated: usize,
}

impl MatchResult {
    /// Mean similarity of returned matches.
    pub fn mean_similarity(&self) -> f64 {
        stats::mean(&self.matches.iter().map(|m| m.similarity).collect::<Vec<_>>())
    }
}

// ============================================================================
// Validation Types
// ============================================================================

/// Reason a pattern was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Corrected p-value at or above alpha.
    NotSignificant,
    /// Walk-forward efficiency below the floor.
    LowWalkForwardEfficiency,
    /// Fewer occurrences than required.
    TooFewOccurrences,
    /// History shorter than required.
    ShortHistory,
    /// No profitable occurrence inside the confirmation window.
    NoRecentConfirmation,
}

/// Per-fold walk-forward metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldMetric {
    /// Fold number.
    pub fold: usize,
    /// In-sample excess return.
    pub in_sample: f64,
    /// Out-of-sample excess return.
    pub out_sample: f64,
}

/// Reliability sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReliabilityBreakdown {
    /// From the corrected p-value.
    pub significance: f64,
    /// From walk-forward efficiency.
    pub walk_forward: f64,
    /// From occurrence count.
    pub sample_size: f64,
    /// From days since last confirmation.
    pub recency: f64,
    /// From the share of positive out-of-sample folds.
    pub consistency: f64,
}

/// Statistical judgment on one candidate pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Hypothesis name.
    pub pattern: String,
    /// Larger of the t-test and chi-square p-values, uncorrected.
    pub p_value: f64,
    /// Bonferroni-corrected p-value.
    pub corrected_p_value: f64,
    /// Welch t-test p-value.
    pub t_p_value: f64,
    /// Chi-square win-rate p-value.
    pub chi_square_p_value: f64,
    /// Simultaneous tests used for the correction.
    pub n_tests: usize,
    /// Cohen's d of pattern vs baseline returns.
    pub effect_size: f64,
    /// Mean OOS metric over mean IS metric (0 when IS is not positive).
    pub walk_forward_efficiency: f64,
    /// 95% bootstrap interval of the mean pattern return.
    pub bootstrap_ci: (f64, f64),
    /// Mean signed pattern return.
    pub mean_return: f64,
    /// Mean signed baseline return.
    pub baseline_return: f64,
    /// Share of occurrences with a positive signed return.
    pub win_rate: f64,
    /// Evaluable occurrences over the full history.
    pub occurrences: usize,
    /// Days since the last profitable occurrence.
    pub days_since_confirmation: Option<f64>,
    /// History length in days.
    pub history_days: f64,
    /// Reliability sub-scores.
    pub sub_scores: ReliabilityBreakdown,
    /// Composite reliability in [0, 100].
    pub reliability_score: f64,
    /// Per-fold metrics in fold order.
    pub fold_metrics: Vec<FoldMetric>,
    /// Whether every gate passed.
    pub accepted: bool,
    /// Failed gates.
    pub rejection_reasons: Vec<RejectionReason>,
}

// ============================================================================
// Ensemble Types
// ============================================================================

/// Sub-model of the ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Spectral cycle projection.
    Fourier,
    /// Hidden-state regime outlook.
    Regime,
    /// DTW analogue forecast.
    Matcher,
}

impl ModelKind {
    /// All sub-models in vote order.
    pub const ALL: [ModelKind; 3] = [ModelKind::Fourier, ModelKind::Regime, ModelKind::Matcher];
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Fourier => write!(f, "fourier"),
            ModelKind::Regime => write!(f, "regime"),
            ModelKind::Matcher => write!(f, "matcher"),
        }
    }
}

/// Whether a sub-model produced a usable signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentStatus {
    /// Signal is usable.
    Ok,
    /// Excluded for lack of data.
    InsufficientData {
        /// Why.
        reason: String,
    },
    /// Excluded because the fit broke down numerically.
    Failed {
        /// Why.
        reason: String,
    },
}

/// One sub-model's vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSignal {
    /// Which sub-model.
    pub model: ModelKind,
    /// Usable or excluded.
    pub status: ComponentStatus,
    /// Directional view.
    pub direction: Direction,
    /// Signed strength in [-1, 1].
    pub signal: f64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Weight after renormalization (0 when excluded).
    pub weight: f64,
}

impl ModelSignal {
    /// Signal marking a sub-model excluded for insufficient data.
    pub fn insufficient(model: ModelKind, reason: impl Into<String>) -> Self {
        Self {
            model,
            status: ComponentStatus::InsufficientData {
                reason: reason.into(),
            },
            direction: Direction::Flat,
            signal: 0.0,
            confidence: 0.0,
            weight: 0.0,
        }
    }

    /// Signal marking a sub-model excluded after a numeric failure.
    pub fn failed(model: ModelKind, reason: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Failed {
                reason: reason.into(),
            },
            ..Self::insufficient(model, "")
        }
    }

    /// Whether this signal takes part in the vote.
    pub fn is_usable(&self) -> bool {
        matches!(self.status, ComponentStatus::Ok)
    }
}

/// Terminal status of an ensemble run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictionStatus {
    /// At least one sub-model contributed.
    Ok,
    /// No sub-model had enough data.
    InsufficientData,
}

/// Recent-vs-history activity outlier check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierCheck {
    /// Mean of the recent window.
    pub recent_mean: f64,
    /// Mean of the preceding history.
    pub historical_mean: f64,
    /// Standard deviation of the preceding history.
    pub historical_std: f64,
    /// Standardized difference.
    pub z_score: f64,
    /// `|z_score|` above the threshold.
    pub is_outlier: bool,
}

/// Why the anomaly flag was raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyReason {
    /// Confident sub-models disagree.
    ContradictorySignals {
        /// Model agreement at the time.
        agreement: f64,
        /// Number of high-confidence sub-models.
        confident_models: usize,
    },
    /// Recent activity is a statistical outlier.
    ActivityOutlier {
        /// Observed z-score.
        z_score: f64,
    },
}

/// Combined per-entity forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePrediction {
    /// OK or INSUFFICIENT_DATA.
    pub status: PredictionStatus,
    /// Weighted-vote direction.
    pub direction: Direction,
    /// Weighted confidence times agreement, in [0, 1].
    pub confidence: f64,
    /// Share of contributing sub-models whose direction matches the majority.
    pub model_agreement: f64,
    /// Weights of contributing sub-models, summing to 1.
    pub contributing_weights: BTreeMap<ModelKind, f64>,
    /// Anomaly flag.
    pub anomaly: bool,
    /// Reasons behind the anomaly flag.
    pub anomaly_reasons: Vec<AnomalyReason>,
    /// Per-model votes.
    pub signals: Vec<ModelSignal>,
    /// Outlier check, when the series is long enough.
    pub outlier: Option<OutlierCheck>,
    /// Cycle detector output.
    pub cycles: ComponentResult<CycleAnalysis>,
    /// Regime detector output.
    pub regime: ComponentResult<RegimeAnalysis>,
    /// Pattern matcher output.
    pub matches: ComponentResult<MatchResult>,
    /// Validator judgments of the cycle and analogue patterns.
    pub validations: Vec<ValidationResult>,
    /// Fingerprint of the analysed series.
    pub series_fingerprint: Option<String>,
    /// Fingerprint of the configuration.
    pub config_fingerprint: String,
}
