//! Statistical validation of candidate patterns.
//!
//! A pattern is a rule that marks occurrence indices and predicts a signed
//! move over the following `horizon` samples. The validator measures it three
//! ways:
//!
//! - walk-forward: calibrate on one segment, evaluate on the next, and compare
//!   out-of-sample excess return with in-sample excess return;
//! - significance over the full history: Welch t-test of pattern returns
//!   against all other indices and a chi-square test of the win rate, the
//!   larger p-value Bonferroni-corrected for the number of simultaneous tests;
//! - a bootstrap interval of the mean pattern return.
//!
//! Sub-scores are mapped onto [0, 1] and combined into a 0-100 reliability
//! score. Rejection is a result, never an error.

use std::f64::consts::PI;
use std::ops::Range;
use std::time::Instant;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};
use tracing::debug;

use crate::config::ValidationConfig;
use crate::messages::{PatternValidationInput, PatternValidationOutput};
use crate::stats::{self, FLAT_EPS};
use crate::types::{
    ActivitySeries, CyclePattern, Direction, FoldMetric, Frequency, MatchResult,
    ReliabilityBreakdown, RejectionReason, ValidationResult,
};
use tradekernel_core::{
    domain::Domain,
    error::{KernelError, Result},
    kernel::KernelMetadata,
    runtime::WorkerPool,
    traits::{run_blocking, AnalyticsKernel, BatchKernel},
};

// ============================================================================
// Hypotheses
// ============================================================================

/// A candidate pattern under test.
///
/// `occurrences` may learn from `calibration` but must only return indices
/// inside `evaluation`.
pub trait PatternHypothesis: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    /// Samples after an occurrence over which the move is measured.
    fn horizon(&self) -> usize;

    /// Predicted move. `Flat` is scored as `Up`.
    fn direction(&self) -> Direction;

    /// Occurrence indices inside `evaluation`.
    fn occurrences(
        &self,
        values: &[f64],
        calibration: Range<usize>,
        evaluation: Range<usize>,
    ) -> Vec<usize>;
}

/// When a scheduled pattern fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Every `period` samples from `anchor`, rounded to the nearest index.
    Periodic {
        /// First firing position in samples (may be fractional).
        anchor: f64,
        /// Spacing in samples.
        period: f64,
    },
    /// A fixed list of indices.
    Explicit(Vec<usize>),
}

/// Pattern with a fixed firing schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPattern {
    /// Display name.
    pub name: String,
    /// Outcome horizon in samples.
    pub horizon: usize,
    /// Predicted move.
    pub direction: Direction,
    /// Firing schedule.
    pub schedule: Schedule,
}

impl ScheduledPattern {
    /// Create a scheduled pattern.
    pub fn new(
        name: impl Into<String>,
        horizon: usize,
        direction: Direction,
        schedule: Schedule,
    ) -> Self {
        Self {
            name: name.into(),
            horizon,
            direction,
            schedule,
        }
    }

    /// "Activity rises out of each cycle trough" over a quarter period.
    pub fn from_cycle(cycle: &CyclePattern, frequency: Frequency) -> Self {
        let period = cycle.period_samples(frequency);
        let omega = 2.0 * PI / period;
        let anchor = ((PI - cycle.phase) / omega).rem_euclid(period);
        Self::new(
            format!("cycle {:.1}d trough", cycle.period_days),
            ((period / 4.0).round() as usize).max(1),
            Direction::Up,
            Schedule::Periodic { anchor, period },
        )
    }

    /// "What followed each analogue follows its end".
    pub fn from_matches(result: &MatchResult) -> Self {
        let direction = if result.weighted_outcome >= 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };
        let mut indices: Vec<usize> = result
            .matches
            .iter()
            .map(|m| m.offset + result.window_size - 1)
            .collect();
        indices.sort_unstable();
        Self::new(
            format!("analogue {}x{}", result.window_size, result.horizon),
            result.horizon,
            direction,
            Schedule::Explicit(indices),
        )
    }
}

impl PatternHypothesis for ScheduledPattern {
    fn name(&self) -> &str {
        &self.name
    }

    fn horizon(&self) -> usize {
        self.horizon
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn occurrences(
        &self,
        _values: &[f64],
        _calibration: Range<usize>,
        evaluation: Range<usize>,
    ) -> Vec<usize> {
        match &self.schedule {
            Schedule::Explicit(indices) => indices
                .iter()
                .copied()
                .filter(|i| evaluation.contains(i))
                .collect(),
            Schedule::Periodic { anchor, period } => {
                if !(period.is_finite() && anchor.is_finite()) || *period < 1.0 {
                    return Vec::new();
                }
                let first = ((evaluation.start as f64 - anchor) / period).floor() - 1.0;
                let mut out = Vec::new();
                let mut m = first;
                loop {
                    let pos = (anchor + m * period).round();
                    if pos >= evaluation.end as f64 {
                        break;
                    }
                    if pos >= evaluation.start as f64 {
                        let i = pos as usize;
                        if out.last() != Some(&i) {
                            out.push(i);
                        }
                    }
                    m += 1.0;
                }
                out
            }
        }
    }
}

// ============================================================================
// Pattern Validation Kernel
// ============================================================================

/// Walk-forward and significance validation kernel.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    metadata: KernelMetadata,
    pool: WorkerPool,
}

impl Default for PatternValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed returns at occurrences and at every other evaluable index.
struct Returns {
    pattern: Vec<(usize, f64)>,
    baseline: Vec<f64>,
}

impl Returns {
    fn collect(
        values: &[f64],
        hypothesis: &dyn PatternHypothesis,
        calibration: Range<usize>,
        evaluation: Range<usize>,
    ) -> Self {
        let h = hypothesis.horizon();
        let sign = match hypothesis.direction() {
            Direction::Down => -1.0,
            _ => 1.0,
        };
        let end = evaluation.end.min(values.len());
        let ret = |i: usize| sign * (stats::mean(&values[i + 1..=i + h]) - values[i]);

        let mut occurrences = hypothesis.occurrences(values, calibration, evaluation.clone());
        occurrences.sort_unstable();
        occurrences.dedup();

        let mut is_occurrence = vec![false; end.saturating_sub(evaluation.start)];
        let pattern = occurrences
            .into_iter()
            .filter(|&i| i >= evaluation.start && i + h < end)
            .map(|i| {
                is_occurrence[i - evaluation.start] = true;
                (i, ret(i))
            })
            .collect();
        let baseline = (evaluation.start..end)
            .filter(|&i| i + h < end && !is_occurrence[i - evaluation.start])
            .map(ret)
            .collect();

        Self { pattern, baseline }
    }

    fn pattern_values(&self) -> Vec<f64> {
        self.pattern.iter().map(|(_, r)| *r).collect()
    }

    /// Mean pattern return over baseline; 0 without occurrences.
    fn excess(&self) -> f64 {
        if self.pattern.is_empty() {
            return 0.0;
        }
        stats::mean(&self.pattern_values()) - stats::mean(&self.baseline)
    }
}

impl PatternValidator {
    /// Create a new validator on the global pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: KernelMetadata::batch("validation/walk-forward", Domain::StatisticalValidation)
                .with_description("Walk-forward, significance and bootstrap pattern validation")
                .with_throughput(200)
                .with_latency_us(20_000.0)
                .with_parallel(true),
            pool: WorkerPool::global(),
        }
    }

    /// Use a dedicated worker pool for folds and resamples.
    #[must_use]
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    /// Validate one hypothesis against `series`.
    ///
    /// `n_tests` is the number of simultaneous hypotheses for the Bonferroni
    /// correction.
    pub fn validate(
        series: &ActivitySeries,
        hypothesis: &dyn PatternHypothesis,
        config: &ValidationConfig,
        n_tests: usize,
        seed: u64,
        pool: &WorkerPool,
    ) -> Result<ValidationResult> {
        let k = config.num_folds;
        if k < 2 {
            return Err(KernelError::invalid_config(format!(
                "num_folds must be >= 2, got {k}"
            )));
        }
        let h = hypothesis.horizon();
        if h == 0 {
            return Err(KernelError::invalid_config("pattern horizon must be >= 1"));
        }
        let values = &series.values;
        let n = values.len();
        let segment = n / (k + 1);
        if segment < h + 2 {
            return Err(KernelError::insufficient_data(
                "walk-forward validation",
                (k + 1) * (h + 2),
                n,
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(KernelError::validation("validator: non-finite activity"));
        }

        let fold_metrics: Vec<FoldMetric> = pool.map_indexed(k, |fold| {
            let is = fold * segment..(fold + 1) * segment;
            let oos = (fold + 1) * segment..(fold + 2) * segment;
            FoldMetric {
                fold,
                in_sample: Returns::collect(values, hypothesis, is.clone(), is.clone()).excess(),
                out_sample: Returns::collect(values, hypothesis, is, oos).excess(),
            }
        });

        let mean_is = stats::mean(&fold_metrics.iter().map(|f| f.in_sample).collect::<Vec<_>>());
        let mean_oos = stats::mean(&fold_metrics.iter().map(|f| f.out_sample).collect::<Vec<_>>());
        let walk_forward_efficiency = if mean_is > 0.0 { mean_oos / mean_is } else { 0.0 };
        let consistency =
            fold_metrics.iter().filter(|f| f.out_sample > 0.0).count() as f64 / k as f64;

        let full = Returns::collect(values, hypothesis, 0..n, 0..n);
        let pattern = full.pattern_values();
        let t_p_value = welch_p_value(&pattern, &full.baseline);
        let wins = pattern.iter().filter(|r| **r > 0.0).count();
        let chi_square_p_value = win_rate_p_value(wins, pattern.len());
        let p_value = t_p_value.max(chi_square_p_value);
        let n_tests = n_tests.max(1);
        let corrected_p_value = (p_value * n_tests as f64).min(1.0);

        let bootstrap_ci = bootstrap_mean_ci(&pattern, config.bootstrap_iterations, seed, pool);

        let dps = series.days_per_sample();
        let history_days = n as f64 * dps;
        let days_since_confirmation = full
            .pattern
            .iter()
            .rev()
            .find(|(_, r)| *r > 0.0)
            .map(|(i, _)| (n - 1 - i) as f64 * dps);

        let m = &config.mappings;
        let sub_scores = ReliabilityBreakdown {
            significance: m
                .significance
                .apply(-corrected_p_value.max(f64::MIN_POSITIVE).log10()),
            walk_forward: m.walk_forward.apply(walk_forward_efficiency),
            sample_size: m.sample_size.apply(pattern.len() as f64),
            recency: m
                .recency
                .apply(days_since_confirmation.unwrap_or(f64::INFINITY)),
            consistency: m.consistency.apply(consistency),
        };
        let w = &config.weights;
        let reliability_score = 100.0
            * (w.significance * sub_scores.significance
                + w.walk_forward * sub_scores.walk_forward
                + w.sample_size * sub_scores.sample_size
                + w.recency * sub_scores.recency
                + w.consistency * sub_scores.consistency)
            / w.total();

        let mut rejection_reasons = Vec::new();
        if corrected_p_value >= config.alpha {
            rejection_reasons.push(RejectionReason::NotSignificant);
        }
        if walk_forward_efficiency < config.min_wfe {
            rejection_reasons.push(RejectionReason::LowWalkForwardEfficiency);
        }
        if pattern.len() < config.min_occurrences {
            rejection_reasons.push(RejectionReason::TooFewOccurrences);
        }
        if history_days < config.min_history_days {
            rejection_reasons.push(RejectionReason::ShortHistory);
        }
        if days_since_confirmation.map_or(true, |d| d > config.confirmation_window_days) {
            rejection_reasons.push(RejectionReason::NoRecentConfirmation);
        }

        debug!(
            pattern = hypothesis.name(),
            occurrences = pattern.len(),
            corrected_p_value,
            walk_forward_efficiency,
            reliability_score,
            accepted = rejection_reasons.is_empty(),
            "Validated pattern"
        );

        Ok(ValidationResult {
            pattern: hypothesis.name().to_string(),
            p_value,
            corrected_p_value,
            t_p_value,
            chi_square_p_value,
            n_tests,
            effect_size: cohens_d(&pattern, &full.baseline),
            walk_forward_efficiency,
            bootstrap_ci,
            mean_return: stats::mean(&pattern),
            baseline_return: stats::mean(&full.baseline),
            win_rate: if pattern.is_empty() {
                0.0
            } else {
                wins as f64 / pattern.len() as f64
            },
            occurrences: pattern.len(),
            days_since_confirmation,
            history_days,
            sub_scores,
            reliability_score,
            fold_metrics,
            accepted: rejection_reasons.is_empty(),
            rejection_reasons,
        })
    }

    /// Validate several hypotheses as one family of tests.
    ///
    /// Uses `bonferroni_n_tests` when configured, otherwise the batch size.
    pub fn validate_batch(
        series: &ActivitySeries,
        hypotheses: &[&dyn PatternHypothesis],
        config: &ValidationConfig,
        seed: u64,
        pool: &WorkerPool,
    ) -> Result<Vec<ValidationResult>> {
        let n_tests = config.bonferroni_n_tests.unwrap_or(hypotheses.len());
        hypotheses
            .iter()
            .enumerate()
            .map(|(idx, hypothesis)| {
                let seed = seed.wrapping_add((idx as u64) << 32);
                Self::validate(series, *hypothesis, config, n_tests, seed, pool)
            })
            .collect()
    }
}

/// Two-sided Welch t-test p-value; 1 with fewer than two samples per side.
fn welch_p_value(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 2 || b.len() < 2 {
        return 1.0;
    }
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (va, vb) = (stats::variance(a) / na, stats::variance(b) / nb);
    let diff = stats::mean(a) - stats::mean(b);
    let se = (va + vb).sqrt();
    if se < FLAT_EPS {
        return if diff.abs() < FLAT_EPS { 1.0 } else { 0.0 };
    }
    let t = diff / se;
    let df = (va + vb).powi(2) / (va * va / (na - 1.0) + vb * vb / (nb - 1.0));
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Chi-square (1 df) p-value of `wins` against an even split.
fn win_rate_p_value(wins: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let losses = (total - wins) as f64;
    let chi = (wins as f64 - losses).powi(2) / total as f64;
    match ChiSquared::new(1.0) {
        Ok(dist) => (1.0 - dist.cdf(chi)).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Cohen's d with pooled standard deviation; 0 when undefined.
fn cohens_d(a: &[f64], b: &[f64]) -> f64 {
    let (na, nb) = (a.len() as f64, b.len() as f64);
    if na + nb < 3.0 || a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let pooled = (((na - 1.0) * stats::variance(a) + (nb - 1.0) * stats::variance(b))
        / (na + nb - 2.0))
        .sqrt();
    if pooled < FLAT_EPS {
        return 0.0;
    }
    (stats::mean(a) - stats::mean(b)) / pooled
}

/// 95% percentile bootstrap interval of the mean.
fn bootstrap_mean_ci(sample: &[f64], iterations: usize, seed: u64, pool: &WorkerPool) -> (f64, f64) {
    if sample.is_empty() || iterations == 0 {
        return (0.0, 0.0);
    }
    let mut means = pool.map_indexed(iterations, |b| {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(b as u64));
        let total: f64 = (0..sample.len())
            .map(|_| sample[rng.gen_range(0..sample.len())])
            .sum();
        total / sample.len() as f64
    });
    stats::sort_floats(&mut means);
    (
        stats::percentile_sorted(&means, 0.025),
        stats::percentile_sorted(&means, 0.975),
    )
}

impl AnalyticsKernel for PatternValidator {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchKernel<PatternValidationInput, PatternValidationOutput> for PatternValidator {
    async fn execute(&self, input: PatternValidationInput) -> Result<PatternValidationOutput> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let start = Instant::now();
            let hypotheses: Vec<&dyn PatternHypothesis> = input
                .patterns
                .iter()
                .map(|p| p as &dyn PatternHypothesis)
                .collect();
            let results =
                Self::validate_batch(&input.series, &hypotheses, &input.config, input.seed, &pool)?;
            Ok(PatternValidationOutput {
                results,
                compute_time_us: start.elapsed().as_micros() as u64,
            })
        })
        .await
    }

    fn validate_input(&self, input: &PatternValidationInput) -> Result<()> {
        if input.patterns.is_empty() {
            return Err(KernelError::validation("no patterns to validate"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PatternMatch;

    /// Daily series with a sharp dip every `period` days that then recovers.
    fn dip_series(n: usize, period: usize, seed: u64) -> ActivitySeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..n)
            .map(|t| {
                let base = 100.0 + (rng.gen::<f64>() - 0.5) * 10.0;
                if t % period == 0 {
                    base - 40.0
                } else {
                    base
                }
            })
            .collect();
        ActivitySeries::daily(values)
    }

    /// Learns the best-returning indices in calibration and replays their
    /// offsets in evaluation.
    struct Memorizer;

    impl PatternHypothesis for Memorizer {
        fn name(&self) -> &str {
            "memorizer"
        }

        fn horizon(&self) -> usize {
            3
        }

        fn direction(&self) -> Direction {
            Direction::Up
        }

        fn occurrences(
            &self,
            values: &[f64],
            calibration: Range<usize>,
            evaluation: Range<usize>,
        ) -> Vec<usize> {
            let end = calibration.end.saturating_sub(4);
            let winners: Vec<usize> = (calibration.start..end)
                .filter(|&i| stats::mean(&values[i + 1..=i + 3]) - values[i] > 3.0)
                .map(|i| i - calibration.start)
                .collect();
            winners
                .into_iter()
                .map(|offset| evaluation.start + offset)
                .filter(|i| evaluation.contains(i))
                .collect()
        }
    }

    fn config() -> ValidationConfig {
        ValidationConfig {
            bootstrap_iterations: 200,
            ..ValidationConfig::default()
        }
    }

    #[test]
    fn test_validator_metadata() {
        let kernel = PatternValidator::new();
        assert_eq!(kernel.metadata().id, "validation/walk-forward");
        assert_eq!(kernel.metadata().domain, Domain::StatisticalValidation);
    }

    #[test]
    fn test_periodic_schedule() {
        let pattern = ScheduledPattern::new(
            "every 10",
            2,
            Direction::Up,
            Schedule::Periodic {
                anchor: 3.0,
                period: 10.0,
            },
        );
        assert_eq!(pattern.occurrences(&[], 0..0, 0..40), vec![3, 13, 23, 33]);
        assert_eq!(pattern.occurrences(&[], 0..0, 15..40), vec![23, 33]);

        let explicit = ScheduledPattern::new("x", 1, Direction::Down, Schedule::Explicit(vec![1, 5, 9]));
        assert_eq!(explicit.occurrences(&[], 0..0, 2..9), vec![5]);
    }

    #[test]
    fn test_from_cycle_anchors_on_trough() {
        // x = 10 cos(2π t / 20 + π/2) = -10 sin(2π t / 20): troughs at t = 5, 25, 45.
        let cycle = CyclePattern {
            period_days: 20.0,
            strength: 0.8,
            phase: PI / 2.0,
            amplitude: 10.0,
            confidence_interval: (19.0, 21.0),
            confidence: 1.0,
            band: crate::types::CycleBand::Other,
        };
        let pattern = ScheduledPattern::from_cycle(&cycle, Frequency::Daily);
        assert_eq!(pattern.horizon, 5);
        assert_eq!(pattern.direction, Direction::Up);
        assert_eq!(pattern.occurrences(&[], 0..0, 0..50), vec![5, 25, 45]);
    }

    #[test]
    fn test_from_matches() {
        let result = MatchResult {
            query_offset: 100,
            window_size: 10,
            horizon: 4,
            matches: vec![
                PatternMatch {
                    offset: 50,
                    similarity: 0.9,
                    distance: 0.1,
                    subsequent_outcome: -1.0,
                    raw_change: -2.0,
                },
                PatternMatch {
                    offset: 20,
                    similarity: 0.8,
                    distance: 0.2,
                    subsequent_outcome: -0.5,
                    raw_change: -1.0,
                },
            ],
            weighted_outcome: -0.76,
            forecast: 9.0,
            outcome_agreement: 1.0,
            candidates_evaluated: 81,
        };
        let pattern = ScheduledPattern::from_matches(&result);
        assert_eq!(pattern.direction, Direction::Down);
        assert_eq!(pattern.schedule, Schedule::Explicit(vec![29, 59]));
    }

    #[test]
    fn test_real_pattern_accepted() {
        let series = dip_series(1200, 20, 1);
        let pattern = ScheduledPattern::new(
            "dip rebound",
            3,
            Direction::Up,
            Schedule::Periodic {
                anchor: 0.0,
                period: 20.0,
            },
        );
        let result =
            PatternValidator::validate(&series, &pattern, &config(), 1, 42, &WorkerPool::global())
                .unwrap();

        assert!(result.accepted, "rejected: {:?}", result.rejection_reasons);
        assert!(result.corrected_p_value < 0.05);
        assert!(result.walk_forward_efficiency > 0.5);
        assert!(result.effect_size > 1.0);
        assert!(result.bootstrap_ci.0 <= result.mean_return);
        assert!(result.bootstrap_ci.1 >= result.mean_return);
        assert!(result.reliability_score > 60.0 && result.reliability_score <= 100.0);
        assert_eq!(result.fold_metrics.len(), 5);
        assert_eq!(result.win_rate, 1.0);
    }

    #[test]
    fn test_memorizer_rejected() {
        let series = dip_series(1200, 1_000_000, 2);
        let result =
            PatternValidator::validate(&series, &Memorizer, &config(), 1, 42, &WorkerPool::global())
                .unwrap();

        // Memorized winners look perfect on the data they were picked from.
        assert!(result.fold_metrics.iter().all(|f| f.in_sample > 0.0));
        assert!(!result.accepted);
        assert!(result
            .rejection_reasons
            .contains(&RejectionReason::LowWalkForwardEfficiency));
    }

    #[test]
    fn test_bonferroni_and_gates() {
        let series = dip_series(400, 20, 3);
        let pattern = ScheduledPattern::new(
            "dip",
            3,
            Direction::Up,
            Schedule::Periodic {
                anchor: 0.0,
                period: 20.0,
            },
        );
        let cfg = ValidationConfig {
            bonferroni_n_tests: Some(50),
            ..config()
        };
        let hypotheses: [&dyn PatternHypothesis; 2] = [&pattern, &pattern];
        let results =
            PatternValidator::validate_batch(&series, &hypotheses, &cfg, 7, &WorkerPool::global())
                .unwrap();
        assert_eq!(results.len(), 2);
        let r = &results[0];
        assert_eq!(r.n_tests, 50);
        assert!((r.corrected_p_value - (r.p_value * 50.0).min(1.0)).abs() < 1e-12);
        assert!(r.rejection_reasons.contains(&RejectionReason::ShortHistory));
        assert!(!r.accepted);
        // Seeds only move the bootstrap interval.
        assert_eq!(results[0].p_value, results[1].p_value);
    }

    #[test]
    fn test_insufficient_and_invalid() {
        let series = dip_series(30, 10, 1);
        let pattern = ScheduledPattern::new("p", 5, Direction::Up, Schedule::Explicit(vec![1]));
        let pool = WorkerPool::global();
        assert!(PatternValidator::validate(&series, &pattern, &config(), 1, 1, &pool)
            .unwrap_err()
            .is_insufficient_data());

        let bad = ValidationConfig {
            num_folds: 1,
            ..config()
        };
        assert!(matches!(
            PatternValidator::validate(&series, &pattern, &bad, 1, 1, &pool),
            Err(KernelError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_no_occurrences() {
        let series = dip_series(600, 1_000_000, 4);
        let pattern = ScheduledPattern::new("never", 3, Direction::Up, Schedule::Explicit(vec![]));
        let result =
            PatternValidator::validate(&series, &pattern, &config(), 1, 1, &WorkerPool::global())
                .unwrap();
        assert_eq!(result.occurrences, 0);
        assert_eq!(result.bootstrap_ci, (0.0, 0.0));
        assert_eq!(result.p_value, 1.0);
        assert!(result.days_since_confirmation.is_none());
        assert!(!result.accepted);
    }

    #[test]
    fn test_statistics() {
        assert_eq!(welch_p_value(&[1.0], &[1.0, 2.0]), 1.0);
        assert!(welch_p_value(&[10.0, 11.0, 12.0, 10.5], &[0.0, 1.0, -1.0, 0.5]) < 0.01);
        assert!((win_rate_p_value(5, 10) - 1.0).abs() < 1e-12);
        assert!(win_rate_p_value(20, 20) < 1e-4);
        assert_eq!(cohens_d(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
        assert!((cohens_d(&[2.0, 4.0], &[0.0, 2.0]) - 2.0_f64 / 2.0_f64.sqrt()).abs() < 1e-12);
    }
}
