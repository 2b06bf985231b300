//! Ensemble prediction.
//!
//! Runs the cycle, regime and analogue models side by side, turns each into a
//! signed signal with a confidence, discounts patterns the validator rejects,
//! and combines the survivors with a weighted directional vote. A model
//! without enough data drops out of the vote and the remaining weights are
//! renormalized; only when every model drops out is the whole prediction
//! `INSUFFICIENT_DATA`.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AnalysisConfig, BaseWeights, EnsembleConfig, WeightPolicy};
use crate::cycles::CycleDetection;
use crate::matching::PatternMatcher;
use crate::messages::{EnsemblePredictionInput, EnsemblePredictionOutput, PredictionSource};
use crate::outlier::ActivityOutlierCheck;
use crate::regime::RegimeDetector;
use crate::series::SeriesBuilder;
use crate::stats::{self, FLAT_EPS};
use crate::types::{
    ActivityEvent, ActivitySeries, AnomalyReason, ComponentStatus, CycleAnalysis, Direction,
    EnsemblePrediction, MatchResult, ModelKind, ModelSignal, OutlierCheck, PredictionStatus,
    RegimeAnalysis, ValidationResult,
};
use crate::validation::{PatternHypothesis, PatternValidator, ScheduledPattern};
use tradekernel_core::{
    domain::Domain,
    error::{KernelError, Result},
    kernel::KernelMetadata,
    messages::ComponentResult,
    runtime::WorkerPool,
    traits::{run_blocking, AnalyticsKernel, BatchKernel},
};

/// Dead zone of the weighted vote.
const VOTE_EPS: f64 = 1e-9;

/// Outcome of the weighted vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleVote {
    /// OK when at least one model voted.
    pub status: PredictionStatus,
    /// Combined direction.
    pub direction: Direction,
    /// Weighted confidence times agreement.
    pub confidence: f64,
    /// Share of voting models whose direction matches the majority.
    pub model_agreement: f64,
    /// Final weights of voting models.
    pub contributing_weights: BTreeMap<ModelKind, f64>,
    /// Input signals with their final weights filled in.
    pub signals: Vec<ModelSignal>,
}

// ============================================================================
// Ensemble Prediction Kernel
// ============================================================================

/// Ensemble prediction kernel.
#[derive(Debug, Clone)]
pub struct EnsemblePredictor {
    metadata: KernelMetadata,
    pool: WorkerPool,
}

impl Default for EnsemblePredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl EnsemblePredictor {
    /// Create a new ensemble predictor on the global pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: KernelMetadata::batch("ensemble/prediction", Domain::EnsembleForecasting)
                .with_description("Weighted vote of cycle, regime and analogue models")
                .with_throughput(100)
                .with_latency_us(50_000.0)
                .with_parallel(true),
            pool: WorkerPool::global(),
        }
    }

    /// Use a dedicated worker pool.
    #[must_use]
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    /// Bucket `events` and predict.
    ///
    /// Too few buckets gives an `INSUFFICIENT_DATA` prediction; malformed
    /// events are an error.
    pub fn predict_events(
        events: &[ActivityEvent],
        config: &AnalysisConfig,
        pool: &WorkerPool,
    ) -> Result<EnsemblePrediction> {
        config.validate()?;
        match SeriesBuilder::compute(events, &config.series) {
            Ok(series) => Self::predict(&series, config, pool),
            Err(err @ KernelError::InsufficientData { .. }) => {
                info!(events = events.len(), %err, "Not enough history to predict");
                Ok(Self::insufficient(err.to_string(), config))
            }
            Err(err) => Err(err),
        }
    }

    /// Predict from an already built series.
    pub fn predict(
        series: &ActivitySeries,
        config: &AnalysisConfig,
        pool: &WorkerPool,
    ) -> Result<EnsemblePrediction> {
        config.validate()?;

        let (cycles, regime, matches) = pool.join3(
            || CycleDetection::compute(series, &config.cycles, config.seed, pool),
            || RegimeDetector::analyze(&config.regime, series),
            || PatternMatcher::compute(series, &config.matcher, pool),
        );
        let cycles = component(ModelKind::Fourier, cycles)?;
        let regime = component(ModelKind::Regime, regime)?;
        let matches = component(ModelKind::Matcher, matches)?;

        let eps = config.ensemble.direction_epsilon;
        let mut signals = vec![
            signal_for(ModelKind::Fourier, &cycles, |a| fourier_signal(a, series, eps)),
            signal_for(ModelKind::Regime, &regime, |a| regime_signal(a, eps)),
            signal_for(ModelKind::Matcher, &matches, |m| matcher_signal(m, eps)),
        ];

        let validations = if config.ensemble.validation_gate {
            Self::gate(series, config, pool, &cycles, &matches, &mut signals)?
        } else {
            Vec::new()
        };

        let vote = combine(signals, &config.ensemble);

        let outlier = match ActivityOutlierCheck::compute(
            series,
            config.ensemble.outlier_recent_window,
            config.ensemble.outlier_z_threshold,
        ) {
            Ok(check) => Some(check),
            Err(KernelError::InsufficientData { .. }) => None,
            Err(err) => return Err(err),
        };

        let anomaly_reasons = anomaly_reasons(&vote, outlier.as_ref(), &config.ensemble);

        info!(
            n = series.len(),
            direction = ?vote.direction,
            confidence = vote.confidence,
            agreement = vote.model_agreement,
            anomaly = !anomaly_reasons.is_empty(),
            "Ensemble prediction"
        );

        Ok(EnsemblePrediction {
            status: vote.status,
            direction: vote.direction,
            confidence: vote.confidence,
            model_agreement: vote.model_agreement,
            contributing_weights: vote.contributing_weights,
            anomaly: !anomaly_reasons.is_empty(),
            anomaly_reasons,
            signals: vote.signals,
            outlier,
            cycles,
            regime,
            matches,
            validations,
            series_fingerprint: Some(series.fingerprint()),
            config_fingerprint: config.fingerprint(),
        })
    }

    /// Validate the top cycle and the analogue cluster, and scale down the
    /// confidence of models whose pattern is rejected.
    fn gate(
        series: &ActivitySeries,
        config: &AnalysisConfig,
        pool: &WorkerPool,
        cycles: &ComponentResult<CycleAnalysis>,
        matches: &ComponentResult<MatchResult>,
        signals: &mut [ModelSignal],
    ) -> Result<Vec<ValidationResult>> {
        let mut patterns: Vec<(ModelKind, ScheduledPattern)> = Vec::new();
        if let Some(top) = cycles.value().and_then(|a| a.cycles.first()) {
            patterns.push((
                ModelKind::Fourier,
                ScheduledPattern::from_cycle(top, series.frequency),
            ));
        }
        if let Some(result) = matches.value().filter(|m| !m.matches.is_empty()) {
            patterns.push((ModelKind::Matcher, ScheduledPattern::from_matches(result)));
        }
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let hypotheses: Vec<&dyn PatternHypothesis> = patterns
            .iter()
            .map(|(_, p)| p as &dyn PatternHypothesis)
            .collect();
        let results = match PatternValidator::validate_batch(
            series,
            &hypotheses,
            &config.validation,
            config.seed,
            pool,
        ) {
            Ok(results) => results,
            Err(err @ KernelError::InsufficientData { .. }) => {
                debug!(%err, "Validation skipped");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        for ((kind, _), result) in patterns.iter().zip(&results) {
            discount_rejected(*kind, result, signals);
        }
        Ok(results)
    }

    fn insufficient(reason: String, config: &AnalysisConfig) -> EnsemblePrediction {
        EnsemblePrediction {
            status: PredictionStatus::InsufficientData,
            direction: Direction::Flat,
            confidence: 0.0,
            model_agreement: 0.0,
            contributing_weights: BTreeMap::new(),
            anomaly: false,
            anomaly_reasons: Vec::new(),
            signals: ModelKind::ALL
                .iter()
                .map(|&kind| ModelSignal::insufficient(kind, reason.clone()))
                .collect(),
            outlier: None,
            cycles: pending(&reason),
            regime: pending(&reason),
            matches: pending(&reason),
            validations: Vec::new(),
            series_fingerprint: None,
            config_fingerprint: config.fingerprint(),
        }
    }
}

/// Combine model signals with a weighted directional vote.
///
/// Only usable signals vote. Their base weights (scaled by confidence under
/// [`WeightPolicy::ConfidenceAdjusted`]) are renormalized to sum to one.
pub fn combine(signals: Vec<ModelSignal>, config: &EnsembleConfig) -> EnsembleVote {
    let mut signals = signals;
    for s in &mut signals {
        s.weight = 0.0;
    }

    let usable: Vec<usize> = (0..signals.len())
        .filter(|&i| signals[i].is_usable())
        .collect();
    if usable.is_empty() {
        return EnsembleVote {
            status: PredictionStatus::InsufficientData,
            direction: Direction::Flat,
            confidence: 0.0,
            model_agreement: 0.0,
            contributing_weights: BTreeMap::new(),
            signals,
        };
    }

    let base: Vec<f64> = usable
        .iter()
        .map(|&i| base_weight(&config.base_weights, signals[i].model))
        .collect();
    let mut raw = match config.weight_policy {
        WeightPolicy::Renormalize => base.clone(),
        WeightPolicy::ConfidenceAdjusted => usable
            .iter()
            .zip(&base)
            .map(|(&i, b)| b * signals[i].confidence.clamp(0.0, 1.0))
            .collect(),
    };
    if raw.iter().sum::<f64>() <= 0.0 {
        raw = base;
    }
    if raw.iter().sum::<f64>() <= 0.0 {
        raw = vec![1.0; usable.len()];
    }
    let total: f64 = raw.iter().sum();

    let mut contributing_weights = BTreeMap::new();
    for (&i, r) in usable.iter().zip(&raw) {
        signals[i].weight = r / total;
        contributing_weights.insert(signals[i].model, signals[i].weight);
    }

    let vote: f64 = usable
        .iter()
        .map(|&i| signals[i].weight * signals[i].direction.sign())
        .sum();
    let direction = Direction::from_signal(vote, VOTE_EPS);
    let model_agreement = majority_count(usable.iter().map(|&i| signals[i].direction)) as f64
        / usable.len() as f64;
    let weighted_confidence: f64 = usable
        .iter()
        .map(|&i| signals[i].weight * signals[i].confidence)
        .sum();

    EnsembleVote {
        status: PredictionStatus::Ok,
        direction,
        confidence: (weighted_confidence * model_agreement).clamp(0.0, 1.0),
        model_agreement,
        contributing_weights,
        signals,
    }
}

/// Size of the largest group of equal directions, counted unweighted.
fn majority_count(directions: impl Iterator<Item = Direction>) -> usize {
    let (mut up, mut down, mut flat) = (0, 0, 0);
    for direction in directions {
        match direction {
            Direction::Up => up += 1,
            Direction::Down => down += 1,
            Direction::Flat => flat += 1,
        }
    }
    up.max(down).max(flat)
}

/// Anomaly reasons for a finished vote: confident models that disagree, or
/// recent activity far outside its history.
fn anomaly_reasons(
    vote: &EnsembleVote,
    outlier: Option<&OutlierCheck>,
    config: &EnsembleConfig,
) -> Vec<AnomalyReason> {
    let mut reasons = Vec::new();
    let confident_models = vote
        .signals
        .iter()
        .filter(|s| s.is_usable() && s.confidence >= config.high_confidence)
        .count();
    if vote.status == PredictionStatus::Ok
        && confident_models >= 2
        && vote.model_agreement < config.anomaly_agreement_threshold
    {
        reasons.push(AnomalyReason::ContradictorySignals {
            agreement: vote.model_agreement,
            confident_models,
        });
    }
    if let Some(check) = outlier.filter(|c| c.is_outlier) {
        reasons.push(AnomalyReason::ActivityOutlier {
            z_score: check.z_score,
        });
    }
    reasons
}

/// Scale the confidence of `model`'s signal by the reliability of its
/// rejected pattern. Accepted patterns leave the signal unchanged.
fn discount_rejected(model: ModelKind, result: &ValidationResult, signals: &mut [ModelSignal]) {
    if result.accepted {
        return;
    }
    if let Some(signal) = signals.iter_mut().find(|s| s.model == model && s.is_usable()) {
        signal.confidence *= (result.reliability_score / 100.0).clamp(0.0, 1.0);
        debug!(
            model = %model,
            reliability = result.reliability_score,
            reasons = ?result.rejection_reasons,
            "Discounted rejected pattern"
        );
    }
}

fn pending<T>(reason: &str) -> ComponentResult<T> {
    ComponentResult::InsufficientData {
        reason: reason.to_string(),
    }
}

fn base_weight(weights: &BaseWeights, model: ModelKind) -> f64 {
    match model {
        ModelKind::Fourier => weights.fourier,
        ModelKind::Regime => weights.regime,
        ModelKind::Matcher => weights.matcher,
    }
}

/// Classify a sub-model result; insufficient data and numeric failure
/// exclude the model, anything else aborts the prediction.
fn component<T>(model: ModelKind, result: Result<T>) -> Result<ComponentResult<T>> {
    let result = match result {
        Err(err)
            if !err.is_insufficient_data() && !matches!(err, KernelError::NumericInstability(_)) =>
        {
            return Err(err)
        }
        other => other,
    };
    let classified = ComponentResult::from_result(result);
    match &classified {
        ComponentResult::InsufficientData { reason } => debug!(%model, %reason, "Model excluded"),
        ComponentResult::Error { message } => warn!(%model, %message, "Model failed"),
        ComponentResult::Ok(_) => {}
    }
    Ok(classified)
}

fn signal_for<T>(
    model: ModelKind,
    result: &ComponentResult<T>,
    build: impl FnOnce(&T) -> (f64, f64, Direction),
) -> ModelSignal {
    match result {
        ComponentResult::Ok(value) => {
            let (signal, confidence, direction) = build(value);
            ModelSignal {
                model,
                status: ComponentStatus::Ok,
                direction,
                signal,
                confidence: confidence.clamp(0.0, 1.0),
                weight: 0.0,
            }
        }
        ComponentResult::InsufficientData { reason } => ModelSignal::insufficient(model, reason),
        ComponentResult::Error { message } => ModelSignal::failed(model, message),
    }
}

fn fourier_signal(
    analysis: &CycleAnalysis,
    series: &ActivitySeries,
    eps: f64,
) -> (f64, f64, Direction) {
    let (Some(top), Some(forecast)) = (analysis.cycles.first(), analysis.forecast.as_ref()) else {
        return (0.0, 0.0, Direction::Flat);
    };
    let scale = series.std_dev();
    let signal = if scale < FLAT_EPS {
        0.0
    } else {
        ((stats::mean(&forecast.values) - analysis.last_fitted) / scale).tanh()
    };
    (
        signal,
        top.strength * top.confidence,
        Direction::from_signal(signal, eps),
    )
}

fn regime_signal(analysis: &RegimeAnalysis, eps: f64) -> (f64, f64, Direction) {
    let f = &analysis.forecast;
    (f.signal, f.confidence, Direction::from_signal(f.signal, eps))
}

fn matcher_signal(result: &MatchResult, eps: f64) -> (f64, f64, Direction) {
    let signal = result.weighted_outcome.tanh();
    (
        signal,
        result.mean_similarity() * result.outcome_agreement,
        Direction::from_signal(signal, eps),
    )
}

impl AnalyticsKernel for EnsemblePredictor {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchKernel<EnsemblePredictionInput, EnsemblePredictionOutput> for EnsemblePredictor {
    async fn execute(&self, input: EnsemblePredictionInput) -> Result<EnsemblePredictionOutput> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let start = Instant::now();
            let result = match &input.source {
                PredictionSource::Events(events) => {
                    Self::predict_events(events, &input.config, &pool)?
                }
                PredictionSource::Series(series) => Self::predict(series, &input.config, &pool)?,
            };
            Ok(EnsemblePredictionOutput {
                result,
                compute_time_us: start.elapsed().as_micros() as u64,
            })
        })
        .await
    }

    fn validate_input(&self, input: &EnsemblePredictionInput) -> Result<()> {
        input.config.validate()
    }
}
