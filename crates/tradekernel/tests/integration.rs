//! Integration tests for TradeKernel
//!
//! End-to-end scenarios across the series builder, the three detectors, the
//! validator and the ensemble.

use std::f64::consts::PI;
use std::ops::Range;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tradekernel::core::error::KernelError;
use tradekernel::core::registry::KernelRegistry;
use tradekernel::core::runtime::WorkerPool;
use tradekernel::core::traits::{BatchKernel, ExecutionContext};
use tradekernel::temporal::{
    config::{AnalysisConfig, CycleConfig, MatcherConfig, RegimeConfig, ValidationConfig},
    cycles::CycleDetection,
    ensemble::EnsemblePredictor,
    matching::PatternMatcher,
    messages::EnsemblePredictionInput,
    regime::RegimeDetector,
    stats,
    types::{
        ActivityEvent, ActivitySeries, ComponentStatus, Direction, ModelKind, PredictionStatus,
        RejectionReason,
    },
    validation::{PatternHypothesis, PatternValidator},
};

// ============================================================================
// Helpers
// ============================================================================

/// Standard normal draws via Box-Muller.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn white_noise(n: usize, seed: u64) -> ActivitySeries {
    let mut rng = StdRng::seed_from_u64(seed);
    ActivitySeries::daily((0..n).map(|_| 100.0 + 5.0 * gaussian(&mut rng)).collect())
}

/// Blocks of 70 samples cycling through three activity levels.
fn three_levels(n: usize, seed: u64) -> ActivitySeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let values = (0..n)
        .map(|t| [30.0, 60.0, 90.0][(t / 70) % 3] + 3.0 * gaussian(&mut rng))
        .collect();
    ActivitySeries::daily(values)
}

fn daily_events(values: &[f64]) -> Vec<ActivityEvent> {
    let start = DateTime::<Utc>::from_timestamp(1_600_000_000, 0).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(d, &v)| ActivityEvent::new(start + Duration::days(d as i64), v))
        .collect()
}

// ============================================================================
// Catalog and Registry
// ============================================================================

#[test]
fn test_catalog_domains() {
    let domains = tradekernel::catalog::domains();
    assert_eq!(domains.len(), 5);
    for domain in &domains {
        assert!(!domain.name.is_empty());
        assert!(!domain.description.is_empty());
        assert!(domain.kernel_count > 0, "{} has no kernels", domain.name);
    }
    assert_eq!(tradekernel::catalog::total_kernel_count(), 7);
}

#[test]
fn test_register_all() {
    let registry = KernelRegistry::new();
    tradekernel::register_all(&registry).unwrap();
    for id in [
        "temporal/series-builder",
        "temporal/cycle-detection",
        "temporal/outlier-check",
        "regime/hmm-detection",
        "matching/dtw-analogues",
        "validation/walk-forward",
        "ensemble/prediction",
    ] {
        assert!(registry.contains(id), "missing {id}");
    }
    assert_eq!(registry.stats().stateful_kernels, 1);
}

// ============================================================================
// Cyclical Detector
// ============================================================================

#[test]
fn test_recovers_ninety_day_cycle() {
    let mut rng = StdRng::seed_from_u64(90);
    let values: Vec<f64> = (0..800)
        .map(|t| 50.0 + 5.0 * (2.0 * PI * t as f64 / 90.0).sin() + gaussian(&mut rng))
        .collect();
    let series = ActivitySeries::daily(values);

    let analysis =
        CycleDetection::compute(&series, &CycleConfig::default(), 42, &WorkerPool::global())
            .unwrap();
    let top = &analysis.cycles[0];
    assert!(
        (81.0..=99.0).contains(&top.period_days),
        "period {}",
        top.period_days
    );
    assert!(top.strength > 0.5, "strength {}", top.strength);
    assert!(analysis.forecast.is_some());
}

#[test]
fn test_noise_has_no_cycles() {
    let config = CycleConfig {
        n_surrogates: 50,
        ..CycleConfig::default()
    };
    for seed in 0..5 {
        let series = white_noise(730, seed);
        let analysis =
            CycleDetection::compute(&series, &config, seed, &WorkerPool::global()).unwrap();
        assert!(
            analysis
                .cycles
                .iter()
                .all(|c| c.strength < config.min_strength),
            "seed {seed} produced {:?}",
            analysis.cycles
        );
    }
}

// ============================================================================
// Regime Detector
// ============================================================================

#[test]
fn test_regime_requires_fit() {
    let series = three_levels(300, 1);
    let mut detector = RegimeDetector::new(RegimeConfig {
        n_states: 3,
        ..RegimeConfig::default()
    })
    .unwrap();
    assert!(matches!(
        detector.predict(&series),
        Err(KernelError::NotFitted(_))
    ));

    detector.fit(&series).unwrap();
    assert!(detector.predict(&series).is_ok());
    assert!(detector.decode(&series).is_ok());
}

#[test]
fn test_transition_rows_are_stochastic() {
    for (seed, n_states) in [(1, 2), (2, 3), (3, 2), (4, 3)] {
        let mut detector = RegimeDetector::new(RegimeConfig {
            n_states,
            ..RegimeConfig::default()
        })
        .unwrap();
        let model = detector.fit(&three_levels(500, seed)).unwrap();
        for row in &model.transition_matrix {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-6);
        }
    }
}

#[test]
fn test_two_state_centroids_separate() {
    let mut rng = StdRng::seed_from_u64(11);
    let values: Vec<f64> = (0..600)
        .map(|t| {
            let level = if (t / 100) % 2 == 0 { 40.0 } else { 160.0 };
            level + 4.0 * gaussian(&mut rng)
        })
        .collect();
    let mut detector = RegimeDetector::new(RegimeConfig {
        n_states: 2,
        ..RegimeConfig::default()
    })
    .unwrap();
    let model = detector.fit(&ActivitySeries::daily(values)).unwrap();

    let separated = (0..model.state_centroids[0].len()).any(|f| {
        let gap = (model.state_centroids[0][f] - model.state_centroids[1][f]).abs();
        let spread = model.state_variances[0][f]
            .max(model.state_variances[1][f])
            .sqrt();
        gap > 2.0 * spread
    });
    assert!(separated, "centroids {:?}", model.state_centroids);
}

// ============================================================================
// Pattern Matcher
// ============================================================================

#[test]
fn test_finds_analogue_at_offset_400() {
    let mut rng = StdRng::seed_from_u64(400);
    let mut values: Vec<f64> = (0..1000).map(|_| 100.0 + 10.0 * gaussian(&mut rng)).collect();
    let motif: Vec<f64> = (0..30)
        .map(|i| 100.0 + 40.0 * (i as f64 / 5.0).sin() + 15.0 * (i as f64 / 2.0).cos())
        .collect();
    for (i, m) in motif.iter().enumerate() {
        values[400 + i] = m + 0.3 * gaussian(&mut rng);
        values[970 + i] = m + 0.3 * gaussian(&mut rng);
    }

    let result = PatternMatcher::compute(
        &ActivitySeries::daily(values),
        &MatcherConfig::default(),
        &WorkerPool::global(),
    )
    .unwrap();
    assert_eq!(result.matches[0].offset, 400);
    assert!(result.matches[0].similarity > 0.9);
}

#[test]
fn test_matcher_bounds() {
    let series = white_noise(400, 5);
    for top_k in [1, 3, 8] {
        let config = MatcherConfig {
            top_k,
            ..MatcherConfig::default()
        };
        let result = PatternMatcher::compute(&series, &config, &WorkerPool::global()).unwrap();
        assert!(result.matches.len() <= top_k);
        assert!(result
            .matches
            .iter()
            .all(|m| (0.0..=1.0).contains(&m.similarity)));
        assert!(result
            .matches
            .windows(2)
            .all(|p| p[0].similarity >= p[1].similarity));
    }
}

#[test]
fn test_matcher_length_boundary() {
    let config = MatcherConfig::default();
    let w = config.window_size;
    let short = white_noise(2 * w - 1, 6);
    assert!(
        PatternMatcher::compute(&short, &config, &WorkerPool::global())
            .unwrap_err()
            .is_insufficient_data()
    );
    let exact = white_noise(2 * w, 6);
    assert!(PatternMatcher::compute(&exact, &config, &WorkerPool::global()).is_ok());
}

// ============================================================================
// Validator
// ============================================================================

/// Picks the indices that happened to rise in calibration and bets on the
/// same offsets later.
struct NoiseMemorizer;

impl PatternHypothesis for NoiseMemorizer {
    fn name(&self) -> &str {
        "noise memorizer"
    }

    fn horizon(&self) -> usize {
        2
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
        let end = calibration.end.saturating_sub(3);
        (calibration.start..end)
            .filter(|&i| stats::mean(&values[i + 1..=i + 2]) - values[i] > 5.0)
            .map(|i| evaluation.start + (i - calibration.start))
            .filter(|i| evaluation.contains(i))
            .collect()
    }
}

#[test]
fn test_memorized_noise_is_rejected() {
    let series = white_noise(1500, 21);
    let config = ValidationConfig {
        bootstrap_iterations: 200,
        ..ValidationConfig::default()
    };
    let result = PatternValidator::validate(
        &series,
        &NoiseMemorizer,
        &config,
        1,
        42,
        &WorkerPool::global(),
    )
    .unwrap();

    assert!(result.fold_metrics.iter().all(|f| f.in_sample > 0.0));
    assert!(result.walk_forward_efficiency < 0.5);
    assert!(!result.accepted);
    assert!(result
        .rejection_reasons
        .contains(&RejectionReason::LowWalkForwardEfficiency));
}

// ============================================================================
// Ensemble Predictor
// ============================================================================

#[test]
fn test_all_models_insufficient() {
    let series = ActivitySeries::daily(vec![
        10.0, 12.0, 9.0, 11.0, 10.0, 13.0, 8.0, 10.0, 11.0, 12.0, 9.0, 10.0,
    ]);
    let prediction =
        EnsemblePredictor::predict(&series, &AnalysisConfig::testing(), &WorkerPool::global())
            .unwrap();
    assert_eq!(prediction.status, PredictionStatus::InsufficientData);
    assert!(prediction.contributing_weights.is_empty());
    assert_eq!(prediction.confidence, 0.0);
    assert!(prediction
        .signals
        .iter()
        .all(|s| matches!(s.status, ComponentStatus::InsufficientData { .. })));
    assert!(!prediction.anomaly);
}

#[test]
fn test_weights_sum_over_usable_models() {
    // Long enough for cycles and regimes, too short for the matcher.
    let mut rng = StdRng::seed_from_u64(50);
    let values: Vec<f64> = (0..50)
        .map(|t| 100.0 + 20.0 * (2.0 * PI * t as f64 / 7.0).sin() + gaussian(&mut rng))
        .collect();
    let prediction = EnsemblePredictor::predict(
        &ActivitySeries::daily(values),
        &AnalysisConfig::testing(),
        &WorkerPool::global(),
    )
    .unwrap();

    assert!(prediction.matches.is_insufficient());
    assert!(!prediction
        .contributing_weights
        .contains_key(&ModelKind::Matcher));
    let usable: Vec<ModelKind> = prediction
        .signals
        .iter()
        .filter(|s| s.is_usable())
        .map(|s| s.model)
        .collect();
    assert!(!usable.is_empty());
    assert_eq!(prediction.contributing_weights.len(), usable.len());
    let total: f64 = prediction.contributing_weights.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_prediction_is_deterministic_across_thread_counts() {
    let mut rng = StdRng::seed_from_u64(7);
    let values: Vec<f64> = (0..900)
        .map(|t| {
            let level = if (t / 150) % 2 == 0 { 80.0 } else { 120.0 };
            level + 15.0 * (2.0 * PI * t as f64 / 30.0).sin() + 3.0 * gaussian(&mut rng)
        })
        .collect();
    let series = ActivitySeries::daily(values);
    let config = AnalysisConfig::testing();

    let single = EnsemblePredictor::predict(&series, &config, &WorkerPool::new(1).unwrap()).unwrap();
    let multi = EnsemblePredictor::predict(&series, &config, &WorkerPool::new(4).unwrap()).unwrap();
    assert_eq!(single, multi);
    assert_eq!(single.status, PredictionStatus::Ok);
}

#[test]
fn test_predict_from_events() {
    let mut rng = StdRng::seed_from_u64(3);
    let values: Vec<f64> = (0..400)
        .map(|t| 200.0 + 50.0 * (2.0 * PI * t as f64 / 30.0).sin() + 5.0 * gaussian(&mut rng))
        .collect();
    let mut events = daily_events(&values);
    events.reverse();

    let config = AnalysisConfig::testing();
    let prediction =
        EnsemblePredictor::predict_events(&events, &config, &WorkerPool::global()).unwrap();
    assert_eq!(prediction.status, PredictionStatus::Ok);
    assert!((0.0..=1.0).contains(&prediction.confidence));
    assert!((0.0..=1.0).contains(&prediction.model_agreement));
    assert_eq!(prediction.config_fingerprint, config.fingerprint());

    // The whole prediction survives a JSON round trip for the caller's cache.
    let json = serde_json::to_string(&prediction).unwrap();
    assert!(json.contains("\"status\""));
}

#[test]
fn test_invalid_configuration_propagates() {
    let mut config = AnalysisConfig::testing();
    config.regime.n_states = 12;
    let err = EnsemblePredictor::predict(&white_noise(300, 1), &config, &WorkerPool::global())
        .unwrap_err();
    assert!(matches!(err, KernelError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn test_execute_with_context() {
    let values: Vec<f64> = (0..300).map(|t| 40.0 + (t % 14) as f64).collect();
    let ctx = ExecutionContext::new().with_entity("entity-7");
    let output = EnsemblePredictor::new()
        .execute_with_context(
            &ctx,
            EnsemblePredictionInput::from_events(daily_events(&values), AnalysisConfig::testing()),
        )
        .await
        .unwrap();
    assert_eq!(output.result.status, PredictionStatus::Ok);
    assert!(output.result.series_fingerprint.is_some());
}

#[tokio::test]
async fn test_run_deadline_interrupts_ensemble() {
    let values: Vec<f64> = (0..1_095)
        .map(|t| 100.0 + 25.0 * (2.0 * PI * t as f64 / 30.0).sin())
        .collect();
    let ctx = ExecutionContext::new()
        .with_entity("entity-9")
        .with_timeout(std::time::Duration::from_micros(1));
    let err = EnsemblePredictor::new()
        .execute_with_context(
            &ctx,
            EnsemblePredictionInput::from_series(
                ActivitySeries::daily(values),
                AnalysisConfig::default(),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, KernelError::Timeout(_)));
}
