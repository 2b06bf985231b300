//! Hidden Markov regime detection.
//!
//! Each sample is described by three standardized features: the activity
//! change, the rolling volatility of that change and the activity level. A
//! diagonal-Gaussian HMM is fitted with Baum-Welch, initialized by k-means,
//! and states are relabelled so that state 0 is the quietest. Fit, decode and
//! predict are separate operations on [`RegimeDetector`].

use std::f64::consts::PI;
use std::sync::RwLock;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::RegimeConfig;
use crate::messages::{RegimeDetectionInput, RegimeDetectionOutput};
use crate::stats::{self, FLAT_EPS};
use crate::types::{
    ActivitySeries, FeatureScaling, RegimeAnalysis, RegimeAssignment, RegimeForecast, RegimeLabel,
    RegimeModel,
};
use tradekernel_core::{
    domain::Domain,
    error::{KernelError, Result},
    kernel::KernelMetadata,
    traits::{run_blocking, AnalyticsKernel, BatchKernel},
};

/// Features per observation.
pub const N_FEATURES: usize = 3;

/// Smallest level used as a return denominator.
const RETURN_FLOOR: f64 = 1.0;

const VOLUME: usize = 2;
const PROB_FLOOR: f64 = 1e-10;
const MIN_OCCUPANCY: f64 = 1e-8;
const KMEANS_ITERATIONS: usize = 20;

type Features = Vec<[f64; N_FEATURES]>;

// ============================================================================
// Detector
// ============================================================================

/// Fit-then-predict regime detector.
#[derive(Debug, Clone)]
pub struct RegimeDetector {
    config: RegimeConfig,
    model: Option<RegimeModel>,
}

impl RegimeDetector {
    /// Create an unfitted detector.
    pub fn new(config: RegimeConfig) -> Result<Self> {
        if !(2..=8).contains(&config.n_states) {
            return Err(KernelError::invalid_config(format!(
                "n_states must be in [2, 8], got {}",
                config.n_states
            )));
        }
        if config.volatility_window < 2 {
            return Err(KernelError::invalid_config("volatility_window must be >= 2"));
        }
        if config.min_variance <= 0.0 || config.tolerance <= 0.0 {
            return Err(KernelError::invalid_config(
                "min_variance and tolerance must be > 0",
            ));
        }
        Ok(Self {
            config,
            model: None,
        })
    }

    /// Create a detector around an already fitted model.
    pub fn from_model(config: RegimeConfig, model: RegimeModel) -> Result<Self> {
        let mut detector = Self::new(config)?;
        detector.model = Some(model);
        Ok(detector)
    }

    /// Detector configuration.
    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Fitted model, if any.
    pub fn model(&self) -> Option<&RegimeModel> {
        self.model.as_ref()
    }

    /// Whether `fit` has succeeded.
    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    fn fitted(&self) -> Result<&RegimeModel> {
        self.model
            .as_ref()
            .ok_or_else(|| KernelError::not_fitted("regime detector: call fit() first"))
    }

    /// Minimum observations needed to fit.
    pub fn required_observations(&self) -> usize {
        self.config.min_observations.max(10 * self.config.n_states)
    }

    /// Fit the model with Baum-Welch.
    ///
    /// Non-convergence within `max_iter` is reported through
    /// `RegimeModel::converged` rather than as an error.
    pub fn fit(&mut self, series: &ActivitySeries) -> Result<&RegimeModel> {
        let n = series.len();
        let required = self.required_observations();
        if n < required {
            return Err(KernelError::insufficient_data("regime detector", required, n));
        }
        if series.values.iter().any(|v| !v.is_finite()) {
            return Err(KernelError::validation("regime detector: non-finite activity"));
        }

        let raw = raw_features(&series.values, self.config.volatility_window);
        let scaling = fit_scaling(&raw);
        let features = standardize(&raw, &scaling);
        let k = self.config.n_states;

        let mut params = initialize(&features, k, self.config.min_variance);
        let mut posterior = e_step(&features, &params)?;
        let mut iterations = 0;
        let mut converged = false;

        for iter in 1..=self.config.max_iter {
            m_step(&features, &posterior, &mut params, self.config.min_variance)?;
            let next = e_step(&features, &params)?;
            let delta = next.log_likelihood - posterior.log_likelihood;
            posterior = next;
            iterations = iter;
            if delta.abs() < self.config.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                iterations,
                log_likelihood = posterior.log_likelihood,
                "Regime EM hit the iteration cap before converging"
            );
        }

        // Order states by activity level so state 0 is the quietest.
        let activity: Vec<f64> = params
            .means
            .iter()
            .map(|m| m[VOLUME] * scaling.stds[VOLUME] + scaling.means[VOLUME])
            .collect();
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| activity[a].total_cmp(&activity[b]).then(a.cmp(&b)));
        let params = params.permuted(&order);

        let model = RegimeModel {
            n_states: k,
            initial_probs: params.initial,
            transition_matrix: params.transition,
            state_centroids: params.means.iter().map(|m| m.to_vec()).collect(),
            state_variances: params.variances.iter().map(|v| v.to_vec()).collect(),
            state_labels: (0..k).map(|rank| RegimeLabel::from_rank(rank, k)).collect(),
            state_activity: order.iter().map(|&s| activity[s]).collect(),
            log_likelihood: posterior.log_likelihood,
            iterations,
            converged,
            n_observations: n,
            scaling,
            volatility_window: self.config.volatility_window,
        };

        debug!(
            n_states = k,
            iterations,
            converged,
            log_likelihood = model.log_likelihood,
            "Fitted regime model"
        );

        Ok(self.model.insert(model))
    }

    /// Most likely state per sample (Viterbi).
    pub fn decode(&self, series: &ActivitySeries) -> Result<Vec<RegimeAssignment>> {
        let model = self.fitted()?;
        let features = model_features(model, series)?;
        let path = viterbi(&features, &Params::from_model(model));
        Ok(path
            .into_iter()
            .enumerate()
            .map(|(index, state)| RegimeAssignment {
                index,
                timestamp: series.timestamps.get(index).copied(),
                state_id: state,
                label: model.state_labels[state],
                expected_duration: model.expected_duration(state),
            })
            .collect())
    }

    /// Smoothed state posteriors, one row per sample.
    pub fn predict_proba(&self, series: &ActivitySeries) -> Result<Vec<Vec<f64>>> {
        let model = self.fitted()?;
        let features = model_features(model, series)?;
        Ok(e_step(&features, &Params::from_model(model))?.gamma)
    }

    /// One-step-ahead outlook from the end of `series`.
    pub fn predict(&self, series: &ActivitySeries) -> Result<RegimeForecast> {
        let model = self.fitted()?;
        let features = model_features(model, series)?;
        let posterior = e_step(&features, &Params::from_model(model))?;
        let Some(current) = posterior.gamma.last() else {
            return Err(KernelError::insufficient_data("regime forecast", 1, 0));
        };

        let k = model.n_states;
        let next: Vec<f64> = (0..k)
            .map(|j| (0..k).map(|i| current[i] * model.transition_matrix[i][j]).sum())
            .collect();
        let current_state = argmax(current);
        let current_activity: f64 = current.iter().zip(&model.state_activity).map(|(p, a)| p * a).sum();
        let expected_activity: f64 = next.iter().zip(&model.state_activity).map(|(p, a)| p * a).sum();
        let signal = ((expected_activity - current_activity) / model.scaling.stds[VOLUME]).tanh();
        let confidence = next.iter().copied().fold(0.0, f64::max);

        Ok(RegimeForecast {
            current_state,
            current_label: model.state_labels[current_state],
            next_state_probs: next,
            current_activity,
            expected_activity,
            signal,
            confidence,
        })
    }

    /// Log-likelihood of `series` under the fitted model.
    pub fn score(&self, series: &ActivitySeries) -> Result<f64> {
        let model = self.fitted()?;
        let features = model_features(model, series)?;
        Ok(e_step(&features, &Params::from_model(model))?.log_likelihood)
    }

    /// Akaike information criterion on `series`.
    pub fn aic(&self, series: &ActivitySeries) -> Result<f64> {
        let ll = self.score(series)?;
        let p = self.fitted()?.n_parameters() as f64;
        Ok(-2.0 * ll + 2.0 * p)
    }

    /// Bayesian information criterion on `series`.
    pub fn bic(&self, series: &ActivitySeries) -> Result<f64> {
        let ll = self.score(series)?;
        let p = self.fitted()?.n_parameters() as f64;
        Ok(-2.0 * ll + p * (series.len() as f64).ln())
    }

    /// Fit on `series`, decode it and forecast from its end.
    pub fn analyze(config: &RegimeConfig, series: &ActivitySeries) -> Result<RegimeAnalysis> {
        let mut detector = Self::new(config.clone())?;
        detector.fit(series)?;
        let state_sequence = detector.decode(series)?.into_iter().map(|a| a.state_id).collect();
        let forecast = detector.predict(series)?;
        let model = detector
            .model
            .ok_or_else(|| KernelError::internal("regime model missing after fit"))?;
        Ok(RegimeAnalysis {
            model,
            state_sequence,
            forecast,
        })
    }
}

// ============================================================================
// Features
// ============================================================================

/// Return, rolling volatility of the return, and level.
fn raw_features(values: &[f64], window: usize) -> Features {
    let changes: Vec<f64> = std::iter::once(0.0)
        .chain(values.windows(2).map(|w| activity_return(w[0], w[1])))
        .collect();
    (0..values.len())
        .map(|t| {
            let lo = (t + 1).saturating_sub(window);
            [changes[t], stats::std_dev(&changes[lo..=t]), values[t]]
        })
        .collect()
}

/// Relative change from `prev` to `next`. Levels below one unit of activity
/// divide by one, so quiet stretches near zero stay finite.
fn activity_return(prev: f64, next: f64) -> f64 {
    (next - prev) / prev.abs().max(RETURN_FLOOR)
}

fn fit_scaling(raw: &Features) -> FeatureScaling {
    let mut means = Vec::with_capacity(N_FEATURES);
    let mut stds = Vec::with_capacity(N_FEATURES);
    for d in 0..N_FEATURES {
        let column: Vec<f64> = raw.iter().map(|x| x[d]).collect();
        let s = stats::std_dev(&column);
        means.push(stats::mean(&column));
        stds.push(if s < FLAT_EPS { 1.0 } else { s });
    }
    FeatureScaling { means, stds }
}

fn standardize(raw: &Features, scaling: &FeatureScaling) -> Features {
    raw.iter()
        .map(|x| {
            let mut z = [0.0; N_FEATURES];
            for d in 0..N_FEATURES {
                z[d] = (x[d] - scaling.means[d]) / scaling.stds[d];
            }
            z
        })
        .collect()
}

fn model_features(model: &RegimeModel, series: &ActivitySeries) -> Result<Features> {
    if series.is_empty() {
        return Err(KernelError::insufficient_data("regime decode", 1, 0));
    }
    if series.values.iter().any(|v| !v.is_finite()) {
        return Err(KernelError::validation("regime detector: non-finite activity"));
    }
    let raw = raw_features(&series.values, model.volatility_window);
    Ok(standardize(&raw, &model.scaling))
}

// ============================================================================
// HMM internals
// ============================================================================

#[derive(Debug, Clone)]
struct Params {
    initial: Vec<f64>,
    transition: Vec<Vec<f64>>,
    means: Vec<[f64; N_FEATURES]>,
    variances: Vec<[f64; N_FEATURES]>,
}

impl Params {
    fn from_model(model: &RegimeModel) -> Self {
        let to_array = |v: &Vec<f64>| {
            let mut a = [0.0; N_FEATURES];
            for (d, x) in v.iter().take(N_FEATURES).enumerate() {
                a[d] = *x;
            }
            a
        };
        Self {
            initial: model.initial_probs.clone(),
            transition: model.transition_matrix.clone(),
            means: model.state_centroids.iter().map(to_array).collect(),
            variances: model.state_variances.iter().map(to_array).collect(),
        }
    }

    fn n_states(&self) -> usize {
        self.initial.len()
    }

    fn log_emission(&self, state: usize, x: &[f64; N_FEATURES]) -> f64 {
        let (mean, var) = (&self.means[state], &self.variances[state]);
        (0..N_FEATURES)
            .map(|d| -0.5 * ((2.0 * PI * var[d]).ln() + (x[d] - mean[d]).powi(2) / var[d]))
            .sum()
    }

    /// Relabel states so that new state `i` is old state `order[i]`.
    fn permuted(&self, order: &[usize]) -> Self {
        Self {
            initial: order.iter().map(|&s| self.initial[s]).collect(),
            transition: order
                .iter()
                .map(|&i| order.iter().map(|&j| self.transition[i][j]).collect())
                .collect(),
            means: order.iter().map(|&s| self.means[s]).collect(),
            variances: order.iter().map(|&s| self.variances[s]).collect(),
        }
    }
}

/// E-step output.
struct Posterior {
    gamma: Vec<Vec<f64>>,
    xi_sum: Vec<Vec<f64>>,
    log_likelihood: f64,
}

/// K-means initialization seeded at feature-sum quantiles.
fn initialize(features: &Features, k: usize, min_variance: f64) -> Params {
    let n = features.len();
    let mut by_sum: Vec<usize> = (0..n).collect();
    let sum = |i: usize| features[i].iter().sum::<f64>();
    by_sum.sort_by(|&a, &b| sum(a).total_cmp(&sum(b)).then(a.cmp(&b)));

    let mut centroids: Vec<[f64; N_FEATURES]> = (0..k)
        .map(|j| {
            let q = ((j as f64 + 0.5) / k as f64 * n as f64) as usize;
            features[by_sum[q.min(n - 1)]]
        })
        .collect();

    let nearest = |x: &[f64; N_FEATURES], centroids: &[[f64; N_FEATURES]]| {
        let mut best = (0, f64::INFINITY);
        for (j, c) in centroids.iter().enumerate() {
            let d: f64 = (0..N_FEATURES).map(|d| (x[d] - c[d]).powi(2)).sum();
            if d < best.1 {
                best = (j, d);
            }
        }
        best.0
    };

    let mut labels = vec![0; n];
    for _ in 0..KMEANS_ITERATIONS {
        let next: Vec<usize> = features.iter().map(|x| nearest(x, centroids.as_slice())).collect();
        let changed = next != labels;
        labels = next;

        let mut sums = vec![[0.0; N_FEATURES]; k];
        let mut counts = vec![0usize; k];
        for (x, &l) in features.iter().zip(&labels) {
            counts[l] += 1;
            for d in 0..N_FEATURES {
                sums[l][d] += x[d];
            }
        }
        for j in 0..k {
            if counts[j] > 0 {
                for d in 0..N_FEATURES {
                    centroids[j][d] = sums[j][d] / counts[j] as f64;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let mut variances = vec![[1.0; N_FEATURES]; k];
    for (j, var) in variances.iter_mut().enumerate() {
        let members: Vec<&[f64; N_FEATURES]> = features
            .iter()
            .zip(&labels)
            .filter(|&(_, &l)| l == j)
            .map(|(x, _)| x)
            .collect();
        if members.len() < 2 {
            continue;
        }
        for d in 0..N_FEATURES {
            let v = members
                .iter()
                .map(|x| (x[d] - centroids[j][d]).powi(2))
                .sum::<f64>()
                / members.len() as f64;
            var[d] = v.max(min_variance);
        }
    }

    let mut initial = vec![1.0; k];
    let mut transition = vec![vec![1.0; k]; k];
    for &l in &labels {
        initial[l] += 1.0;
    }
    for pair in labels.windows(2) {
        transition[pair[0]][pair[1]] += 1.0;
    }
    normalize(&mut initial);
    for row in &mut transition {
        normalize(row);
    }

    Params {
        initial,
        transition,
        means: centroids,
        variances,
    }
}

/// Scaled forward-backward.
fn e_step(features: &Features, params: &Params) -> Result<Posterior> {
    let t_len = features.len();
    let k = params.n_states();

    // Emissions shifted by the per-step maximum.
    let mut shift = vec![0.0; t_len];
    let mut emission = vec![vec![0.0; k]; t_len];
    for (t, x) in features.iter().enumerate() {
        let logs: Vec<f64> = (0..k).map(|j| params.log_emission(j, x)).collect();
        let m = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !m.is_finite() {
            return Err(KernelError::numeric(format!("non-finite emission at t={t}")));
        }
        shift[t] = m;
        for j in 0..k {
            emission[t][j] = (logs[j] - m).exp();
        }
    }

    let mut alpha = vec![vec![0.0; k]; t_len];
    let mut scale = vec![0.0; t_len];
    for t in 0..t_len {
        for j in 0..k {
            let prior = if t == 0 {
                params.initial[j]
            } else {
                (0..k).map(|i| alpha[t - 1][i] * params.transition[i][j]).sum()
            };
            alpha[t][j] = prior * emission[t][j];
        }
        let c: f64 = alpha[t].iter().sum();
        if !(c.is_finite() && c > 0.0) {
            return Err(KernelError::numeric(format!("forward scale {c} at t={t}")));
        }
        scale[t] = c;
        alpha[t].iter_mut().for_each(|a| *a /= c);
    }

    let log_likelihood: f64 = scale
        .iter()
        .zip(&shift)
        .map(|(c, m)| c.ln() + m)
        .sum();

    let mut beta = vec![vec![1.0; k]; t_len];
    for t in (0..t_len.saturating_sub(1)).rev() {
        for i in 0..k {
            beta[t][i] = (0..k)
                .map(|j| params.transition[i][j] * emission[t + 1][j] * beta[t + 1][j])
                .sum::<f64>()
                / scale[t + 1];
        }
    }

    let mut gamma = vec![vec![0.0; k]; t_len];
    for t in 0..t_len {
        for j in 0..k {
            gamma[t][j] = alpha[t][j] * beta[t][j];
        }
        normalize(&mut gamma[t]);
    }

    let mut xi_sum = vec![vec![0.0; k]; k];
    for t in 0..t_len.saturating_sub(1) {
        for i in 0..k {
            for j in 0..k {
                xi_sum[i][j] += alpha[t][i]
                    * params.transition[i][j]
                    * emission[t + 1][j]
                    * beta[t + 1][j]
                    / scale[t + 1];
            }
        }
    }

    if !log_likelihood.is_finite() {
        return Err(KernelError::numeric("non-finite log-likelihood"));
    }
    Ok(Posterior {
        gamma,
        xi_sum,
        log_likelihood,
    })
}

fn m_step(
    features: &Features,
    posterior: &Posterior,
    params: &mut Params,
    min_variance: f64,
) -> Result<()> {
    let k = params.n_states();

    params.initial = posterior.gamma[0].iter().map(|p| p.max(PROB_FLOOR)).collect();
    normalize(&mut params.initial);

    for (i, row) in params.transition.iter_mut().enumerate() {
        for (j, a) in row.iter_mut().enumerate() {
            *a = posterior.xi_sum[i][j].max(PROB_FLOOR);
        }
        normalize(row);
    }

    for j in 0..k {
        let occupancy: f64 = posterior.gamma.iter().map(|g| g[j]).sum();
        if !(occupancy >= MIN_OCCUPANCY) {
            return Err(KernelError::numeric(format!(
                "state {j} collapsed (occupancy {occupancy:e})"
            )));
        }
        let mut mean = [0.0; N_FEATURES];
        for (x, g) in features.iter().zip(&posterior.gamma) {
            for d in 0..N_FEATURES {
                mean[d] += g[j] * x[d];
            }
        }
        mean.iter_mut().for_each(|m| *m /= occupancy);

        let mut var = [0.0; N_FEATURES];
        for (x, g) in features.iter().zip(&posterior.gamma) {
            for d in 0..N_FEATURES {
                var[d] += g[j] * (x[d] - mean[d]).powi(2);
            }
        }
        var.iter_mut()
            .for_each(|v| *v = (*v / occupancy).max(min_variance));

        params.means[j] = mean;
        params.variances[j] = var;
    }
    Ok(())
}

fn viterbi(features: &Features, params: &Params) -> Vec<usize> {
    let t_len = features.len();
    let k = params.n_states();
    if t_len == 0 {
        return Vec::new();
    }
    let ln = |p: f64| p.max(f64::MIN_POSITIVE).ln();

    let mut delta: Vec<f64> = (0..k)
        .map(|j| ln(params.initial[j]) + params.log_emission(j, &features[0]))
        .collect();
    let mut backptr = vec![vec![0usize; k]; t_len];

    for t in 1..t_len {
        let mut next = vec![0.0; k];
        for j in 0..k {
            let mut best = (0, f64::NEG_INFINITY);
            for i in 0..k {
                let v = delta[i] + ln(params.transition[i][j]);
                if v > best.1 {
                    best = (i, v);
                }
            }
            backptr[t][j] = best.0;
            next[j] = best.1 + params.log_emission(j, &features[t]);
        }
        delta = next;
    }

    let mut path = vec![argmax(&delta); t_len];
    for t in (1..t_len).rev() {
        path[t - 1] = backptr[t][path[t]];
    }
    path
}

fn normalize(row: &mut [f64]) {
    let total: f64 = row.iter().sum();
    if total > 0.0 {
        row.iter_mut().for_each(|p| *p /= total);
    } else {
        let uniform = 1.0 / row.len() as f64;
        row.iter_mut().for_each(|p| *p = uniform);
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

// ============================================================================
// Regime Detection Kernel
// ============================================================================

/// Regime detection kernel.
///
/// Each execution fits a fresh model; the most recent one stays available
/// through [`RegimeDetection::last_model`].
#[derive(Debug)]
pub struct RegimeDetection {
    metadata: KernelMetadata,
    last_model: RwLock<Option<RegimeModel>>,
}

impl Default for RegimeDetection {
    fn default() -> Self {
        Self::new()
    }
}

impl RegimeDetection {
    /// Create a new regime detection kernel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: KernelMetadata::stateful("regime/hmm-detection", Domain::RegimeAnalysis)
                .with_description("Gaussian HMM activity regimes with one-step outlook")
                .with_throughput(500)
                .with_latency_us(20_000.0),
            last_model: RwLock::new(None),
        }
    }

    /// Model fitted by the most recent execution.
    pub fn last_model(&self) -> Option<RegimeModel> {
        self.last_model
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl AnalyticsKernel for RegimeDetection {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchKernel<RegimeDetectionInput, RegimeDetectionOutput> for RegimeDetection {
    async fn execute(&self, input: RegimeDetectionInput) -> Result<RegimeDetectionOutput> {
        let start = Instant::now();
        let result =
            run_blocking(move || RegimeDetector::analyze(&input.config, &input.series)).await?;
        *self.last_model.write().unwrap_or_else(|e| e.into_inner()) = Some(result.model.clone());
        Ok(RegimeDetectionOutput {
            result,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }

    fn validate_input(&self, input: &RegimeDetectionInput) -> Result<()> {
        RegimeDetector::new(input.config.clone()).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Alternating quiet/busy blocks of `block` samples.
    fn two_regime_series(n: usize, block: usize, seed: u64) -> ActivitySeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..n)
            .map(|t| {
                let level = if (t / block) % 2 == 0 { 20.0 } else { 80.0 };
                level + (rng.gen::<f64>() - 0.5) * 6.0
            })
            .collect();
        ActivitySeries::daily(values)
    }

    fn two_state() -> RegimeConfig {
        RegimeConfig {
            n_states: 2,
            ..RegimeConfig::default()
        }
    }

    #[test]
    fn test_return_feature_is_relative_and_zero_safe() {
        let features = raw_features(&[0.0, 10.0, 20.0, 10.0, 0.5, 0.0], 3);
        let returns: Vec<f64> = features.iter().map(|f| f[0]).collect();
        assert_eq!(returns, vec![0.0, 10.0, 1.0, -0.5, -0.95, -0.5]);
        assert!(features.iter().all(|f| f.iter().all(|x| x.is_finite())));
        assert_eq!(features[3][2], 10.0);
    }

    #[test]
    fn test_regime_detection_metadata() {
        let kernel = RegimeDetection::new();
        assert_eq!(kernel.metadata().id, "regime/hmm-detection");
        assert!(kernel.metadata().mode.is_stateful());
    }

    #[test]
    fn test_rejects_state_count() {
        for n_states in [1, 9] {
            let err = RegimeDetector::new(RegimeConfig {
                n_states,
                ..RegimeConfig::default()
            })
            .unwrap_err();
            assert!(matches!(err, KernelError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn test_not_fitted() {
        let detector = RegimeDetector::new(two_state()).unwrap();
        let series = two_regime_series(100, 25, 1);
        assert!(!detector.is_fitted());
        assert!(matches!(detector.predict(&series), Err(KernelError::NotFitted(_))));
        assert!(matches!(detector.decode(&series), Err(KernelError::NotFitted(_))));
        assert!(matches!(detector.score(&series), Err(KernelError::NotFitted(_))));
        assert!(matches!(
            detector.predict_proba(&series),
            Err(KernelError::NotFitted(_))
        ));
    }

    #[test]
    fn test_insufficient_observations() {
        let mut detector = RegimeDetector::new(RegimeConfig::default()).unwrap();
        let err = detector.fit(&two_regime_series(35, 10, 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient data for regime detector: need 40, have 35"
        );
    }

    #[test]
    fn test_separates_two_regimes() {
        let series = two_regime_series(400, 50, 7);
        let mut detector = RegimeDetector::new(two_state()).unwrap();
        let model = detector.fit(&series).unwrap().clone();

        for row in &model.transition_matrix {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        assert!((model.initial_probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(model.state_activity[0] < 30.0);
        assert!(model.state_activity[1] > 70.0);
        assert_eq!(model.state_labels[0], RegimeLabel::LowActivity);
        assert_eq!(model.state_labels[1], RegimeLabel::Aggressive);

        // Centroids sit further apart than a state's own spread.
        let gap = (model.state_centroids[1][VOLUME] - model.state_centroids[0][VOLUME]).abs();
        assert!(gap > 3.0 * model.state_variances[0][VOLUME].sqrt());

        let path = detector.decode(&series).unwrap();
        let correct = path
            .iter()
            .filter(|a| (a.index / 50) % 2 == a.state_id)
            .count();
        assert!(correct as f64 / path.len() as f64 > 0.95);
        assert!(path[0].expected_duration > 5.0);
    }

    #[test]
    fn test_predict_and_proba() {
        let series = two_regime_series(300, 60, 3);
        let mut detector = RegimeDetector::new(two_state()).unwrap();
        detector.fit(&series).unwrap();

        let forecast = detector.predict(&series).unwrap();
        assert!((forecast.next_state_probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(forecast.signal.abs() <= 1.0);
        assert!(forecast.confidence > 0.5);

        let proba = detector.predict_proba(&series).unwrap();
        assert_eq!(proba.len(), series.len());
        for row in &proba {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }

        let ll = detector.score(&series).unwrap();
        assert!(ll.is_finite());
        assert!(detector.bic(&series).unwrap() > detector.aic(&series).unwrap());
    }

    #[test]
    fn test_four_states_fit() {
        let series = two_regime_series(500, 40, 11);
        let analysis = RegimeDetector::analyze(&RegimeConfig::default(), &series).unwrap();
        assert_eq!(analysis.model.n_states, 4);
        assert_eq!(analysis.state_sequence.len(), 500);
        assert!(analysis.model.iterations >= 1);
        let activity = &analysis.model.state_activity;
        assert!(activity.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_execute_keeps_last_model() {
        let kernel = RegimeDetection::new();
        assert!(kernel.last_model().is_none());
        let input = RegimeDetectionInput::new(two_regime_series(200, 40, 5), two_state());
        let output = kernel.execute(input).await.unwrap();
        assert_eq!(kernel.last_model(), Some(output.result.model));
    }
}
