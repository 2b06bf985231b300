//! Spectral cycle detection.
//!
//! The series is linearly detrended and transformed with a real FFT. Local
//! maxima of the power spectrum inside the searched period range become
//! cycle candidates; their strength is the share of non-DC power in the
//! peak bin and its two neighbours. Peak frequencies are refined by
//! parabolic interpolation on the magnitude spectrum, and amplitude and
//! phase come from a least-squares sinusoid fit at the refined frequency.
//!
//! Confidence is a surrogate test: random-phase series with the off-peak
//! power floor of the input are pushed through the same pipeline, and a
//! cycle's confidence is the share of surrogates whose largest spectral
//! amplitude stays below the cycle's own.

use std::f64::consts::PI;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use tracing::debug;

use crate::config::CycleConfig;
use crate::messages::{CycleDetectionInput, CycleDetectionOutput};
use crate::stats::{self, FLAT_EPS};
use crate::types::{ActivitySeries, CycleAnalysis, CycleBand, CycleForecast, CyclePattern};
use tradekernel_core::{
    domain::Domain,
    error::{KernelError, Result},
    kernel::KernelMetadata,
    runtime::WorkerPool,
    traits::{run_blocking, AnalyticsKernel, BatchKernel},
};

/// Shortest series the detector accepts.
pub const MIN_CYCLE_POINTS: usize = 16;

const BAND_Z: f64 = 1.96;

// ============================================================================
// Cycle Detection Kernel
// ============================================================================

/// Cyclical pattern detection kernel.
#[derive(Debug, Clone)]
pub struct CycleDetection {
    metadata: KernelMetadata,
    pool: WorkerPool,
}

impl Default for CycleDetection {
    fn default() -> Self {
        Self::new()
    }
}

/// Peak found in the power spectrum, before the sinusoid fit.
#[derive(Debug, Clone, Copy)]
struct SpectralPeak {
    bin: usize,
    refined_bin: f64,
    strength: f64,
    spectral_amplitude: f64,
}

/// Forward and inverse plans for one series length.
struct Plans {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl Plans {
    fn new(n: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            forward: planner.plan_fft_forward(n),
            inverse: planner.plan_fft_inverse(n),
        }
    }

    /// Magnitudes `|X_k|` for `k` in `0..=n/2`.
    fn half_magnitudes(&self, values: &[f64]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = values.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.forward.process(&mut buffer);
        buffer[..=values.len() / 2].iter().map(|c| c.norm()).collect()
    }
}

impl CycleDetection {
    /// Create a new cycle detection kernel on the global pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: KernelMetadata::batch("temporal/cycle-detection", Domain::TemporalAnalysis)
                .with_description("FFT cycle detection with surrogate significance")
                .with_throughput(2_000)
                .with_latency_us(5_000.0)
                .with_parallel(true),
            pool: WorkerPool::global(),
        }
    }

    /// Use a dedicated worker pool for the surrogate test.
    #[must_use]
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    /// Detect cycles in a series.
    ///
    /// A series with no finite values or no variance yields an empty result.
    pub fn compute(
        series: &ActivitySeries,
        config: &CycleConfig,
        seed: u64,
        pool: &WorkerPool,
    ) -> Result<CycleAnalysis> {
        let n = series.len();
        if n < MIN_CYCLE_POINTS {
            return Err(KernelError::insufficient_data(
                "cycle detector",
                MIN_CYCLE_POINTS,
                n,
            ));
        }

        let dps = series.days_per_sample();
        let max_period = match config.max_period_days {
            Some(p) => {
                let required = (2.0 * p / dps).ceil() as usize;
                if n < required {
                    return Err(KernelError::insufficient_data(
                        "cycle detector",
                        required,
                        n,
                    ));
                }
                p
            }
            None => n as f64 * dps / 2.0,
        };

        let finite: Vec<f64> = series.values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Ok(Self::empty(0.0, n));
        }
        let fill = stats::mean(&finite);
        let values: Vec<f64> = series
            .values
            .iter()
            .map(|&v| if v.is_finite() { v } else { fill })
            .collect();
        if stats::std_dev(&values) < FLAT_EPS {
            return Ok(Self::empty(fill, n));
        }

        let (trend, mut residual) = detrend(&values);
        let plans = Plans::new(n);
        let magnitudes = plans.half_magnitudes(&residual);
        let power: Vec<f64> = magnitudes.iter().map(|m| m * m).collect();
        let total: f64 = power[1..].iter().sum();

        let bins = candidate_bins(n, dps, config.min_period_days, max_period);
        let mut peaks = find_peaks(&power, &magnitudes, total, &bins, config.min_strength, n);
        peaks.sort_by(|a, b| b.strength.total_cmp(&a.strength).then(a.bin.cmp(&b.bin)));
        peaks.truncate(config.max_cycles);

        if peaks.is_empty() {
            debug!(n, "No spectral peak above strength threshold");
            let last = trend_at(trend, n - 1);
            return Ok(CycleAnalysis {
                cycles: Vec::new(),
                trend,
                residual_std: stats::std_dev(&residual),
                last_fitted: last,
                forecast: None,
                n_points: n,
            });
        }

        let floor = off_peak_floor(&power, &peaks);
        let surrogate_peaks = pool.map_indexed(config.n_surrogates, |i| {
            surrogate_peak(&plans, n, floor, &bins, seed.wrapping_add(i as u64))
        });

        let nd = n as f64 * dps;
        let mut fits = Vec::with_capacity(peaks.len());
        let mut cycles = Vec::with_capacity(peaks.len());
        for peak in &peaks {
            let omega = 2.0 * PI * peak.refined_bin / n as f64;
            let (amplitude, phase) = fit_sinusoid(&mut residual, omega);
            fits.push((omega, amplitude, phase));

            let below = surrogate_peaks
                .iter()
                .filter(|&&s| s < peak.spectral_amplitude)
                .count();
            let period_days = nd / peak.refined_bin;
            let k = peak.bin as f64;
            cycles.push(CyclePattern {
                period_days,
                strength: peak.strength,
                phase,
                amplitude,
                confidence_interval: (nd / (k + 0.5), nd / (k - 0.5).max(0.25)),
                confidence: below as f64 / surrogate_peaks.len().max(1) as f64,
                band: CycleBand::classify(period_days, config.calendar),
            });
        }

        let residual_std = stats::std_dev(&residual);
        let fitted = |t: f64| {
            trend.1
                + trend.0 * t
                + fits
                    .iter()
                    .map(|(w, a, p)| a * (w * t + p).cos())
                    .sum::<f64>()
        };
        let horizon = (config.forecast_days / dps).ceil().max(1.0) as usize;
        let forecast_values: Vec<f64> = (0..horizon).map(|h| fitted((n + h) as f64)).collect();
        let forecast = CycleForecast {
            lower: forecast_values.iter().map(|v| v - BAND_Z * residual_std).collect(),
            upper: forecast_values.iter().map(|v| v + BAND_Z * residual_std).collect(),
            values: forecast_values,
            horizon_days: horizon as f64 * dps,
        };

        debug!(
            n,
            cycles = cycles.len(),
            top_period = cycles[0].period_days,
            top_strength = cycles[0].strength,
            "Detected cycles"
        );

        Ok(CycleAnalysis {
            cycles,
            trend,
            residual_std,
            last_fitted: fitted((n - 1) as f64),
            forecast: Some(forecast),
            n_points: n,
        })
    }

    fn empty(level: f64, n: usize) -> CycleAnalysis {
        CycleAnalysis {
            cycles: Vec::new(),
            trend: (0.0, level),
            residual_std: 0.0,
            last_fitted: level,
            forecast: None,
            n_points: n,
        }
    }
}

/// Linear trend `(slope, intercept)` and the residual around it.
fn detrend(values: &[f64]) -> ((f64, f64), Vec<f64>) {
    let (slope, intercept) = stats::linear_fit(values);
    let residual = values
        .iter()
        .enumerate()
        .map(|(t, v)| v - (intercept + slope * t as f64))
        .collect();
    ((slope, intercept), residual)
}

fn trend_at(trend: (f64, f64), t: usize) -> f64 {
    trend.1 + trend.0 * t as f64
}

/// Frequency bins whose period lies in `[min_period, max_period]` days.
fn candidate_bins(n: usize, dps: f64, min_period: f64, max_period: f64) -> RangeInclusive<usize> {
    let nd = n as f64 * dps;
    let lo = ((nd / max_period).ceil() as usize).max(1);
    let hi = ((nd / min_period).floor() as usize).min(n / 2);
    lo..=hi
}

fn find_peaks(
    power: &[f64],
    magnitudes: &[f64],
    total: f64,
    bins: &RangeInclusive<usize>,
    min_strength: f64,
    n: usize,
) -> Vec<SpectralPeak> {
    if total <= FLAT_EPS {
        return Vec::new();
    }
    let last = power.len() - 1;
    let at = |k: usize| if k == 0 || k > last { 0.0 } else { power[k] };

    bins.clone()
        .filter(|&k| power[k] > at(k - 1) && power[k] >= at(k + 1))
        .filter_map(|k| {
            let strength = ((at(k - 1) + power[k] + at(k + 1)) / total).min(1.0);
            if strength < min_strength {
                return None;
            }
            let delta = if k < last {
                let (a, b, c) = (magnitudes[k - 1], magnitudes[k], magnitudes[k + 1]);
                let denom = a - 2.0 * b + c;
                if denom.abs() > FLAT_EPS {
                    (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
                } else {
                    0.0
                }
            } else {
                0.0
            };
            Some(SpectralPeak {
                bin: k,
                refined_bin: k as f64 + delta,
                strength,
                spectral_amplitude: 2.0 * magnitudes[k] / n as f64,
            })
        })
        .collect()
}

/// Mean power outside the peaks and their neighbours.
fn off_peak_floor(power: &[f64], peaks: &[SpectralPeak]) -> f64 {
    let near_peak = |k: usize| peaks.iter().any(|p| k + 1 >= p.bin && k <= p.bin + 1);
    let rest: Vec<f64> = (1..power.len())
        .filter(|&k| !near_peak(k))
        .map(|k| power[k])
        .collect();
    if rest.is_empty() {
        stats::mean(&power[1..])
    } else {
        stats::mean(&rest)
    }
}

/// Largest spectral amplitude of one random-phase surrogate.
fn surrogate_peak(
    plans: &Plans,
    n: usize,
    floor: f64,
    bins: &RangeInclusive<usize>,
    seed: u64,
) -> f64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buffer = vec![Complex::new(0.0, 0.0); n];
    for k in 1..=n / 2 {
        let u: f64 = rng.gen();
        let magnitude = (-floor * (1.0 - u).ln()).sqrt();
        let coefficient = Complex::from_polar(magnitude, 2.0 * PI * rng.gen::<f64>());
        if 2 * k == n {
            buffer[k] = Complex::new(coefficient.re, 0.0);
        } else {
            buffer[k] = coefficient;
            buffer[n - k] = coefficient.conj();
        }
    }
    plans.inverse.process(&mut buffer);

    let surrogate: Vec<f64> = buffer.iter().map(|c| c.re / n as f64).collect();
    let (_, residual) = detrend(&surrogate);
    let magnitudes = plans.half_magnitudes(&residual);
    bins.clone()
        .filter_map(|k| magnitudes.get(k))
        .map(|m| 2.0 * m / n as f64)
        .fold(0.0, f64::max)
}

/// Least-squares fit of `a cos(ωt) + b sin(ωt)`, subtracted from `residual`.
///
/// Returns `(amplitude, phase)` such that the fit is `A cos(ωt + φ)`.
fn fit_sinusoid(residual: &mut [f64], omega: f64) -> (f64, f64) {
    let (mut scc, mut sss, mut scs, mut src, mut srs) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (t, r) in residual.iter().enumerate() {
        let (s, c) = (omega * t as f64).sin_cos();
        scc += c * c;
        sss += s * s;
        scs += c * s;
        src += r * c;
        srs += r * s;
    }
    let det = scc * sss - scs * scs;
    if det.abs() < FLAT_EPS {
        return (0.0, 0.0);
    }
    let a = (src * sss - srs * scs) / det;
    let b = (srs * scc - src * scs) / det;

    for (t, r) in residual.iter_mut().enumerate() {
        let (s, c) = (omega * t as f64).sin_cos();
        *r -= a * c + b * s;
    }
    ((a * a + b * b).sqrt(), (-b).atan2(a))
}

impl AnalyticsKernel for CycleDetection {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchKernel<CycleDetectionInput, CycleDetectionOutput> for CycleDetection {
    async fn execute(&self, input: CycleDetectionInput) -> Result<CycleDetectionOutput> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let start = Instant::now();
            let result = Self::compute(&input.series, &input.config, input.seed, &pool)?;
            Ok(CycleDetectionOutput {
                result,
                compute_time_us: start.elapsed().as_micros() as u64,
            })
        })
        .await
    }

    fn validate_input(&self, input: &CycleDetectionInput) -> Result<()> {
        if input.config.n_surrogates == 0 {
            return Err(KernelError::invalid_config(
                "cycles.n_surrogates must be >= 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn config() -> CycleConfig {
        CycleConfig {
            n_surrogates: 50,
            ..CycleConfig::default()
        }
    }

    fn sinusoid(n: usize, period: f64, amplitude: f64, noise: f64, seed: u64) -> ActivitySeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..n)
            .map(|t| {
                100.0
                    + amplitude * (2.0 * PI * t as f64 / period).sin()
                    + noise * (rng.gen::<f64>() - 0.5)
            })
            .collect();
        ActivitySeries::daily(values)
    }

    #[test]
    fn test_cycle_detection_metadata() {
        let kernel = CycleDetection::new();
        assert_eq!(kernel.metadata().id, "temporal/cycle-detection");
        assert!(kernel.metadata().parallel);
    }

    #[test]
    fn test_detects_quarterly_cycle() {
        let series = sinusoid(800, 90.0, 20.0, 4.0, 1);
        let pool = WorkerPool::global();
        let result = CycleDetection::compute(&series, &config(), 42, &pool).unwrap();

        let top = &result.cycles[0];
        assert!(
            top.period_days > 81.0 && top.period_days < 99.0,
            "period {}",
            top.period_days
        );
        assert!(top.strength > 0.5);
        assert_eq!(top.band, CycleBand::Quarterly);
        assert!(top.confidence > 0.9);
        assert!((top.amplitude - 20.0).abs() < 3.0);
        assert!(top.confidence_interval.0 <= top.period_days + 1.0);
        assert!(top.confidence_interval.1 >= top.period_days - 1.0);

        let forecast = result.forecast.as_ref().unwrap();
        assert_eq!(forecast.values.len(), 30);
        assert!(forecast.lower[0] < forecast.values[0]);
    }

    #[test]
    fn test_phase_reconstructs_signal() {
        // Integer-bin cosine so the fit is exact.
        let values: Vec<f64> = (0..400)
            .map(|t| 50.0 + 10.0 * (2.0 * PI * t as f64 / 40.0 + 0.7).cos())
            .collect();
        let series = ActivitySeries::daily(values.clone());
        let result =
            CycleDetection::compute(&series, &config(), 3, &WorkerPool::global()).unwrap();
        let top = &result.cycles[0];
        assert!((top.period_days - 40.0).abs() < 0.5);
        assert!((top.amplitude - 10.0).abs() < 0.5);
        assert!((top.phase - 0.7).abs() < 0.1, "phase {}", top.phase);
        assert!((result.last_fitted - values[399]).abs() < 1.0);
    }

    #[test]
    fn test_noise_has_no_cycles() {
        let mut rng = StdRng::seed_from_u64(9);
        let values = (0..730).map(|_| 50.0 + rng.gen::<f64>() * 10.0).collect();
        let result = CycleDetection::compute(
            &ActivitySeries::daily(values),
            &config(),
            42,
            &WorkerPool::global(),
        )
        .unwrap();
        assert!(result.cycles.is_empty());
        assert!(result.forecast.is_none());
    }

    #[test]
    fn test_constant_and_nan_series() {
        let pool = WorkerPool::global();
        let constant = ActivitySeries::daily(vec![5.0; 100]);
        let result = CycleDetection::compute(&constant, &config(), 1, &pool).unwrap();
        assert!(result.cycles.is_empty());
        assert_eq!(result.last_fitted, 5.0);

        let nan = ActivitySeries::daily(vec![f64::NAN; 100]);
        assert!(CycleDetection::compute(&nan, &config(), 1, &pool)
            .unwrap()
            .cycles
            .is_empty());
    }

    #[test]
    fn test_insufficient_for_max_period() {
        let series = sinusoid(100, 20.0, 5.0, 0.0, 2);
        let cfg = CycleConfig {
            max_period_days: Some(90.0),
            ..config()
        };
        let err = CycleDetection::compute(&series, &cfg, 1, &WorkerPool::global()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient data for cycle detector: need 180, have 100"
        );

        let tiny = ActivitySeries::daily(vec![1.0; 8]);
        assert!(CycleDetection::compute(&tiny, &config(), 1, &WorkerPool::global())
            .unwrap_err()
            .is_insufficient_data());
    }

    #[test]
    fn test_deterministic_across_pools() {
        let series = sinusoid(500, 30.0, 8.0, 6.0, 5);
        let one = CycleDetection::compute(&series, &config(), 7, &WorkerPool::new(1).unwrap());
        let four = CycleDetection::compute(&series, &config(), 7, &WorkerPool::new(4).unwrap());
        assert_eq!(one.unwrap(), four.unwrap());
    }

    #[tokio::test]
    async fn test_execute() {
        let kernel = CycleDetection::new();
        let input = CycleDetectionInput::with_defaults(sinusoid(300, 30.0, 10.0, 1.0, 4));
        let output = kernel.execute(input).await.unwrap();
        assert!(!output.result.cycles.is_empty());
    }
}
