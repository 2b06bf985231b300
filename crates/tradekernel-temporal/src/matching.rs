//! Historical analogue search.
//!
//! The most recent window is compared against every earlier window of the
//! same length with banded dynamic time warping on z-normalized values, so
//! matches are about shape rather than level. The best non-overlapping
//! matches vote on what happens next, weighted by similarity.

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::config::MatcherConfig;
use crate::messages::{PatternMatchingInput, PatternMatchingOutput};
use crate::stats::{self, FLAT_EPS};
use crate::types::{ActivitySeries, MatchResult, PatternMatch};
use tradekernel_core::{
    domain::Domain,
    error::{KernelError, Result},
    kernel::KernelMetadata,
    runtime::WorkerPool,
    traits::{run_blocking, AnalyticsKernel, BatchKernel},
};

// ============================================================================
// Pattern Matching Kernel
// ============================================================================

/// DTW analogue matching kernel.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    metadata: KernelMetadata,
    pool: WorkerPool,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher {
    /// Create a new pattern matcher on the global pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: KernelMetadata::batch("matching/dtw-analogues", Domain::PatternMatching)
                .with_description("Banded DTW search for historical analogues of the recent window")
                .with_throughput(1_000)
                .with_latency_us(10_000.0)
                .with_parallel(true),
            pool: WorkerPool::global(),
        }
    }

    /// Use a dedicated worker pool for candidate scoring.
    #[must_use]
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    /// Find analogues of the last `window_size` samples.
    pub fn compute(
        series: &ActivitySeries,
        config: &MatcherConfig,
        pool: &WorkerPool,
    ) -> Result<MatchResult> {
        let w = config.window_size;
        let h = config.horizon;
        if w < config.min_window {
            return Err(KernelError::insufficient_data(
                "pattern matcher window",
                config.min_window,
                w,
            ));
        }
        if h == 0 || h > w {
            return Err(KernelError::invalid_config(format!(
                "horizon must be in [1, {w}], got {h}"
            )));
        }
        if config.top_k == 0 {
            return Err(KernelError::invalid_config("top_k must be >= 1"));
        }

        let values = &series.values;
        let n = values.len();
        if n < 2 * w {
            return Err(KernelError::insufficient_data("pattern matcher", 2 * w, n));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(KernelError::validation("pattern matcher: non-finite activity"));
        }

        let query_offset = n - w;
        let query_raw = &values[query_offset..];
        let query = stats::zscore(query_raw);
        let band = ((config.band_fraction * w as f64).ceil() as usize).max(1);

        let candidates = n - 2 * w + 1;
        let scored: Vec<(usize, f64, f64)> = pool.map_indexed(candidates, |o| {
            let window = stats::zscore(&values[o..o + w]);
            let rms = (dtw_distance(&query, &window, band) / w as f64).sqrt();
            (o, 1.0 / (1.0 + rms), rms)
        });

        let mut ranked = scored;
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.0.cmp(&a.0)));

        let mut selected: Vec<(usize, f64, f64)> = Vec::with_capacity(config.top_k);
        for candidate in ranked {
            if selected.len() == config.top_k {
                break;
            }
            if selected.iter().all(|s| s.0.abs_diff(candidate.0) >= w) {
                selected.push(candidate);
            }
        }

        let matches: Vec<PatternMatch> = selected
            .into_iter()
            .map(|(offset, similarity, distance)| {
                let window = &values[offset..offset + w];
                let future = stats::mean(&values[offset + w..offset + w + h]);
                let spread = stats::std_dev(window);
                let spread = if spread < FLAT_EPS { 1.0 } else { spread };
                PatternMatch {
                    offset,
                    similarity,
                    distance,
                    subsequent_outcome: (future - stats::mean(window)) / spread,
                    raw_change: future - window[w - 1],
                }
            })
            .collect();

        let total_similarity: f64 = matches.iter().map(|m| m.similarity).sum();
        let weighted_outcome = if total_similarity > 0.0 {
            matches
                .iter()
                .map(|m| m.similarity * m.subsequent_outcome)
                .sum::<f64>()
                / total_similarity
        } else {
            0.0
        };
        let direction = sign(weighted_outcome);
        let outcome_agreement = matches
            .iter()
            .filter(|m| sign(m.subsequent_outcome) == direction)
            .count() as f64
            / matches.len().max(1) as f64;
        let forecast = stats::mean(query_raw) + weighted_outcome * stats::std_dev(query_raw);

        debug!(
            candidates,
            matches = matches.len(),
            best_similarity = matches.first().map(|m| m.similarity),
            weighted_outcome,
            "Matched analogues"
        );

        Ok(MatchResult {
            query_offset,
            window_size: w,
            horizon: h,
            matches,
            weighted_outcome,
            forecast,
            outcome_agreement,
            candidates_evaluated: candidates,
        })
    }
}

/// Banded DTW with squared-difference cost.
///
/// Cells further than `band` from the diagonal are unreachable; the band is
/// widened to the length difference so the end cell is always reachable.
pub fn dtw_distance(a: &[f64], b: &[f64], band: usize) -> f64 {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return if n == m { 0.0 } else { f64::INFINITY };
    }
    let band = band.max(n.abs_diff(m));

    let mut prev = vec![f64::INFINITY; m + 1];
    let mut curr = vec![f64::INFINITY; m + 1];
    prev[0] = 0.0;

    for i in 1..=n {
        curr.iter_mut().for_each(|c| *c = f64::INFINITY);
        let lo = i.saturating_sub(band).max(1);
        let hi = (i + band).min(m);
        for j in lo..=hi {
            let cost = (a[i - 1] - b[j - 1]).powi(2);
            curr[j] = cost + prev[j - 1].min(prev[j]).min(curr[j - 1]);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}

fn sign(x: f64) -> i8 {
    if x > FLAT_EPS {
        1
    } else if x < -FLAT_EPS {
        -1
    } else {
        0
    }
}

impl AnalyticsKernel for PatternMatcher {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchKernel<PatternMatchingInput, PatternMatchingOutput> for PatternMatcher {
    async fn execute(&self, input: PatternMatchingInput) -> Result<PatternMatchingOutput> {
        let pool = self.pool.clone();
        run_blocking(move || {
            let start = Instant::now();
            let result = Self::compute(&input.series, &input.config, &pool)?;
            Ok(PatternMatchingOutput {
                result,
                compute_time_us: start.elapsed().as_micros() as u64,
            })
        })
        .await
    }
}
