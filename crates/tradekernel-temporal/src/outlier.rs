//! Recent-activity outlier check.

use std::time::Instant;

use async_trait::async_trait;

use crate::messages::{OutlierCheckInput, OutlierCheckOutput};
use crate::stats::{self, FLAT_EPS};
use crate::types::{ActivitySeries, OutlierCheck};
use tradekernel_core::{
    domain::Domain,
    error::{KernelError, Result},
    kernel::KernelMetadata,
    traits::{AnalyticsKernel, BatchKernel},
};

const Z_CLAMP: f64 = 1e6;

// ============================================================================
// Outlier Check Kernel
// ============================================================================

/// Flags a recent window whose mean sits far outside the preceding history.
#[derive(Debug, Clone)]
pub struct ActivityOutlierCheck {
    metadata: KernelMetadata,
}

impl Default for ActivityOutlierCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityOutlierCheck {
    /// Create a new outlier check kernel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: KernelMetadata::batch("temporal/outlier-check", Domain::TemporalAnalysis)
                .with_description("Z-score of recent activity against its own history")
                .with_throughput(1_000_000)
                .with_latency_us(5.0),
        }
    }

    /// Compare the mean of the last `recent_window` samples with the history
    /// before them. The history must be at least twice the window.
    pub fn compute(
        series: &ActivitySeries,
        recent_window: usize,
        z_threshold: f64,
    ) -> Result<OutlierCheck> {
        if recent_window == 0 {
            return Err(KernelError::invalid_config("recent_window must be >= 1"));
        }
        let n = series.len();
        if n < 3 * recent_window {
            return Err(KernelError::insufficient_data(
                "outlier check",
                3 * recent_window,
                n,
            ));
        }

        let (history, recent) = series.values.split_at(n - recent_window);
        let recent_mean = stats::mean(recent);
        let historical_mean = stats::mean(history);
        let historical_std = stats::std_dev(history);
        let diff = recent_mean - historical_mean;
        let z_score = if diff.abs() < FLAT_EPS {
            0.0
        } else {
            (diff / historical_std.max(FLAT_EPS)).clamp(-Z_CLAMP, Z_CLAMP)
        };

        Ok(OutlierCheck {
            recent_mean,
            historical_mean,
            historical_std,
            z_score,
            is_outlier: z_score.abs() > z_threshold,
        })
    }
}

impl AnalyticsKernel for ActivityOutlierCheck {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchKernel<OutlierCheckInput, OutlierCheckOutput> for ActivityOutlierCheck {
    async fn execute(&self, input: OutlierCheckInput) -> Result<OutlierCheckOutput> {
        let start = Instant::now();
        let result = Self::compute(&input.series, input.recent_window, input.z_threshold)?;
        Ok(OutlierCheckOutput {
            result,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outlier_check_metadata() {
        let kernel = ActivityOutlierCheck::new();
        assert_eq!(kernel.metadata().id, "temporal/outlier-check");
    }

    #[test]
    fn test_spike_is_outlier() {
        let mut values: Vec<f64> = (0..100).map(|i| 10.0 + (i % 5) as f64).collect();
        values.extend([60.0; 7]);
        let check = ActivityOutlierCheck::compute(&ActivitySeries::daily(values), 7, 3.0).unwrap();
        assert!(check.is_outlier);
        assert!(check.z_score > 3.0);
        assert_eq!(check.recent_mean, 60.0);
    }

    #[test]
    fn test_steady_is_not_outlier() {
        let values: Vec<f64> = (0..100).map(|i| 10.0 + (i % 5) as f64).collect();
        let check = ActivityOutlierCheck::compute(&ActivitySeries::daily(values), 7, 3.0).unwrap();
        assert!(!check.is_outlier);
    }

    #[test]
    fn test_flat_history() {
        let mut values = vec![5.0; 30];
        let same = ActivityOutlierCheck::compute(&ActivitySeries::daily(values.clone()), 7, 3.0)
            .unwrap();
        assert_eq!(same.z_score, 0.0);

        values.extend([6.0; 7]);
        let moved = ActivityOutlierCheck::compute(&ActivitySeries::daily(values), 7, 3.0).unwrap();
        assert!(moved.is_outlier);
        assert!(moved.z_score <= Z_CLAMP);
    }

    #[test]
    fn test_insufficient() {
        let err = ActivityOutlierCheck::compute(&ActivitySeries::daily(vec![1.0; 20]), 7, 3.0)
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }
}
