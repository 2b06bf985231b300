//! Activity series construction.
//!
//! Turns an unordered stream of timestamped events into a regularly spaced
//! series: events are bucketed by frequency, summed within a bucket, and
//! empty buckets between the first and last event are filled.

use std::time::Instant;

use async_trait::async_trait;
use tracing::debug;

use crate::config::SeriesConfig;
use crate::messages::{SeriesBuilderInput, SeriesBuilderOutput};
use crate::types::{ActivityEvent, ActivitySeries, FillPolicy, SeriesSpan};
use tradekernel_core::{
    domain::Domain,
    error::{KernelError, Result},
    kernel::KernelMetadata,
    traits::{AnalyticsKernel, BatchKernel},
};

// ============================================================================
// Series Builder Kernel
// ============================================================================

/// Series builder kernel.
///
/// Buckets raw events into an evenly spaced [`ActivitySeries`].
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    metadata: KernelMetadata,
}

impl Default for SeriesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesBuilder {
    /// Create a new series builder kernel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: KernelMetadata::batch("temporal/series-builder", Domain::TemporalAnalysis)
                .with_description("Bucket timestamped events into a regular activity series")
                .with_throughput(1_000_000)
                .with_latency_us(50.0),
        }
    }

    /// Build a series from events.
    ///
    /// Returns `InsufficientData` for fewer than `min_points` buckets and
    /// `ValidationError` for non-finite values or a span above `max_points`.
    pub fn compute(events: &[ActivityEvent], config: &SeriesConfig) -> Result<ActivitySeries> {
        if events.is_empty() {
            return Err(KernelError::insufficient_data(
                "series builder",
                config.min_points,
                0,
            ));
        }
        if let Some(bad) = events.iter().find(|e| !e.value.is_finite()) {
            return Err(KernelError::validation(format!(
                "non-finite activity value at {}",
                bad.timestamp
            )));
        }

        let frequency = config.frequency;
        let mut buckets: Vec<(i64, f64)> = events
            .iter()
            .map(|e| (frequency.bucket_of(&e.timestamp), e.value))
            .collect();
        buckets.sort_by_key(|(bucket, _)| *bucket);

        let first = buckets[0].0;
        let last = buckets[buckets.len() - 1].0;
        let span = (last - first) as u64 + 1;
        if span > config.max_points as u64 {
            return Err(KernelError::validation(format!(
                "series spans {span} {frequency} buckets, limit is {}",
                config.max_points
            )));
        }
        let n = span as usize;

        let mut sums: Vec<Option<f64>> = vec![None; n];
        for (bucket, value) in &buckets {
            let slot = &mut sums[(bucket - first) as usize];
            *slot = Some(slot.unwrap_or(0.0) + value);
        }
        let filled = sums.iter().filter(|s| s.is_none()).count();

        let mut values = Vec::with_capacity(n);
        let mut previous = 0.0;
        for sum in sums {
            let value = match (sum, config.fill) {
                (Some(v), _) => v,
                (None, FillPolicy::Zero) => 0.0,
                (None, FillPolicy::ForwardFill) => previous,
            };
            previous = value;
            values.push(value);
        }

        if n < config.min_points {
            return Err(KernelError::insufficient_data(
                "series builder",
                config.min_points,
                n,
            ));
        }

        let timestamps = (first..=last)
            .map(|b| {
                frequency
                    .bucket_start(b)
                    .ok_or_else(|| KernelError::validation(format!("bucket {b} out of range")))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            events = events.len(),
            buckets = n,
            filled,
            %frequency,
            "Built activity series"
        );

        let span = SeriesSpan {
            start: timestamps[0],
            end: timestamps[n - 1],
        };
        Ok(ActivitySeries {
            values,
            timestamps,
            frequency,
            span,
        })
    }
}

impl AnalyticsKernel for SeriesBuilder {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }
}

#[async_trait]
impl BatchKernel<SeriesBuilderInput, SeriesBuilderOutput> for SeriesBuilder {
    async fn execute(&self, input: SeriesBuilderInput) -> Result<SeriesBuilderOutput> {
        let start = Instant::now();
        let result = Self::compute(&input.events, &input.config)?;
        Ok(SeriesBuilderOutput {
            result,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }

    fn validate_input(&self, input: &SeriesBuilderInput) -> Result<()> {
        if input.config.max_points < input.config.min_points {
            return Err(KernelError::invalid_config(
                "series.max_points must be >= min_points",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frequency;
    use chrono::{DateTime, Duration, Utc};

    fn day(d: i64) -> DateTime<Utc> {
        DateTime::<Utc>::default() + Duration::days(d)
    }

    fn config(min_points: usize) -> SeriesConfig {
        SeriesConfig {
            min_points,
            ..SeriesConfig::default()
        }
    }

    #[test]
    fn test_series_builder_metadata() {
        let kernel = SeriesBuilder::new();
        assert_eq!(kernel.metadata().id, "temporal/series-builder");
        assert_eq!(kernel.metadata().domain, Domain::TemporalAnalysis);
    }

    #[test]
    fn test_buckets_sum_and_sort() {
        let events = vec![
            ActivityEvent::new(day(2) + Duration::hours(5), 4.0),
            ActivityEvent::new(day(0) + Duration::hours(1), 1.0),
            ActivityEvent::new(day(0) + Duration::hours(23), 2.0),
        ];
        let series = SeriesBuilder::compute(&events, &config(2)).unwrap();
        assert_eq!(series.values, vec![3.0, 0.0, 4.0]);
        assert_eq!(series.span.start, day(0));
        assert_eq!(series.span.end, day(2));
        assert_eq!(series.timestamps[1], day(1));
    }

    #[test]
    fn test_forward_fill() {
        let events = vec![
            ActivityEvent::new(day(0), 5.0),
            ActivityEvent::new(day(3), 1.0),
        ];
        let cfg = SeriesConfig {
            fill: FillPolicy::ForwardFill,
            ..config(2)
        };
        let series = SeriesBuilder::compute(&events, &cfg).unwrap();
        assert_eq!(series.values, vec![5.0, 5.0, 5.0, 1.0]);
    }

    #[test]
    fn test_hourly_frequency() {
        let events: Vec<_> = (0..5)
            .map(|h| ActivityEvent::new(day(0) + Duration::hours(h), h as f64))
            .collect();
        let cfg = SeriesConfig {
            frequency: Frequency::Hourly,
            ..config(5)
        };
        let series = SeriesBuilder::compute(&events, &cfg).unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series.frequency, Frequency::Hourly);
    }

    #[test]
    fn test_insufficient_and_invalid() {
        let err = SeriesBuilder::compute(&[], &config(60)).unwrap_err();
        assert!(err.is_insufficient_data());

        let short: Vec<_> = (0..10).map(|d| ActivityEvent::new(day(d), 1.0)).collect();
        let err = SeriesBuilder::compute(&short, &config(60)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient data for series builder: need 60, have 10"
        );

        let nan = vec![ActivityEvent::new(day(0), f64::NAN)];
        assert!(matches!(
            SeriesBuilder::compute(&nan, &config(1)),
            Err(KernelError::ValidationError(_))
        ));

        let wide = vec![
            ActivityEvent::new(day(0), 1.0),
            ActivityEvent::new(day(500), 1.0),
        ];
        let cfg = SeriesConfig {
            max_points: 100,
            ..config(2)
        };
        assert!(matches!(
            SeriesBuilder::compute(&wide, &cfg),
            Err(KernelError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_execute() {
        let events: Vec<_> = (0..60).map(|d| ActivityEvent::new(day(d), 2.0)).collect();
        let kernel = SeriesBuilder::new();
        let output = kernel
            .execute(SeriesBuilderInput::with_defaults(events))
            .await
            .unwrap();
        assert_eq!(output.result.len(), 60);
    }
}
