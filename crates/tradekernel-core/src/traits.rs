//! Core kernel traits.
//!
//! - `AnalyticsKernel`: base trait for every published kernel
//! - `BatchKernel`: one-shot request/response execution
//!
//! The computations behind these traits are synchronous and CPU-bound.
//! Kernels hand them to [`run_blocking`] so the async caller stays responsive
//! and a deadline set with [`BatchKernel::execute_with_timeout`] can fire
//! while the computation is still running.

use crate::error::{KernelError, Result};
use crate::kernel::KernelMetadata;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

// ============================================================================
// Execution Context
// ============================================================================

/// Execution context for a kernel invocation.
///
/// Carries the request id and the entity being analysed into the tracing span
/// that wraps the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Request ID for tracing
    pub request_id: Option<Uuid>,
    /// Entity whose activity is analysed
    pub entity_id: Option<String>,
    /// Host-side deadline
    pub timeout: Option<Duration>,
    /// Additional metadata
    pub metadata: HashMap<String, String>,
}

impl ExecutionContext {
    /// Create a new execution context with a fresh request id.
    pub fn new() -> Self {
        Self {
            request_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
    }

    /// Create context with request ID
    pub fn with_request_id(mut self, id: Uuid) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Set the analysed entity
    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Tracing span for a run of `kernel_id` under this context.
    pub fn span(&self, kernel_id: &str) -> tracing::Span {
        tracing::info_span!(
            "kernel",
            kernel = kernel_id,
            request_id = %self.request_id.map(|id| id.to_string()).unwrap_or_default(),
            entity = self.entity_id.as_deref().unwrap_or("-"),
        )
    }
}

// ============================================================================
// Blocking Execution
// ============================================================================

/// Run a CPU-bound computation on tokio's blocking pool.
///
/// The current tracing span is carried into the worker. If the awaiting
/// future is dropped (for example on timeout) the computation still runs to
/// completion in the background and its result is discarded.
pub async fn run_blocking<R, F>(f: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R> + Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(f))
        .await
        .map_err(|e| KernelError::internal(format!("kernel task: {e}")))?
}

// ============================================================================
// Core Kernel Traits
// ============================================================================

/// Base trait for all analytics kernels.
pub trait AnalyticsKernel: Send + Sync + Debug {
    /// Returns the kernel metadata.
    fn metadata(&self) -> &KernelMetadata;

    /// Validate kernel configuration.
    ///
    /// Called before execution; returns `InvalidConfiguration` on
    /// out-of-range parameters.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Returns the kernel ID.
    fn id(&self) -> &str {
        &self.metadata().id
    }
}

/// Trait for batch kernels.
///
/// # Type Parameters
///
/// - `I`: Input type
/// - `O`: Output type
#[async_trait]
pub trait BatchKernel<I, O>: AnalyticsKernel
where
    I: Send + Sync,
    O: Send + Sync,
{
    /// Execute the kernel with the given input.
    async fn execute(&self, input: I) -> Result<O>;

    /// Validate the input before execution.
    ///
    /// Override to provide custom input validation.
    fn validate_input(&self, _input: &I) -> Result<()> {
        Ok(())
    }

    /// Execute the kernel inside a span carrying the context's request and
    /// entity ids. Honours `ctx.timeout` when set.
    async fn execute_with_context(&self, ctx: &ExecutionContext, input: I) -> Result<O>
    where
        I: 'async_trait,
    {
        self.validate()?;
        self.validate_input(&input)?;
        let span = ctx.span(self.id());
        match ctx.timeout {
            Some(timeout) => {
                self.execute_with_timeout(input, timeout)
                    .instrument(span)
                    .await
            }
            None => self.execute(input).instrument(span).await,
        }
    }

    /// Execute the kernel with a timeout.
    async fn execute_with_timeout(&self, input: I, timeout: Duration) -> Result<O>
    where
        I: 'async_trait,
    {
        match tokio::time::timeout(timeout, self.execute(input)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(KernelError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;

    #[derive(Debug)]
    struct Doubler {
        metadata: KernelMetadata,
    }

    impl AnalyticsKernel for Doubler {
        fn metadata(&self) -> &KernelMetadata {
            &self.metadata
        }
    }

    #[async_trait]
    impl BatchKernel<Vec<f64>, Vec<f64>> for Doubler {
        async fn execute(&self, input: Vec<f64>) -> Result<Vec<f64>> {
            Ok(input.into_iter().map(|v| v * 2.0).collect())
        }

        fn validate_input(&self, input: &Vec<f64>) -> Result<()> {
            if input.iter().any(|v| !v.is_finite()) {
                return Err(KernelError::validation("non-finite value"));
            }
            Ok(())
        }
    }

    fn doubler() -> Doubler {
        Doubler {
            metadata: KernelMetadata::batch("core/doubler", Domain::Core),
        }
    }

    /// Sleeps on the blocking pool for the requested number of milliseconds.
    #[derive(Debug)]
    struct Sleeper {
        metadata: KernelMetadata,
    }

    impl AnalyticsKernel for Sleeper {
        fn metadata(&self) -> &KernelMetadata {
            &self.metadata
        }
    }

    #[async_trait]
    impl BatchKernel<u64, u64> for Sleeper {
        async fn execute(&self, millis: u64) -> Result<u64> {
            run_blocking(move || {
                std::thread::sleep(Duration::from_millis(millis));
                Ok(millis)
            })
            .await
        }
    }

    fn sleeper() -> Sleeper {
        Sleeper {
            metadata: KernelMetadata::batch("core/sleeper", Domain::Core),
        }
    }

    #[test]
    fn test_execution_context() {
        let ctx = ExecutionContext::new()
            .with_entity("entity-7")
            .with_timeout(Duration::from_secs(30))
            .with_metadata("source", "test");

        assert!(ctx.request_id.is_some());
        assert_eq!(ctx.entity_id.as_deref(), Some("entity-7"));
        assert_eq!(ctx.timeout, Some(Duration::from_secs(30)));
        assert_eq!(ctx.metadata.get("source").map(String::as_str), Some("test"));
    }

    #[tokio::test]
    async fn test_execute_with_context_validates_input() {
        let kernel = doubler();
        let ctx = ExecutionContext::new();

        let out = kernel
            .execute_with_context(&ctx, vec![1.0, 2.0])
            .await
            .unwrap();
        assert_eq!(out, vec![2.0, 4.0]);

        let err = kernel
            .execute_with_context(&ctx, vec![f64::NAN])
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_execute_with_timeout() {
        let kernel = doubler();
        let out = kernel
            .execute_with_timeout(vec![3.0], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out, vec![6.0]);
        assert_eq!(kernel.id(), "core/doubler");
    }

    #[tokio::test]
    async fn test_timeout_fires_during_blocking_compute() {
        let kernel = sleeper();
        let err = kernel
            .execute_with_timeout(300, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::Timeout(t) if t == Duration::from_millis(10)));

        let ctx = ExecutionContext::new().with_timeout(Duration::from_millis(10));
        let err = kernel.execute_with_context(&ctx, 300).await.unwrap_err();
        assert!(matches!(err, KernelError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_run_blocking_within_deadline() {
        let out = sleeper()
            .execute_with_timeout(1, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, 1);

        let err = run_blocking(|| -> Result<()> { Err(KernelError::numeric("singular")) })
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::NumericInstability(_)));
    }
}
