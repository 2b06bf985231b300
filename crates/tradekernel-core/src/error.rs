//! Error types for TradeKernel.
//!
//! Only caller mistakes and unrecoverable numeric failures are hard errors.
//! Data insufficiency is an error at the component level but is converted
//! into a per-model "unavailable" marker by the ensemble layer, and statistical
//! rejection of a pattern is never an error at all.

use thiserror::Error;

/// Result type alias using `KernelError`.
pub type Result<T> = std::result::Result<T, KernelError>;

/// Errors that can occur during kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Series or window too short for the requested computation.
    #[error("Insufficient data for {context}: need {required}, have {actual}")]
    InsufficientData {
        /// What was being computed.
        context: String,
        /// Minimum number of points required.
        required: usize,
        /// Number of points available.
        actual: usize,
    },

    /// Predict/decode called on a model that has not been fitted.
    #[error("Model not fitted: {0}")]
    NotFitted(String),

    /// Parameter outside its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Fit failed to converge or produced a degenerate model.
    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    /// Kernel not found in registry.
    #[error("Kernel not found: {0}")]
    KernelNotFound(String),

    /// Kernel already registered.
    #[error("Kernel already registered: {0}")]
    KernelAlreadyRegistered(String),

    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    ValidationError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Timeout waiting for a host-side execution.
    #[error("Timeout waiting for response after {0:?}")]
    Timeout(std::time::Duration),

    /// Configuration file could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl KernelError {
    /// Create an insufficient-data error.
    #[must_use]
    pub fn insufficient_data(context: impl Into<String>, required: usize, actual: usize) -> Self {
        KernelError::InsufficientData {
            context: context.into(),
            required,
            actual,
        }
    }

    /// Create a not-fitted error.
    #[must_use]
    pub fn not_fitted(msg: impl Into<String>) -> Self {
        KernelError::NotFitted(msg.into())
    }

    /// Create an invalid-configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        KernelError::InvalidConfiguration(msg.into())
    }

    /// Create a numeric-instability error.
    #[must_use]
    pub fn numeric(msg: impl Into<String>) -> Self {
        KernelError::NumericInstability(msg.into())
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        KernelError::ValidationError(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        KernelError::InternalError(msg.into())
    }

    /// Create a kernel not found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        KernelError::KernelNotFound(id.into())
    }

    /// Returns true if this error signals too little data.
    #[must_use]
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, KernelError::InsufficientData { .. })
    }

    /// Returns true if the caller can reasonably retry with other inputs.
    ///
    /// Numeric instability is recoverable: a different seed or state count
    /// often fits.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KernelError::InsufficientData { .. }
                | KernelError::NumericInstability(_)
                | KernelError::Timeout(_)
        )
    }

    /// Returns true if this is a programmer or configuration mistake.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            KernelError::NotFitted(_)
                | KernelError::InvalidConfiguration(_)
                | KernelError::ValidationError(_)
        )
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        KernelError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_message() {
        let err = KernelError::insufficient_data("pattern matcher", 60, 42);
        assert!(err.is_insufficient_data());
        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "Insufficient data for pattern matcher: need 60, have 42"
        );
    }

    #[test]
    fn test_caller_errors() {
        assert!(KernelError::not_fitted("regime").is_caller_error());
        assert!(KernelError::invalid_config("n_states").is_caller_error());
        assert!(!KernelError::numeric("singular").is_caller_error());
        assert!(KernelError::numeric("singular").is_recoverable());
    }
}
