//! Tagged component results.
//!
//! Every analytical component reports one of three outcomes: a value, a
//! graceful "not enough data" marker, or a hard error. Hosts receive the
//! discriminated union instead of nullable fields.

use crate::error::{KernelError, Result};
use serde::{Deserialize, Serialize};

/// Outcome of one component run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentResult<T> {
    /// The component produced a value.
    Ok(T),
    /// The series was too short; not a failure of the overall call.
    InsufficientData {
        /// Human-readable reason.
        reason: String,
    },
    /// A hard failure (configuration or numeric).
    Error {
        /// Error message.
        message: String,
    },
}

impl<T> ComponentResult<T> {
    /// Classify a component `Result`.
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => ComponentResult::Ok(value),
            Err(err @ KernelError::InsufficientData { .. }) => ComponentResult::InsufficientData {
                reason: err.to_string(),
            },
            Err(err) => ComponentResult::Error {
                message: err.to_string(),
            },
        }
    }

    /// Returns true if a value was produced.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, ComponentResult::Ok(_))
    }

    /// Returns true if the component lacked data.
    #[must_use]
    pub fn is_insufficient(&self) -> bool {
        matches!(self, ComponentResult::InsufficientData { .. })
    }

    /// Borrow the value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            ComponentResult::Ok(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let ok = ComponentResult::from_result(Ok(42));
        assert!(ok.is_ok());
        assert_eq!(ok.value(), Some(&42));

        let short: ComponentResult<i32> =
            ComponentResult::from_result(Err(KernelError::insufficient_data("matcher", 60, 10)));
        assert!(short.is_insufficient());
        assert_eq!(short.value(), None);

        let bad: ComponentResult<i32> =
            ComponentResult::from_result(Err(KernelError::numeric("singular")));
        assert!(matches!(bad, ComponentResult::Error { .. }));
    }

    #[test]
    fn test_tagged_serialization() {
        let ok: ComponentResult<u8> = ComponentResult::Ok(7);
        let json = serde_json::to_string(&ok).unwrap();
        assert_eq!(json, r#"{"status":"OK","result":7}"#);

        let short: ComponentResult<u8> = ComponentResult::InsufficientData {
            reason: "short".into(),
        };
        let json = serde_json::to_string(&short).unwrap();
        assert!(json.contains(r#""status":"INSUFFICIENT_DATA""#));

        let back: ComponentResult<u8> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, short);
    }
}
