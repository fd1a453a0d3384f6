//! Structured error types for surveykit.

use thiserror::Error;

/// Unified error type for all surveykit operations.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// Malformed shapes, out-of-range parameters, probability vectors that
    /// do not sum to one.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An exact routine would exceed its configured enumeration or
    /// arithmetic bound.
    #[error("resource limit exceeded: {what} needs {requested}, limit is {limit}")]
    ResourceLimitExceeded {
        what: &'static str,
        requested: u128,
        limit: u128,
    },

    /// The distribution library rejected its parameters.
    #[error("distribution error: {0}")]
    Distribution(String),
}

impl SurveyError {
    /// Shorthand for [`SurveyError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Convenience alias used throughout surveykit.
pub type Result<T> = std::result::Result<T, SurveyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_resource_limit() {
        let err = SurveyError::ResourceLimitExceeded {
            what: "compositions",
            requested: 10,
            limit: 5,
        };
        assert_eq!(
            err.to_string(),
            "resource limit exceeded: compositions needs 10, limit is 5"
        );
    }

    #[test]
    fn invalid_shorthand() {
        let err = SurveyError::invalid("k must be >= 1");
        assert!(matches!(err, SurveyError::InvalidArgument(ref m) if m == "k must be >= 1"));
    }
}
