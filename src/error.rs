//! Error types for outlier scoring and score combination

use thiserror::Error;

/// Result type alias for scoring operations
pub type Result<T> = std::result::Result<T, OutlierError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum OutlierError {
    /// Malformed input: empty, non-finite, or mismatched dimensions
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A requested neighbor count or bin count exceeds the available samples
    #[error("Insufficient data: {what} requires {required}, but only {available} available")]
    InsufficientData {
        what: String,
        required: usize,
        available: usize,
    },

    /// Zero-variance score vector met during normalization
    #[error("Degenerate scores: {0}")]
    DegenerateScore(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),
}

impl OutlierError {
    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        OutlierError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn insufficient(what: impl Into<String>, required: usize, available: usize) -> Self {
        OutlierError::InsufficientData {
            what: what.into(),
            required,
            available,
        }
    }
}

impl From<serde_json::Error> for OutlierError {
    fn from(err: serde_json::Error) -> Self {
        OutlierError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for OutlierError {
    fn from(err: ndarray::ShapeError) -> Self {
        OutlierError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OutlierError::InvalidInput("NaN at row 3".to_string());
        assert_eq!(err.to_string(), "Invalid input: NaN at row 3");
    }

    #[test]
    fn test_insufficient_display() {
        let err = OutlierError::insufficient("n_neighbors", 10, 5);
        assert_eq!(
            err.to_string(),
            "Insufficient data: n_neighbors requires 10, but only 5 available"
        );
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: OutlierError = json_err.into();
        assert!(matches!(err, OutlierError::SerializationError(_)));
    }
}
