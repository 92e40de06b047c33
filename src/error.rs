//! Error types for the talentmatch service

use thiserror::Error;

/// Result type alias for talentmatch operations
pub type Result<T> = std::result::Result<T, TalentMatchError>;

/// Main error type for the talentmatch crate
#[derive(Error, Debug)]
pub enum TalentMatchError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Feature error: {0}")]
    FeatureError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<serde_json::Error> for TalentMatchError {
    fn from(err: serde_json::Error) -> Self {
        TalentMatchError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TalentMatchError {
    fn from(err: ndarray::ShapeError) -> Self {
        TalentMatchError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TalentMatchError::ValidationError("reference data not set".to_string());
        assert_eq!(err.to_string(), "Validation error: reference data not set");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TalentMatchError = io_err.into();
        assert!(matches!(err, TalentMatchError::IoError(_)));
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = TalentMatchError::InvalidParameter {
            name: "significance_level".to_string(),
            value: "1.5".to_string(),
            reason: "must be in (0, 1)".to_string(),
        };
        assert!(err.to_string().contains("significance_level"));
    }
}
