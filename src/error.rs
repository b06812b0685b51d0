//! Core error types for kleros

use crate::intervals::Split;
use thiserror::Error;

/// Main error type for kleros operations
#[derive(Error, Debug)]
pub enum KlerosError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Transient, per-draw. Callers redraw instead of aborting the session.
    #[error("window [{start}, {end}) out of bounds for {chromosome} (length {length})")]
    OutOfBounds {
        chromosome: String,
        start: i64,
        end: i64,
        length: usize,
    },

    /// The negative space is too sparse relative to the retry budget.
    #[error("negative sampling exhausted after {attempts} attempts in {split} split")]
    NegativeSamplingExhausted { split: Split, attempts: u32 },

    #[error("materialization produced {produced} of {requested} records for {split} split")]
    Materialization {
        split: Split,
        produced: usize,
        requested: usize,
    },
}

impl KlerosError {
    /// Whether a caller should retry the draw that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KlerosError::OutOfBounds { .. })
    }
}

/// Result type alias for kleros operations
pub type KlerosResult<T> = Result<T, KlerosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_error = KlerosError::Configuration("missing field".to_string());
        assert_eq!(
            format!("{}", config_error),
            "Configuration error: missing field"
        );

        let oob = KlerosError::OutOfBounds {
            chromosome: "chr1".to_string(),
            start: -12,
            end: 988,
            length: 20000,
        };
        assert_eq!(
            format!("{}", oob),
            "window [-12, 988) out of bounds for chr1 (length 20000)"
        );

        let exhausted = KlerosError::NegativeSamplingExhausted {
            split: Split::Train,
            attempts: 100,
        };
        assert!(format!("{}", exhausted).contains("100 attempts"));

        let partial = KlerosError::Materialization {
            split: Split::Test,
            produced: 12,
            requested: 640000,
        };
        assert!(format!("{}", partial).contains("12 of 640000"));
    }

    #[test]
    fn test_retryable_classification() {
        let oob = KlerosError::OutOfBounds {
            chromosome: "chr2".to_string(),
            start: 0,
            end: 1000,
            length: 500,
        };
        assert!(oob.is_retryable());
        assert!(!KlerosError::Configuration("x".to_string()).is_retryable());
        assert!(!KlerosError::UnknownFeature("CTCF".to_string()).is_retryable());
    }
}
