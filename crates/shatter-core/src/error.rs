//! Unified error types for the shatter crates
//!
//! [`ShatterError`] represents failures that can occur before any solver is
//! involved: malformed zone vectors, unreadable configuration files, bad TOML.
//! The algorithm crate has its own domain error and converts to and from this
//! type at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use shatter_core::{AnalysisConfig, ShatterResult};
//!
//! fn load(path: &str) -> ShatterResult<AnalysisConfig> {
//!     let config = AnalysisConfig::from_path(path)?;
//!     Ok(config)
//! }
//! ```

use thiserror::Error;

/// Unified error type for data-model and configuration operations.
#[derive(Error, Debug)]
pub enum ShatterError {
    /// I/O errors (config file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input validation errors (vector lengths, volumes, occupancy)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration value errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Solver-side failures surfaced through the unified type
    #[error("Solver error: {0}")]
    Solver(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using ShatterError.
pub type ShatterResult<T> = Result<T, ShatterError>;

impl From<toml::de::Error> for ShatterError {
    fn from(err: toml::de::Error) -> Self {
        ShatterError::Parse(err.to_string())
    }
}

impl From<String> for ShatterError {
    fn from(s: String) -> Self {
        ShatterError::Other(s)
    }
}

impl From<&str> for ShatterError {
    fn from(s: &str) -> Self {
        ShatterError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShatterError::Validation("volume must be positive".into());
        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("volume must be positive"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ShatterError = io_err.into();
        assert!(matches!(err, ShatterError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let bad = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err: ShatterError = bad.into();
        assert!(matches!(err, ShatterError::Parse(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> ShatterResult<()> {
            Err(ShatterError::Validation("test".into()))
        }

        fn outer() -> ShatterResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
