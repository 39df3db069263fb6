//! Custom error types for the cleaning assistant.
//!
//! This module provides the error hierarchy using `thiserror`. Errors are
//! serializable so they can be embedded in JSON output and reports.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning assistant.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// Run was cancelled by the caller.
    #[error("Run cancelled")]
    Cancelled,

    /// A step referenced a column that is not in the table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A numeric action was applied to a column that holds no numbers.
    #[error("Column '{column}' has dtype {dtype}, expected a numeric column")]
    NonNumericColumn { column: String, dtype: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A step could not be interpreted.
    #[error("Invalid step: {0}")]
    InvalidStep(String),

    /// A plan stopped at a failing step.
    #[error("Plan failed at step {step}: {reason}")]
    PlanFailed { step: usize, reason: String },

    /// AI client error.
    #[error("AI client error: {0}")]
    AiClientError(String),

    /// Report generation failed.
    #[error("Failed to generate report: {0}")]
    ReportFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (only with "ai" feature).
    #[cfg(feature = "ai")]
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Error with added context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::NonNumericColumn { .. } => "NON_NUMERIC_COLUMN",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidStep(_) => "INVALID_STEP",
            Self::PlanFailed { .. } => "PLAN_FAILED",
            Self::AiClientError(_) => "AI_CLIENT_ERROR",
            Self::ReportFailed(_) => "REPORT_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "ai")]
            Self::HttpRequest(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Errors are serialized as `{ "code": ..., "message": ... }`.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(CleaningError::Cancelled.error_code(), "CANCELLED");
        assert_eq!(
            CleaningError::ColumnNotFound("age".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            CleaningError::NonNumericColumn {
                column: "city".to_string(),
                dtype: "str".to_string()
            }
            .error_code(),
            "NON_NUMERIC_COLUMN"
        );
    }

    #[test]
    fn test_is_cancelled_through_context() {
        assert!(CleaningError::Cancelled.is_cancelled());
        assert!(CleaningError::Cancelled.with_context("stage").is_cancelled());
        assert!(!CleaningError::InvalidConfig("x".to_string()).is_cancelled());
    }


    #[test]
    fn test_error_serialization() {
        let error = CleaningError::ColumnNotFound("Age".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Age"));
    }

    #[test]
    fn test_with_context() {
        let error = CleaningError::ColumnNotFound("test".to_string()).with_context("While executing");
        assert!(error.to_string().contains("While executing"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }
}
