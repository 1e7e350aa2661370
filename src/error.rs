//! Application-wide error types.
//!
//! Propagation policy: `ServiceUnavailable` is the only error allowed to
//! escape the specialist/router boundary as a hard failure. `Parse` is
//! recovered locally with conservative defaults, `NotFound` surfaces as a
//! distinct non-fatal result, and tool failures are data (`success: false`
//! envelopes), never errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("AI service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("structured output parse error: {0}")]
    Parse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// True for the one error class that aborts the remaining pipeline tiers.
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, AppError::ServiceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn service_unavailable_is_flagged() {
        let e = AppError::ServiceUnavailable("connection refused".into());
        assert!(e.is_service_unavailable());
        assert!(!AppError::Parse("missing: subject".into()).is_service_unavailable());
    }

    #[test]
    fn parse_error_lists_fields() {
        let e = AppError::Parse("missing required fields: subject, confidence".into());
        assert!(e.to_string().contains("subject"));
        assert!(e.to_string().contains("confidence"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
