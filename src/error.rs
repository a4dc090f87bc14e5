//! Classified failures for model loading, inference and the service boundary

use thiserror::Error;

/// Why the model artifact could not be brought up.
///
/// Recorded once by [`ModelHost`](crate::models::ModelHost) and replayed on
/// every later `load()` call, hence `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("model artifact unavailable: {0}")]
    ArtifactUnavailable(String),

    #[error("model artifact corrupt or unsupported: {0}")]
    ArtifactCorrupt(String),

    #[error("resources exhausted while loading model: {0}")]
    ResourceExhausted(String),
}

/// Failure of a single inference call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferError {
    /// `infer` was called before a successful load.
    #[error("model is not loaded")]
    NotLoaded,

    #[error("inference engine fault: {0}")]
    EngineFault(String),
}

/// The only error kinds that cross the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("service not ready")]
    NotReady,

    #[error("invalid input")]
    InvalidInput,

    #[error("inference failure")]
    InferenceFailure,
}

impl ServiceError {
    /// HTTP status the boundary reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::NotReady => 503,
            ServiceError::InvalidInput => 400,
            ServiceError::InferenceFailure => 500,
        }
    }

    /// Generic caller-facing message. Never carries internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            ServiceError::NotReady => "Service not ready",
            ServiceError::InvalidInput => "Invalid input: text must be a non-empty string",
            ServiceError::InferenceFailure => "Internal processing error",
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotReady => "not_ready",
            ServiceError::InvalidInput => "invalid_input",
            ServiceError::InferenceFailure => "inference_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::NotReady.status_code(), 503);
        assert_eq!(ServiceError::InvalidInput.status_code(), 400);
        assert_eq!(ServiceError::InferenceFailure.status_code(), 500);
    }

    #[test]
    fn test_public_message_hides_cause() {
        let msg = ServiceError::InferenceFailure.public_message();
        assert_eq!(msg, "Internal processing error");
        assert!(!msg.contains("fault"));
    }

    #[test]
    fn test_invalid_input_message_covers_every_rejection() {
        // Same body for blank text, malformed JSON and a missing field
        let msg = ServiceError::InvalidInput.public_message();
        assert_eq!(msg, "Invalid input: text must be a non-empty string");
        assert!(msg.starts_with("Invalid input"));
    }
}
