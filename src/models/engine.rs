//! The inference capability seam.
//!
//! [`EngineLoader`] constructs an engine from a named artifact;
//! [`SentimentEngine`] maps a single text to a label and score.

use crate::error::LoadError;
use anyhow::Result;

/// Result of classifying one text
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Label from the engine's label set (e.g. POSITIVE / NEGATIVE)
    pub label: String,
    /// Probability of `label`
    pub score: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A loaded text classifier.
///
/// Implementations need not be safe for concurrent use; the host
/// serializes calls, which is why `classify` takes `&mut self`.
pub trait SentimentEngine: Send {
    /// Classify a single input
    fn classify(&mut self, text: &str) -> Result<Classification>;
}

/// Constructs and warms an engine for a model identifier.
pub trait EngineLoader: Send + Sync {
    fn load(&self, identifier: &str) -> std::result::Result<Box<dyn SentimentEngine>, LoadError>;
}
