//! Prediction request/response contract

use serde::{Deserialize, Serialize};

/// Inbound prediction call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Text to classify
    pub text: String,
}

impl PredictionRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Empty and whitespace-only inputs are meaningless to a classifier
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Input length in characters, the only request detail that is logged
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Result of one successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Echo of the input
    pub text: String,

    /// Label from the engine's label set
    pub sentiment: String,

    /// Probability of `sentiment`, within [0.0, 1.0]
    pub confidence: f64,

    /// Identifier of the model that produced the result
    #[serde(rename = "modelVersion", alias = "model_version")]
    pub model_version: String,
}
