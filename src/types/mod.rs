//! Type definitions for the service boundary

pub mod health;
pub mod prediction;

pub use health::{ErrorBody, Health, HealthStatus};
pub use prediction::{PredictionRequest, PredictionResponse};
