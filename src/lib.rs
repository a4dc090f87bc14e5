//! Sentiment Inference Service Library
//!
//! Loads a text-classification model once, gates prediction on readiness,
//! and serves health and prediction over HTTP.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod models;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use error::{InferError, LoadError, ServiceError};
pub use http::create_router;
pub use metrics::{MetricsReporter, ServiceMetrics};
pub use models::{ModelHost, OnnxEngineLoader};
pub use service::{InferenceService, ServiceState};
pub use types::{HealthStatus, PredictionRequest, PredictionResponse};
