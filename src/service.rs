//! Readiness state machine and prediction orchestration

use crate::error::ServiceError;
use crate::metrics::ServiceMetrics;
use crate::models::ModelHost;
use crate::types::{Health, HealthStatus, PredictionRequest, PredictionResponse};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Service version reported by the health endpoint
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lifecycle of the service.
///
/// `NotStarted -> Initializing -> Ready | Degraded`. `Ready` and
/// `Degraded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceState {
    NotStarted = 0,
    Initializing = 1,
    Ready = 2,
    Degraded = 3,
}

impl ServiceState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ServiceState::Initializing,
            2 => ServiceState::Ready,
            3 => ServiceState::Degraded,
            _ => ServiceState::NotStarted,
        }
    }
}

/// Gates access to the model host on readiness and classifies failures
pub struct InferenceService {
    host: Arc<ModelHost>,
    state: AtomicU8,
    metrics: Arc<ServiceMetrics>,
}

impl InferenceService {
    pub fn new(host: Arc<ModelHost>, metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            host,
            state: AtomicU8::new(ServiceState::NotStarted as u8),
            metrics,
        }
    }

    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn host(&self) -> &ModelHost {
        &self.host
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    /// Load the model and settle into `Ready` or `Degraded`.
    ///
    /// Only the first call does anything; later calls return the current
    /// state (which may still be `Initializing`). Blocks while the model loads.
    pub fn initialize(&self) -> ServiceState {
        if self
            .state
            .compare_exchange(
                ServiceState::NotStarted as u8,
                ServiceState::Initializing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return self.state();
        }

        info!(model = %self.host.identifier(), "Initializing inference service");

        let next = match self.host.load() {
            Ok(()) => {
                info!(model = %self.host.identifier(), "Inference service ready");
                ServiceState::Ready
            }
            Err(e) => {
                error!(
                    model = %self.host.identifier(),
                    error = %e,
                    "Model load failed, service degraded until restart"
                );
                ServiceState::Degraded
            }
        };

        self.state.store(next as u8, Ordering::Release);
        next
    }

    /// Pure read of readiness; never triggers loading
    pub fn check_health(&self) -> HealthStatus {
        let status = match self.state() {
            ServiceState::Ready => Health::Healthy,
            _ => Health::Unavailable,
        };

        HealthStatus {
            status,
            version: SERVICE_VERSION.to_string(),
        }
    }

    /// Validate and classify one request. Blocks for the duration of inference.
    pub fn predict(&self, req: PredictionRequest) -> Result<PredictionResponse, ServiceError> {
        let started = Instant::now();
        let result = self.run_prediction(req);

        match &result {
            Ok(response) => {
                self.metrics
                    .record_prediction(started.elapsed(), &response.sentiment, response.confidence)
            }
            Err(e) => self.metrics.record_rejection(e),
        }

        result
    }

    fn run_prediction(&self, req: PredictionRequest) -> Result<PredictionResponse, ServiceError> {
        let text_len = req.char_len();
        info!(text_len = text_len, "Processing prediction request");

        if self.state() != ServiceState::Ready {
            warn!(state = ?self.state(), text_len = text_len, "Rejecting prediction, service not ready");
            return Err(ServiceError::NotReady);
        }

        if req.is_blank() {
            warn!(text_len = text_len, "Rejecting blank input");
            return Err(ServiceError::InvalidInput);
        }

        let classification = self.host.infer(&req.text).map_err(|e| {
            error!(text_len = text_len, error = %e, "Inference failed");
            ServiceError::InferenceFailure
        })?;

        if !(0.0..=1.0).contains(&classification.score) {
            error!(
                score = classification.score,
                label = %classification.label,
                "Engine returned confidence outside [0, 1]"
            );
            return Err(ServiceError::InferenceFailure);
        }

        Ok(PredictionResponse {
            text: req.text,
            sentiment: classification.label,
            confidence: classification.score,
            model_version: self.host.identifier().to_string(),
        })
    }
}
