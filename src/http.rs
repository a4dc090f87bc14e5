//! HTTP boundary: `GET /health` and `POST /predict`

use crate::error::ServiceError;
use crate::service::InferenceService;
use crate::types::{ErrorBody, PredictionRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, warn};

/// Build the service router
pub fn create_router(service: Arc<InferenceService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .with_state(service)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            detail: self.public_message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// 200 when ready, 503 otherwise. Always carries the status body.
pub async fn health_handler(State(service): State<Arc<InferenceService>>) -> Response {
    let health = service.check_health();
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health)).into_response()
}

/// Runs the prediction on the blocking pool so inference never stalls the executor
pub async fn predict_handler(
    State(service): State<Arc<InferenceService>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed prediction request");
            service.metrics().record_rejection(&ServiceError::InvalidInput);
            return ServiceError::InvalidInput.into_response();
        }
    };

    let worker = service.clone();
    match tokio::task::spawn_blocking(move || worker.predict(request)).await {
        Ok(Ok(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            error!(error = %e, "Prediction task failed");
            service
                .metrics()
                .record_rejection(&ServiceError::InferenceFailure);
            ServiceError::InferenceFailure.into_response()
        }
    }
}
