//! End-to-end contract tests driving the router with fake engines.

use anyhow::anyhow;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sentiment_inference_service::models::{Classification, EngineLoader, SentimentEngine};
use sentiment_inference_service::{
    create_router, InferenceService, LoadError, ModelHost, ServiceMetrics, ServiceState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use tower::ServiceExt;

/// Positive for anything mentioning "love", negative otherwise; faults on "<fault>"
struct KeywordEngine;

impl SentimentEngine for KeywordEngine {
    fn classify(&mut self, text: &str) -> anyhow::Result<Classification> {
        if text.contains("<fault>") {
            return Err(anyhow!("CUDA error: an illegal memory access was encountered"));
        }
        if text.to_lowercase().contains("love") {
            Ok(Classification::new("POSITIVE", 0.9987))
        } else {
            Ok(Classification::new("NEGATIVE", 0.91))
        }
    }
}

struct FakeLoader {
    fail: bool,
    constructions: Arc<AtomicUsize>,
}

impl EngineLoader for FakeLoader {
    fn load(&self, identifier: &str) -> Result<Box<dyn SentimentEngine>, LoadError> {
        self.constructions.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(LoadError::ArtifactUnavailable(format!(
                "models/{}/model.onnx not found",
                identifier
            )))
        } else {
            Ok(Box::new(KeywordEngine))
        }
    }
}

fn build(fail: bool) -> (Arc<InferenceService>, Router, Arc<AtomicUsize>) {
    let constructions = Arc::new(AtomicUsize::new(0));
    let loader = FakeLoader {
        fail,
        constructions: constructions.clone(),
    };
    let host = Arc::new(ModelHost::new("sst2-v1", Box::new(loader)));
    let service = Arc::new(InferenceService::new(host, Arc::new(ServiceMetrics::new())));
    let router = create_router(service.clone());
    (service, router, constructions)
}

fn health_request() -> Request<Body> {
    Request::builder().uri("/health").body(Body::empty()).unwrap()
}

fn predict_request(text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "text": text }).to_string()))
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_ready_service_serves_health_and_predictions() {
    let (service, router, _) = build(false);
    assert_eq!(service.initialize(), ServiceState::Ready);

    let response = router.clone().oneshot(health_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(health, serde_json::json!({"status": "healthy", "version": "1.0.0"}));

    let response = router.oneshot(predict_request("I love this")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body["text"], "I love this");
    assert_eq!(body["sentiment"], "POSITIVE");
    assert_eq!(body["modelVersion"], "sst2-v1");
    let confidence = body["confidence"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
}

#[tokio::test]
async fn test_failed_load_degrades_service() {
    let (service, router, _) = build(true);
    assert_eq!(service.initialize(), ServiceState::Degraded);

    let response = router.clone().oneshot(health_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_string(response).await;
    assert!(body.contains("\"unavailable\""));
    // Load detail stays internal
    assert!(!body.contains("model.onnx"));

    let response = router.oneshot(predict_request("anything")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_whitespace_input_is_400() {
    let (service, router, _) = build(false);
    service.initialize();

    let response = router.oneshot(predict_request("   ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_string(response).await,
        r#"{"detail":"Invalid input: text must be a non-empty string"}"#
    );
}

#[tokio::test]
async fn test_engine_fault_is_500_without_detail() {
    let (service, router, _) = build(false);
    service.initialize();

    let response = router.oneshot(predict_request("boom <fault>")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert_eq!(body, r#"{"detail":"Internal processing error"}"#);
    assert!(!body.contains("CUDA"));
}

#[tokio::test]
async fn test_initialize_constructs_engine_once() {
    let (service, _router, constructions) = build(false);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            tokio::task::spawn_blocking(move || service.initialize())
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(service.state(), ServiceState::Ready);
    assert_eq!(constructions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_predictions() {
    let (service, router, _) = build(false);
    service.initialize();

    let requests = (0..16).map(|i| {
        let router = router.clone();
        let text = if i % 2 == 0 { "I love this" } else { "this is awful" };
        async move {
            let response = router.oneshot(predict_request(text)).await.unwrap();
            (text, response.status(), body_string(response).await)
        }
    });

    for (text, status, body) in futures::future::join_all(requests).await {
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["text"], text);
    }

    assert_eq!(
        service.metrics().predictions_served.load(Ordering::Relaxed),
        16
    );
}

/// Blocks inside `load` until the test releases it
struct GatedLoader {
    entered: Arc<Barrier>,
    release: Arc<Barrier>,
}

impl EngineLoader for GatedLoader {
    fn load(&self, _identifier: &str) -> Result<Box<dyn SentimentEngine>, LoadError> {
        self.entered.wait();
        self.release.wait();
        Ok(Box::new(KeywordEngine))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_requests_while_model_loads_get_503() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let loader = GatedLoader {
        entered: entered.clone(),
        release: release.clone(),
    };
    let host = Arc::new(ModelHost::new("sst2-v1", Box::new(loader)));
    let service = Arc::new(InferenceService::new(host, Arc::new(ServiceMetrics::new())));
    let router = create_router(service.clone());

    let initializer = service.clone();
    let loading = std::thread::spawn(move || initializer.initialize());
    entered.wait();
    assert_eq!(service.state(), ServiceState::Initializing);

    let response = router.clone().oneshot(health_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_string(response).await.contains("unavailable"));

    let response = router.clone().oneshot(predict_request("I love this")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_string(response).await, r#"{"detail":"Service not ready"}"#);

    release.wait();
    assert_eq!(loading.join().unwrap(), ServiceState::Ready);

    let response = router.clone().oneshot(health_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = router.oneshot(predict_request("I love this")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
