//! Sentiment Inference Service - Main Entry Point
//!
//! Binds the HTTP listener, loads the model in the background and serves
//! health and prediction until shut down.

use anyhow::{Context, Result};
use sentiment_inference_service::{
    config::{AppConfig, LoggingConfig},
    create_router,
    metrics::{MetricsReporter, ServiceMetrics},
    models::{ModelHost, OnnxEngineLoader},
    service::InferenceService,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match AppConfig::load() {
        Ok(config) => {
            init_logging(&config.logging)?;
            config
        }
        Err(e) => {
            // Log through the default subscriber so the failure is not lost
            init_logging(&AppConfig::default().logging)?;
            error!(error = %format!("{:#}", e), "Failed to load configuration");
            return Err(e);
        }
    };

    info!("Starting Sentiment Inference Service");
    info!(
        model = %config.model.identifier,
        models_dir = %config.model.models_dir,
        onnx_threads = config.model.onnx_threads,
        max_sequence_length = config.model.max_sequence_length,
        "Configuration loaded"
    );

    let metrics = Arc::new(ServiceMetrics::new());

    let loader = OnnxEngineLoader::from_config(&config.model);
    let host = Arc::new(ModelHost::new(config.model.identifier.clone(), Box::new(loader)));
    let service = Arc::new(InferenceService::new(host, metrics.clone()));

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(address = %address, "Listening");

    // Requests arriving while the model loads observe NotReady
    let initializer = service.clone();
    tokio::spawn(async move {
        let task = tokio::task::spawn_blocking(move || initializer.initialize());
        match task.await {
            Ok(state) => info!(state = ?state, "Initialization finished"),
            Err(e) => error!(error = %e, "Initialization task failed"),
        }
    });

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    axum::serve(listener, create_router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("sentiment_inference_service={}", logging.level))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
