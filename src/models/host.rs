//! Owner of the single inference engine instance and its load lifecycle

use crate::error::{InferError, LoadError};
use crate::models::engine::{Classification, EngineLoader, SentimentEngine};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;
use tracing::{error, info};

/// Observable load state of a [`ModelHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loaded,
    Failed,
}

type LoadOutcome = Result<Mutex<Box<dyn SentimentEngine>>, LoadError>;

/// Holds exactly one engine, loaded at most once per process.
///
/// The outcome of the first `load()` is terminal: `Loaded` and `Failed`
/// never transition again and later calls replay the recorded result.
pub struct ModelHost {
    identifier: String,
    loader: Box<dyn EngineLoader>,
    outcome: OnceLock<LoadOutcome>,
}

impl ModelHost {
    /// Create an unloaded host for `identifier`
    pub fn new(identifier: impl Into<String>, loader: Box<dyn EngineLoader>) -> Self {
        Self {
            identifier: identifier.into(),
            loader,
            outcome: OnceLock::new(),
        }
    }

    /// Model name/version this host serves
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Construct and warm the engine. Blocks until done.
    ///
    /// Concurrent callers wait for the first attempt; the loader is never
    /// invoked a second time. A panicking loader is recorded as a failure.
    pub fn load(&self) -> Result<(), LoadError> {
        let outcome = self.outcome.get_or_init(|| {
            info!(model = %self.identifier, "Loading model");
            let started = Instant::now();

            let attempt = catch_unwind(AssertUnwindSafe(|| self.loader.load(&self.identifier)))
                .unwrap_or_else(|payload| {
                    Err(LoadError::ArtifactCorrupt(format!(
                        "loader panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });

            match attempt {
                Ok(engine) => {
                    info!(
                        model = %self.identifier,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Model loaded successfully"
                    );
                    Ok(Mutex::new(engine))
                }
                Err(e) => {
                    error!(model = %self.identifier, error = %e, "Failed to load model");
                    Err(e)
                }
            }
        });

        match outcome {
            Ok(_) => Ok(()),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn load_state(&self) -> LoadState {
        match self.outcome.get() {
            None => LoadState::Unloaded,
            Some(Ok(_)) => LoadState::Loaded,
            Some(Err(_)) => LoadState::Failed,
        }
    }

    /// Recorded cause, present only when `Failed`
    pub fn failure_reason(&self) -> Option<&LoadError> {
        self.outcome.get().and_then(|o| o.as_ref().err())
    }

    /// Classify `text` with the loaded engine.
    ///
    /// Calls are serialized on the engine lock. Any engine error or panic
    /// is surfaced as [`InferError::EngineFault`] and the engine keeps serving.
    pub fn infer(&self, text: &str) -> Result<Classification, InferError> {
        let engine = match self.outcome.get() {
            Some(Ok(engine)) => engine,
            _ => return Err(InferError::NotLoaded),
        };

        // The engine holds no invariants a failed call can break
        let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);

        match catch_unwind(AssertUnwindSafe(|| engine.classify(text))) {
            Ok(result) => result.map_err(|e| InferError::EngineFault(format!("{:#}", e))),
            Err(payload) => Err(InferError::EngineFault(format!(
                "engine panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
