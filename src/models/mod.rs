//! Model lifecycle: engine seam, artifact loading and the model host

pub mod engine;
pub mod host;
pub mod loader;
pub mod onnx;

pub use engine::{Classification, EngineLoader, SentimentEngine};
pub use host::{LoadState, ModelHost};
pub use loader::OnnxEngineLoader;
pub use onnx::OnnxSentimentEngine;
