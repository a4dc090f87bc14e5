//! Versioned model artifact loader

use crate::config::ModelConfig;
use crate::error::LoadError;
use crate::models::engine::{EngineLoader, SentimentEngine};
use crate::models::onnx::OnnxSentimentEngine;
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{info, warn};

const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const LABEL_CONFIG_FILE: &str = "config.json";

/// Files making up one model artifact
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub model: PathBuf,
    pub tokenizer: PathBuf,
    pub label_config: PathBuf,
}

impl ArtifactPaths {
    pub fn resolve(models_dir: &Path, identifier: &str) -> Self {
        let dir = models_dir.join(identifier);
        Self {
            model: dir.join(MODEL_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            label_config: dir.join(LABEL_CONFIG_FILE),
            dir,
        }
    }
}

/// Subset of a HuggingFace `config.json` we care about
#[derive(Debug, Deserialize)]
struct LabelConfig {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Loads `{models_dir}/{identifier}/` into an [`OnnxSentimentEngine`]
pub struct OnnxEngineLoader {
    models_dir: PathBuf,
    onnx_threads: usize,
    max_sequence_length: usize,
    default_labels: Vec<String>,
    warmup_text: String,
}

impl OnnxEngineLoader {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            models_dir: PathBuf::from(&config.models_dir),
            onnx_threads: config.onnx_threads,
            max_sequence_length: config.max_sequence_length,
            default_labels: config.labels.clone(),
            warmup_text: config.warmup_text.clone(),
        }
    }

    /// Check that every required file is present
    fn locate(&self, identifier: &str) -> Result<ArtifactPaths, LoadError> {
        let paths = ArtifactPaths::resolve(&self.models_dir, identifier);

        if !paths.dir.is_dir() {
            return Err(LoadError::ArtifactUnavailable(format!(
                "model directory {} not found",
                paths.dir.display()
            )));
        }
        for required in [&paths.model, &paths.tokenizer] {
            if !required.is_file() {
                return Err(LoadError::ArtifactUnavailable(format!(
                    "{} not found",
                    required.display()
                )));
            }
        }

        Ok(paths)
    }

    /// Label set from `config.json` when present, configured labels otherwise
    fn load_labels(&self, path: &Path) -> Result<Vec<String>, LoadError> {
        if !path.is_file() {
            return Ok(self.default_labels.clone());
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            LoadError::ArtifactUnavailable(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: LabelConfig = serde_json::from_str(&raw).map_err(|e| {
            LoadError::ArtifactCorrupt(format!("failed to parse {}: {}", path.display(), e))
        })?;

        if config.id2label.is_empty() {
            warn!(path = %path.display(), "No id2label in model config, using configured labels");
            return Ok(self.default_labels.clone());
        }

        labels_from_id2label(&config.id2label)
            .map_err(|e| LoadError::ArtifactCorrupt(format!("{}: {}", path.display(), e)))
    }

    fn load_tokenizer(&self, path: &Path) -> Result<Tokenizer, LoadError> {
        let mut tokenizer = Tokenizer::from_file(path).map_err(|e| {
            LoadError::ArtifactCorrupt(format!("failed to load tokenizer {}: {}", path.display(), e))
        })?;

        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: self.max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| LoadError::ArtifactCorrupt(format!("invalid truncation setup: {}", e)))?;

        Ok(tokenizer)
    }

    fn load_session(&self, path: &Path) -> Result<Session, LoadError> {
        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let build = || -> anyhow::Result<Session> {
            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(self.onnx_threads)?
                .commit_from_file(path)?;
            Ok(session)
        };

        build().map_err(|e| classify_runtime_error(&format!("{}: {:#}", path.display(), e)))
    }
}

impl EngineLoader for OnnxEngineLoader {
    fn load(&self, identifier: &str) -> Result<Box<dyn SentimentEngine>, LoadError> {
        let paths = self.locate(identifier)?;
        let labels = self.load_labels(&paths.label_config)?;
        let tokenizer = self.load_tokenizer(&paths.tokenizer)?;
        let session = self.load_session(&paths.model)?;

        let mut engine = OnnxSentimentEngine::new(session, tokenizer, labels);

        let warm = engine.classify(&self.warmup_text).map_err(|e| {
            LoadError::ArtifactCorrupt(format!("warm-up inference failed: {:#}", e))
        })?;

        info!(
            model = %identifier,
            labels = ?engine.labels(),
            warmup_label = %warm.label,
            warmup_score = warm.score,
            "Engine warmed up"
        );

        Ok(Box::new(engine))
    }
}

/// Turn an `id2label` map into an index-ordered label list.
///
/// Keys must be exactly `0..n`.
fn labels_from_id2label(map: &HashMap<String, String>) -> Result<Vec<String>, String> {
    let mut indexed = Vec::with_capacity(map.len());
    for (key, label) in map {
        let idx: usize = key
            .parse()
            .map_err(|_| format!("id2label key '{}' is not an index", key))?;
        indexed.push((idx, label.clone()));
    }
    indexed.sort_by_key(|(idx, _)| *idx);

    for (expected, (idx, _)) in indexed.iter().enumerate() {
        if *idx != expected {
            return Err(format!("id2label is missing index {}", expected));
        }
    }

    if indexed.len() < 2 {
        return Err("a classifier needs at least two labels".to_string());
    }

    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

/// Map an ONNX Runtime failure to the load taxonomy
fn classify_runtime_error(message: &str) -> LoadError {
    let lower = message.to_lowercase();
    if lower.contains("out of memory") || lower.contains("failed to allocate") || lower.contains("bad_alloc") {
        LoadError::ResourceExhausted(message.to_string())
    } else {
        LoadError::ArtifactCorrupt(message.to_string())
    }
}
