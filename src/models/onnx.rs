//! ONNX Runtime sequence-classification engine

use crate::models::engine::{Classification, SentimentEngine};
use anyhow::{anyhow, Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

/// Transformer text classifier backed by an ONNX session and a
/// HuggingFace tokenizer
pub struct OnnxSentimentEngine {
    /// ONNX Runtime session (needs `&mut` to run)
    session: Session,
    /// Tokenizer with truncation already configured
    tokenizer: Tokenizer,
    /// Label for each logit index
    labels: Vec<String>,
    /// Output holding the logits
    output_name: String,
    /// Whether the graph declares a `token_type_ids` input (BERT does, DistilBERT does not)
    uses_token_type_ids: bool,
}

impl OnnxSentimentEngine {
    pub fn new(session: Session, tokenizer: Tokenizer, labels: Vec<String>) -> Self {
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name == "logits")
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "logits".to_string());

        let uses_token_type_ids = session.inputs.iter().any(|i| i.name == "token_type_ids");

        Self {
            session,
            tokenizer,
            labels,
            output_name,
            uses_token_type_ids,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Run the graph and return the raw logits for one input
    fn run_logits(&mut self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenization failed: {}", e))?;

        let seq_len = encoding.get_ids().len();
        if seq_len == 0 {
            return Err(anyhow!("tokenizer produced no tokens"));
        }

        let shape = vec![1_i64, seq_len as i64];
        let to_i64 = |v: &[u32]| v.iter().map(|&x| x as i64).collect::<Vec<i64>>();

        let input_ids = Tensor::from_array((shape.clone(), to_i64(encoding.get_ids())))
            .context("Failed to create input_ids tensor")?;
        let attention_mask = Tensor::from_array((shape.clone(), to_i64(encoding.get_attention_mask())))
            .context("Failed to create attention_mask tensor")?;

        let outputs = if self.uses_token_type_ids {
            let token_type_ids = Tensor::from_array((shape, to_i64(encoding.get_type_ids())))
                .context("Failed to create token_type_ids tensor")?;
            self.session.run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids
            ])?
        } else {
            self.session.run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask
            ])?
        };

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| anyhow!("output '{}' missing from session results", self.output_name))?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .context("Failed to extract logits tensor")?;

        debug!(tokens = seq_len, logits = ?data, "Forward pass complete");

        Ok(data.to_vec())
    }
}

impl SentimentEngine for OnnxSentimentEngine {
    fn classify(&mut self, text: &str) -> Result<Classification> {
        let logits = self.run_logits(text)?;
        top_label(&logits, &self.labels)
    }
}

/// Numerically stable softmax
pub(crate) fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .map(|&l| l as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Pick the most probable label from a `[num_labels]` logits row
pub(crate) fn top_label(logits: &[f32], labels: &[String]) -> Result<Classification> {
    if logits.len() != labels.len() {
        return Err(anyhow!(
            "model produced {} logits for {} labels",
            logits.len(),
            labels.len()
        ));
    }
    if logits.iter().any(|l| !l.is_finite()) {
        return Err(anyhow!("non-finite logits: {:?}", logits));
    }

    let probs = softmax(logits);
    let (idx, score) = probs
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| anyhow!("empty logits"))?;

    Ok(Classification::new(labels[idx].clone(), score))
}
