//! Load Client
//!
//! Sends sample prediction requests to a running inference service and
//! tallies the responses by status code.

use futures::StreamExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const POSITIVE_SAMPLES: &[&str] = &[
    "I love building scalable microservices with Docker and Kubernetes!",
    "The support team was wonderful and fixed my issue in minutes.",
    "Absolutely fantastic performance, I would recommend it to anyone.",
    "What a delightful little cafe, the coffee was perfect.",
];

const NEGATIVE_SAMPLES: &[&str] = &[
    "The update broke everything and nobody seems to care.",
    "Terrible experience, the package arrived damaged and late.",
    "I regret buying this, it stopped working after two days.",
    "The movie was boring and far too long.",
];

const BLANK_SAMPLES: &[&str] = &["", "   ", "\n\t"];

#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    sentiment: String,
    confidence: f64,
    #[serde(rename = "modelVersion")]
    model_version: String,
}

/// Picks request payloads
struct SampleGenerator {
    rng: rand::rngs::ThreadRng,
    blank_rate: f64,
}

impl SampleGenerator {
    fn new(blank_rate: f64) -> Self {
        Self {
            rng: rand::thread_rng(),
            blank_rate,
        }
    }

    fn next_text(&mut self) -> &'static str {
        if self.rng.gen_bool(self.blank_rate) {
            return self.random_choice(BLANK_SAMPLES);
        }
        if self.rng.gen_bool(0.5) {
            self.random_choice(POSITIVE_SAMPLES)
        } else {
            self.random_choice(NEGATIVE_SAMPLES)
        }
    }

    fn random_choice(&mut self, choices: &[&'static str]) -> &'static str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("load_client=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let count: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let blank_rate: f64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.1_f64)
        .clamp(0.0, 1.0);
    let concurrency: usize = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(4).max(1);

    info!(
        base_url = %base_url,
        count = count,
        blank_rate = blank_rate,
        concurrency = concurrency,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    match client.get(format!("{}/health", base_url)).send().await {
        Ok(response) => {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            info!(status = %status, body = %body, "Health check");
        }
        Err(e) => {
            warn!(error = %e, "Service unreachable");
            return Ok(());
        }
    }

    let texts: Vec<&'static str> = {
        let mut generator = SampleGenerator::new(blank_rate);
        (0..count).map(|_| generator.next_text()).collect()
    };

    let started = Instant::now();
    let predict_url = format!("{}/predict", base_url);

    let outcomes: Vec<Option<u16>> = futures::stream::iter(texts)
        .map(|text| {
            let client = client.clone();
            let url = predict_url.clone();
            async move {
                match client.post(&url).json(&PredictionRequest { text }).send().await {
                    Ok(response) => {
                        let status = response.status();
                        if status.is_success() {
                            match response.json::<PredictionResponse>().await {
                                Ok(prediction) => info!(
                                    text_len = text.len(),
                                    sentiment = %prediction.sentiment,
                                    confidence = format!("{:.4}", prediction.confidence),
                                    model = %prediction.model_version,
                                    "Prediction"
                                ),
                                Err(e) => warn!(error = %e, "Unreadable prediction body"),
                            }
                        } else {
                            let body = response.text().await.unwrap_or_default();
                            warn!(status = %status, body = %body, "Prediction rejected");
                        }
                        Some(status.as_u16())
                    }
                    Err(e) => {
                        warn!(error = %e, "Request failed");
                        None
                    }
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let elapsed = started.elapsed();
    let mut tally: BTreeMap<String, usize> = BTreeMap::new();
    for outcome in &outcomes {
        let key = outcome
            .map(|s| s.to_string())
            .unwrap_or_else(|| "transport_error".to_string());
        *tally.entry(key).or_insert(0) += 1;
    }

    info!(
        requests = outcomes.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        rate = format!("{:.1} req/s", outcomes.len() as f64 / elapsed.as_secs_f64().max(1e-9)),
        "Run complete"
    );
    for (status, n) in &tally {
        info!("  {:>15}: {}", status, n);
    }

    Ok(())
}
