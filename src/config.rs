//! Configuration management for the inference service

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Listening port (overridden by `PORT`)
    pub port: u16,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model name/version, also the artifact directory name
    pub identifier: String,
    /// Directory holding one sub-directory per model identifier
    pub models_dir: String,
    /// Number of intra-op threads for ONNX inference
    pub onnx_threads: usize,
    /// Tokens kept per input before truncation
    pub max_sequence_length: usize,
    /// Label per logit index when the artifact has no `config.json`
    pub labels: Vec<String>,
    /// Input classified once after load to warm the engine
    pub warmup_text: String,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between summaries, 0 disables the reporter
    pub report_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from defaults, the config file, `APP_*` variables and `PORT`
    pub fn load() -> Result<Self> {
        let path = std::env::var("APP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let port = std::env::var("PORT").ok();
        Self::load_with(path, port.as_deref())
    }

    /// Load configuration from a specific path with an optional `PORT` value
    pub fn load_with<P: AsRef<Path>>(path: P, port: Option<&str>) -> Result<Self> {
        let defaults = AppConfig::default();

        let mut builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("model.identifier", defaults.model.identifier)?
            .set_default("model.models_dir", defaults.model.models_dir)?
            .set_default("model.onnx_threads", defaults.model.onnx_threads as i64)?
            .set_default(
                "model.max_sequence_length",
                defaults.model.max_sequence_length as i64,
            )?
            .set_default("model.labels", defaults.model.labels)?
            .set_default("model.warmup_text", defaults.model.warmup_text)?
            .set_default(
                "metrics.report_interval_secs",
                defaults.metrics.report_interval_secs as i64,
            )?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("model.labels")
                    .try_parsing(true),
            );

        if let Some(port) = port {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got '{}'", port))?;
            builder = builder.set_override("server.port", port as i64)?;
        }

        let config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.model.identifier.trim().is_empty() {
            bail!("model.identifier must not be empty");
        }
        if self.model.max_sequence_length == 0 {
            bail!("model.max_sequence_length must be greater than zero");
        }
        if self.model.onnx_threads == 0 {
            bail!("model.onnx_threads must be greater than zero");
        }
        if self.model.labels.len() < 2 {
            bail!("model.labels needs at least two labels");
        }
        Ok(())
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            model: ModelConfig {
                identifier: "distilbert-base-uncased-finetuned-sst-2-english".to_string(),
                models_dir: "models".to_string(),
                onnx_threads: 1,
                max_sequence_length: 512,
                labels: vec!["NEGATIVE".to_string(), "POSITIVE".to_string()],
                warmup_text: "warmup".to_string(),
            },
            metrics: MetricsConfig {
                report_interval_secs: 60,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.labels, vec!["NEGATIVE", "POSITIVE"]);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_with("does/not/exist.toml", None).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.max_sequence_length, 512);
    }

    #[test]
    fn test_port_override() {
        let config = AppConfig::load_with("does/not/exist.toml", Some("9100")).unwrap();
        assert_eq!(config.server.port, 9100);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(AppConfig::load_with("does/not/exist.toml", Some("eighty")).is_err());
        assert!(AppConfig::load_with("does/not/exist.toml", Some("70000")).is_err());
    }

    #[test]
    fn test_file_values_and_port_precedence() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8500

[model]
identifier = "sst2-v1"
labels = ["NEG", "NEU", "POS"]
"#
        )
        .unwrap();

        let config = AppConfig::load_with(file.path(), None).unwrap();
        assert_eq!(config.server.port, 8500);
        assert_eq!(config.model.identifier, "sst2-v1");
        assert_eq!(config.model.labels.len(), 3);
        assert_eq!(config.model.models_dir, "models");

        let config = AppConfig::load_with(file.path(), Some("8001")).unwrap();
        assert_eq!(config.server.port, 8001);
    }

    #[test]
    fn test_validate_rejects_single_label() {
        let mut config = AppConfig::default();
        config.model.labels = vec!["POSITIVE".to_string()];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.model.identifier = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
