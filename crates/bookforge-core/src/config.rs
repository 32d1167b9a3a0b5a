//! Configuration management for bookforge

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants;
use crate::error::{BookforgeError, Result};
use crate::pipeline::retry::{Backoff, RetryPolicy};
use crate::pipeline::PipelineTimings;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookforgeConfig {
    pub text_service: TextServiceConfig,
    pub image_service: ImageServiceConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub quota: QuotaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextServiceConfig {
    pub api_key: String,

    #[serde(default = "default_text_model")]
    pub model: String,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageServiceConfig {
    pub api_key: String,

    #[serde(default = "default_image_model")]
    pub model: String,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_image_size")]
    pub size: String,

    #[serde(default = "default_service_timeout_secs")]
    pub timeout_secs: u64,
}

/// Pipeline tunables. Delays are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_illustration_attempts")]
    pub illustration_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_throttle_delay_ms")]
    pub throttle_delay_ms: u64,

    /// 1 keeps the strictly sequential page loop
    #[serde(default = "default_illustration_concurrency")]
    pub illustration_concurrency: usize,

    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_structure_attempts")]
    pub structure_attempts: u32,

    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub cover_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuotaConfig {
    /// JSON ledger file; when absent the caller supplies the monthly count
    #[serde(default)]
    pub ledger_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            illustration_attempts: default_illustration_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            throttle_delay_ms: default_throttle_delay_ms(),
            illustration_concurrency: default_illustration_concurrency(),
            settle_delay_ms: default_settle_delay_ms(),
            structure_attempts: default_structure_attempts(),
            call_timeout_secs: default_call_timeout_secs(),
            cover_enabled: true,
        }
    }
}

// Default functions
fn default_text_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_service_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.8
}

fn default_illustration_attempts() -> u32 {
    constants::ILLUSTRATION_MAX_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    constants::ILLUSTRATION_RETRY_DELAY_MS
}

fn default_throttle_delay_ms() -> u64 {
    constants::ILLUSTRATION_THROTTLE_DELAY_MS
}

fn default_illustration_concurrency() -> usize {
    1
}

fn default_settle_delay_ms() -> u64 {
    constants::RESULT_SETTLE_DELAY_MS
}

fn default_structure_attempts() -> u32 {
    1
}

fn default_call_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

impl PipelineConfig {
    /// Zero delays and a short timeout, for tests and dry runs
    pub fn immediate() -> Self {
        Self {
            retry_delay_ms: 0,
            throttle_delay_ms: 0,
            settle_delay_ms: 0,
            call_timeout_secs: 5,
            ..Self::default()
        }
    }

    fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn illustration_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.illustration_attempts,
            backoff: Backoff::Fixed(Duration::from_millis(self.retry_delay_ms)),
            attempt_timeout: Some(self.call_timeout()),
        }
    }

    pub fn structure_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.structure_attempts,
            backoff: Backoff::Fixed(Duration::from_millis(self.retry_delay_ms)),
            attempt_timeout: Some(self.call_timeout()),
        }
    }

    pub fn timings(&self) -> PipelineTimings {
        PipelineTimings {
            throttle_delay: Duration::from_millis(self.throttle_delay_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            call_timeout: self.call_timeout(),
        }
    }
}

impl BookforgeConfig {
    /// Load configuration from a JSON file, with `BOOKFORGE__`-style
    /// environment overrides (e.g. `BOOKFORGE__TEXT_SERVICE__API_KEY`)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BookforgeError::Config(format!("Failed to read config file: {}", e)))?;

        let settings = Config::builder()
            .add_source(File::from_str(&content, FileFormat::Json))
            .add_source(
                Environment::with_prefix("BOOKFORGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| BookforgeError::Config(format!("Failed to parse config: {}", e)))?;

        Self::from_settings(settings)
    }

    /// Load configuration from a JSON string (no environment layer)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()
            .map_err(|e| BookforgeError::Config(format!("Failed to parse config: {}", e)))?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> Result<Self> {
        let config: BookforgeConfig = settings
            .try_deserialize()
            .map_err(|e| BookforgeError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.text_service.api_key.is_empty() {
            return Err(BookforgeError::Config("Text service API key is required".to_string()));
        }

        if self.image_service.api_key.is_empty() {
            return Err(BookforgeError::Config("Image service API key is required".to_string()));
        }

        if self.pipeline.illustration_attempts == 0 || self.pipeline.structure_attempts == 0 {
            return Err(BookforgeError::Config("Attempt counts must be at least 1".to_string()));
        }

        if self.pipeline.illustration_concurrency == 0 {
            return Err(BookforgeError::Config(
                "illustration_concurrency must be at least 1".to_string(),
            ));
        }

        if self.pipeline.call_timeout_secs == 0 {
            return Err(BookforgeError::Config("call_timeout_secs must be positive".to_string()));
        }

        Ok(())
    }
}
