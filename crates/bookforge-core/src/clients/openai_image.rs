//! Illustration requests against an OpenAI-compatible images API

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::ImageServiceConfig;
use crate::error::{BookforgeError, Result};
use crate::pipeline::ImageGenerator;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiImageClient {
    config: ImageServiceConfig,
    http_client: HttpClient,
}

impl OpenAiImageClient {
    pub fn new(config: ImageServiceConfig) -> Self {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, http_client }
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/images/generations", base.trim_end_matches('/'))
    }
}

/// Pull the image reference out of an images response: a hosted URL, an
/// inline base64 payload turned into a data URI, or an empty string
pub fn image_reference(result: &Value) -> Result<String> {
    let first = &result["data"][0];

    if let Some(url) = first["url"].as_str() {
        return Ok(url.to_string());
    }

    if let Some(encoded) = first["b64_json"].as_str() {
        // re-encode so a corrupt payload fails here, not in a viewer
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| BookforgeError::Processing(format!("Invalid base64 image: {}", e)))?;
        return Ok(format!("data:image/png;base64,{}", STANDARD.encode(bytes)));
    }

    Ok(String::new())
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    async fn generate_image(&self, prompt: &str, style: &str) -> Result<String> {
        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.model,
                "prompt": format!("{} Art style: {}.", prompt, style),
                "n": 1,
                "size": self.config.size
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BookforgeError::ServiceUnavailable(format!(
                "Image service returned {}",
                response.status()
            )));
        }

        let result: Value = response.json().await?;
        image_reference(&result)
    }
}
