//! Outline generation through an OpenAI-compatible chat completions API

use async_trait::async_trait;
use bookforge_types::{GenerationRequest, Outline};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client as HttpClient;
use serde_json::json;
use std::time::Duration;

use crate::config::TextServiceConfig;
use crate::error::{BookforgeError, Result};
use crate::pipeline::TextGenerator;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex"));

const SYSTEM_PROMPT: &str = "You are a children's book architect. Reply with a single JSON object \
describing the book: title, synopsis, chapters (each with title and pages), and characters. \
Each page has pageNumber, text, imagePrompt, layoutType and optional choices, narrationNotes, \
interactiveElement, learningMoment and vocabularyWords. Characters have name, description, \
visualTraits, visualPrompt and traits. You may add metadata, decisionTree, backMatter \
and seriesInfo.";

pub struct OpenAiTextClient {
    config: TextServiceConfig,
    http_client: HttpClient,
}

impl OpenAiTextClient {
    pub fn new(config: TextServiceConfig) -> Self {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, http_client }
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    fn build_prompt(&self, request: &GenerationRequest) -> String {
        let mut prompt = format!(
            "Create a {}-page book.\n\
            Idea: {}\n\
            Illustration style: {}\n\
            Tone: {}\n\
            Target audience: {}\n",
            request.page_count, request.prompt, request.style, request.tone, request.target_audience
        );

        if request.branching {
            prompt.push_str(
                "Make the story branching: give decision pages a list of choices \
                 and include a decisionTree.\n",
            );
        }

        if let Some(story) = &request.story {
            if let Some(protagonist) = &story.protagonist {
                prompt.push_str(&format!("Protagonist: {}\n", protagonist));
            }
            if let Some(setting) = &story.setting {
                prompt.push_str(&format!("Setting: {}\n", setting));
            }
            if let Some(moral) = &story.moral {
                prompt.push_str(&format!("Moral: {}\n", moral));
            }
            if let Some(series) = &story.series_title {
                prompt.push_str(&format!(
                    "Part of the series \"{}\"; include seriesInfo.\n",
                    series
                ));
            }
        }

        if let Some(brand) = &request.brand {
            prompt.push_str(&format!("Brand: {}\n", brand.name));
            if let Some(voice) = &brand.voice {
                prompt.push_str(&format!("Brand voice: {}\n", voice));
            }
            if !brand.palette.is_empty() {
                prompt.push_str(&format!("Palette: {}\n", brand.palette.join(", ")));
            }
            if let Some(mascot) = &brand.mascot {
                prompt.push_str(&format!("Feature the mascot: {}\n", mascot));
            }
        }

        prompt
    }
}

/// Parse the assistant reply, tolerating a fenced code block around the JSON
pub fn parse_outline(content: &str) -> Result<Outline> {
    let body = CODE_FENCE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or_else(|| content.trim());

    serde_json::from_str(body)
        .map_err(|e| BookforgeError::StructureGeneration(format!("Unparseable outline: {}", e)))
}

#[async_trait]
impl TextGenerator for OpenAiTextClient {
    async fn generate_outline(&self, request: &GenerationRequest) -> Result<Outline> {
        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": self.build_prompt(request) }
                ],
                "response_format": { "type": "json_object" },
                "temperature": self.config.temperature
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BookforgeError::ServiceUnavailable(format!(
                "Text service returned {}",
                response.status()
            )));
        }

        let result: serde_json::Value = response.json().await?;

        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                BookforgeError::Processing("No content in text service response".to_string())
            })?;

        parse_outline(content)
    }
}
