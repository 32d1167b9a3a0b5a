//! Generation request submitted by the caller

use serde::{Deserialize, Serialize};

use crate::{Result, TypesError};

/// Brand voice applied to a generated book
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandConfig {
    pub name: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub palette: Vec<String>,
    #[serde(default)]
    pub mascot: Option<String>,
}

/// Optional story steering supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryConfig {
    #[serde(default)]
    pub protagonist: Option<String>,
    #[serde(default)]
    pub setting: Option<String>,
    #[serde(default)]
    pub moral: Option<String>,
    #[serde(default)]
    pub series_title: Option<String>,
}

/// A user's content request. Created by the caller and consumed once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The idea the book is built around
    pub prompt: String,
    pub style: String,
    pub tone: String,
    pub target_audience: String,
    pub page_count: u32,
    #[serde(default)]
    pub branching: bool,
    #[serde(default)]
    pub brand: Option<BrandConfig>,
    #[serde(default)]
    pub story: Option<StoryConfig>,
}

impl GenerationRequest {
    pub fn new(
        prompt: &str,
        style: &str,
        tone: &str,
        target_audience: &str,
        page_count: u32,
    ) -> Self {
        Self {
            prompt: prompt.to_string(),
            style: style.to_string(),
            tone: tone.to_string(),
            target_audience: target_audience.to_string(),
            page_count,
            branching: false,
            brand: None,
            story: None,
        }
    }

    /// Shape checks that do not depend on the caller's tier
    pub fn validate(&self) -> Result<()> {
        if self.page_count == 0 {
            return Err(TypesError::InvalidRequest("page_count must be at least 1".to_string()));
        }
        if self.style.trim().is_empty() {
            return Err(TypesError::InvalidRequest("style is required".to_string()));
        }
        Ok(())
    }
}
