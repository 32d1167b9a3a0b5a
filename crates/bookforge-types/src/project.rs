//! Canonical, identity-bearing project graph

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChapterId, CharacterId, PageId, ProjectId};

/// Page layout. Unknown layout names from the text service are preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LayoutType {
    #[default]
    TextOnly,
    FullBleed,
    ImageTop,
    ImageLeft,
    Split,
    Other(String),
}

impl LayoutType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::TextOnly => "text-only",
            Self::FullBleed => "full-bleed",
            Self::ImageTop => "image-top",
            Self::ImageLeft => "image-left",
            Self::Split => "split",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for LayoutType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "text-only" | "text_only" | "textonly" => Self::TextOnly,
            "full-bleed" | "full_bleed" => Self::FullBleed,
            "image-top" | "image_top" => Self::ImageTop,
            "image-left" | "image_left" => Self::ImageLeft,
            "split" => Self::Split,
            _ => Self::Other(value),
        }
    }
}

impl From<LayoutType> for String {
    fn from(value: LayoutType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub page_number: u32,
    pub text: String,
    pub image_prompt: Option<String>,
    pub layout_type: LayoutType,
    pub choices: Vec<String>,
    pub narration_notes: Option<String>,
    pub interactive_element: Option<String>,
    pub learning_moment: Option<String>,
    pub vocabulary_words: Vec<String>,
    /// Absent until the illustration pipeline succeeds for this page
    pub image_url: Option<String>,
}

impl Page {
    /// Whether the page carries a prompt the illustration pipeline can use
    pub fn wants_illustration(&self) -> bool {
        self.image_prompt
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub description: String,
    pub visual_traits: Option<String>,
    pub visual_prompt: Option<String>,
    pub traits: Vec<String>,
}

/// The assembled artifact handed back to the caller.
///
/// Immutable once assembled except for `cover_image` and each page's
/// `image_url`, which the pipeline fills in while it owns the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub synopsis: String,
    pub style: String,
    pub tone: String,
    pub target_audience: String,
    pub branching: bool,
    pub chapters: Vec<Chapter>,
    pub characters: Vec<Character>,
    pub cover_image: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub decision_tree: Option<serde_json::Value>,
    pub back_matter: Option<serde_json::Value>,
    pub series_info: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Pages in reading order: chapter order, then page order
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.chapters.iter().flat_map(|c| c.pages.iter())
    }

    pub fn page_count(&self) -> usize {
        self.chapters.iter().map(|c| c.pages.len()).sum()
    }

    pub fn illustrated_page_count(&self) -> usize {
        self.pages().filter(|p| p.image_url.is_some()).count()
    }

    pub fn page(&self, id: &PageId) -> Option<&Page> {
        self.pages().find(|p| &p.id == id)
    }
}
