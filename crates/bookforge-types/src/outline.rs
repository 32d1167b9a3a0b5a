//! Raw book structure as returned by the text-generation service
//!
//! Nothing here is trusted: every field the service may omit is optional or
//! defaulted, and validation happens in the pipeline before materialization.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlinePage {
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image_prompt: Option<String>,
    #[serde(default)]
    pub layout_type: Option<String>,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub narration_notes: Option<String>,
    #[serde(default)]
    pub interactive_element: Option<String>,
    #[serde(default)]
    pub learning_moment: Option<String>,
    #[serde(default)]
    pub vocabulary_words: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineChapter {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub pages: Vec<OutlinePage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineCharacter {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visual_traits: Option<String>,
    #[serde(default)]
    pub visual_prompt: Option<String>,
    #[serde(default)]
    pub traits: Option<Vec<String>>,
}

/// Transient: produced by the text service, consumed once by the materializer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub chapters: Vec<OutlineChapter>,
    #[serde(default)]
    pub characters: Option<Vec<OutlineCharacter>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub decision_tree: Option<serde_json::Value>,
    #[serde(default)]
    pub back_matter: Option<serde_json::Value>,
    #[serde(default)]
    pub series_info: Option<serde_json::Value>,
}

impl Outline {
    pub fn total_pages(&self) -> usize {
        self.chapters.iter().map(|c| c.pages.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_shape() {
        let json = r#"{
            "title": "The Lantern Fox",
            "chapters": [
                {
                    "title": "Dusk",
                    "pages": [
                        { "pageNumber": 1, "text": "The fox woke.", "imagePrompt": "a fox at dusk", "layoutType": "full-bleed" },
                        { "pageNumber": 2, "text": "It walked.", "vocabularyWords": ["dusk"] }
                    ]
                }
            ],
            "characters": [{ "name": "Fox", "visualPrompt": "small red fox" }],
            "decisionTree": { "root": 1 }
        }"#;

        let outline: Outline = serde_json::from_str(json).unwrap();
        assert_eq!(outline.title.as_deref(), Some("The Lantern Fox"));
        assert!(outline.synopsis.is_none());
        assert_eq!(outline.total_pages(), 2);

        let second = &outline.chapters[0].pages[1];
        assert!(second.image_prompt.is_none());
        assert_eq!(second.vocabulary_words.as_ref().unwrap()[0], "dusk");
        assert!(outline.decision_tree.is_some());
    }

    #[test]
    fn test_missing_chapters_is_empty() {
        let outline: Outline = serde_json::from_str(r#"{ "title": "Nothing" }"#).unwrap();
        assert!(outline.chapters.is_empty());
    }
}
