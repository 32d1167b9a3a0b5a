//! Project materializer: raw outline in, canonical project graph out

use bookforge_types::{
    Chapter, ChapterId, Character, CharacterId, GenerationRequest, LayoutType, Outline,
    OutlineChapter, OutlineCharacter, OutlinePage, Page, PageId, Project, ProjectId,
};
use chrono::Utc;

use crate::constants::{DEFAULT_CHAPTER_TITLE, DEFAULT_PROJECT_TITLE};

/// Build a project from `outline`. Pure apart from id and timestamp
/// generation; every image field is left empty.
pub fn materialize(outline: Outline, request: &GenerationRequest) -> Project {
    let mut position = 0u32;

    let chapters = outline
        .chapters
        .into_iter()
        .map(|chapter| materialize_chapter(chapter, &mut position))
        .collect::<Vec<_>>();

    let characters = outline
        .characters
        .unwrap_or_default()
        .into_iter()
        .map(materialize_character)
        .collect();

    let project = Project {
        id: ProjectId::new(),
        title: non_blank(outline.title).unwrap_or_else(|| DEFAULT_PROJECT_TITLE.to_string()),
        synopsis: outline.synopsis.unwrap_or_default(),
        style: request.style.clone(),
        tone: request.tone.clone(),
        target_audience: request.target_audience.clone(),
        branching: request.branching,
        chapters,
        characters,
        cover_image: None,
        metadata: outline.metadata,
        decision_tree: outline.decision_tree,
        back_matter: outline.back_matter,
        series_info: outline.series_info,
        created_at: Utc::now(),
    };

    log::info!(
        "Materialized project {} '{}': {} chapters, {} pages, {} characters",
        project.id,
        project.title,
        project.chapters.len(),
        project.page_count(),
        project.characters.len()
    );

    project
}

fn materialize_chapter(chapter: OutlineChapter, position: &mut u32) -> Chapter {
    let pages = chapter
        .pages
        .into_iter()
        .map(|page| {
            *position += 1;
            materialize_page(page, *position)
        })
        .collect();

    Chapter {
        id: ChapterId::new(),
        title: non_blank(chapter.title).unwrap_or_else(|| DEFAULT_CHAPTER_TITLE.to_string()),
        pages,
    }
}

fn materialize_page(page: OutlinePage, position: u32) -> Page {
    Page {
        id: PageId::new(),
        page_number: page.page_number.unwrap_or(position),
        text: page.text,
        image_prompt: page.image_prompt,
        layout_type: page.layout_type.map(LayoutType::from).unwrap_or_default(),
        choices: page.choices.unwrap_or_default(),
        narration_notes: page.narration_notes,
        interactive_element: page.interactive_element,
        learning_moment: page.learning_moment,
        vocabulary_words: page.vocabulary_words.unwrap_or_default(),
        image_url: None,
    }
}

fn materialize_character(character: OutlineCharacter) -> Character {
    Character {
        id: CharacterId::new(),
        name: character.name,
        description: character.description.unwrap_or_default(),
        visual_traits: character.visual_traits,
        visual_prompt: character.visual_prompt,
        traits: character.traits.unwrap_or_default(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest::new("a fox finds a lantern", "watercolor", "warm", "kids 4-6", 3)
    }

    fn outline() -> Outline {
        Outline {
            title: Some("The Lantern Fox".to_string()),
            synopsis: None,
            chapters: vec![
                OutlineChapter {
                    title: None,
                    pages: vec![
                        OutlinePage {
                            text: "The fox woke.".to_string(),
                            image_prompt: Some("a fox at dusk".to_string()),
                            ..OutlinePage::default()
                        },
                        OutlinePage {
                            page_number: Some(7),
                            text: "It walked.".to_string(),
                            layout_type: Some("full-bleed".to_string()),
                            choices: Some(vec!["left".to_string(), "right".to_string()]),
                            ..OutlinePage::default()
                        },
                    ],
                },
                OutlineChapter {
                    title: Some("Night".to_string()),
                    pages: vec![OutlinePage {
                        text: "Stars.".to_string(),
                        ..OutlinePage::default()
                    }],
                },
            ],
            characters: Some(vec![OutlineCharacter {
                name: "Fox".to_string(),
                visual_prompt: Some("small red fox".to_string()),
                ..OutlineCharacter::default()
            }]),
            ..Outline::default()
        }
    }

    #[test]
    fn test_applies_defaults() {
        let project = materialize(outline(), &request());

        assert_eq!(project.title, "The Lantern Fox");
        assert_eq!(project.synopsis, "");
        assert_eq!(project.style, "watercolor");
        assert_eq!(project.chapters[0].title, DEFAULT_CHAPTER_TITLE);
        assert_eq!(project.chapters[1].title, "Night");

        let first = &project.chapters[0].pages[0];
        assert_eq!(first.layout_type, LayoutType::TextOnly);
        assert!(first.choices.is_empty());
        assert!(first.image_url.is_none());

        let second = &project.chapters[0].pages[1];
        assert_eq!(second.layout_type, LayoutType::FullBleed);
        assert_eq!(second.choices.len(), 2);

        assert_eq!(project.characters[0].description, "");
        assert!(project.cover_image.is_none());
    }

    #[test]
    fn test_blank_title_falls_back() {
        let mut raw = outline();
        raw.title = Some("   ".to_string());
        assert_eq!(materialize(raw, &request()).title, DEFAULT_PROJECT_TITLE);

        let mut raw = outline();
        raw.title = None;
        assert_eq!(materialize(raw, &request()).title, DEFAULT_PROJECT_TITLE);
    }

    #[test]
    fn test_page_numbers_follow_reading_order() {
        let project = materialize(outline(), &request());
        let numbers: Vec<u32> = project.pages().map(|p| p.page_number).collect();

        // explicit numbers from the service win over the position
        assert_eq!(numbers, vec![1, 7, 3]);
    }

    #[test]
    fn test_identities_are_unique() {
        let project = materialize(outline(), &request());
        let mut ids: Vec<String> = project.pages().map(|p| p.id.to_string()).collect();
        ids.extend(project.chapters.iter().map(|c| c.id.to_string()));
        ids.push(project.id.to_string());
        ids.push(project.characters[0].id.to_string());

        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_rerun_differs_only_in_identity() {
        let a = materialize(outline(), &request());
        let b = materialize(outline(), &request());

        assert_ne!(a.id, b.id);
        assert_eq!(a.title, b.title);
        assert_eq!(a.chapters.len(), b.chapters.len());

        for (ca, cb) in a.chapters.iter().zip(&b.chapters) {
            assert_ne!(ca.id, cb.id);
            assert_eq!(ca.title, cb.title);
            for (pa, pb) in ca.pages.iter().zip(&cb.pages) {
                assert_ne!(pa.id, pb.id);
                let pb = Page { id: pa.id.clone(), ..pb.clone() };
                assert_eq!(pa, &pb);
            }
        }
    }
}
