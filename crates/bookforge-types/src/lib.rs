//! Shared types for the bookforge generation pipeline
//!
//! Everything that crosses a crate boundary lives here: the caller's request,
//! tier reference data, the raw outline returned by the text service, the
//! canonical project graph, and progress/outcome records.

pub mod ids;
pub mod outline;
pub mod progress;
pub mod project;
pub mod request;
pub mod tier;

pub use ids::{ChapterId, CharacterId, PageId, ProjectId};
pub use outline::{Outline, OutlineChapter, OutlineCharacter, OutlinePage};
pub use progress::{GenerationOutcome, GenerationProgress, RunStatus};
pub use project::{Chapter, Character, LayoutType, Page, Project};
pub use request::{BrandConfig, GenerationRequest, StoryConfig};
pub use tier::{Tier, TierLimits};

/// Errors raised while parsing or validating shared types
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, TypesError>;
