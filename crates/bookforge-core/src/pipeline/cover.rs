//! Cover generator: a single best-effort image request

use bookforge_types::Project;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::progress::ProgressReporter;
use super::retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
use super::traits::ImageGenerator;
use crate::constants::{PHASE_COMPLETE, PHASE_COVER, PROGRESS_COMPLETE, PROGRESS_COVER};
use crate::error::BookforgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverStatus {
    Generated,
    /// The attempt failed or returned nothing; the project has no cover
    Failed,
    Skipped,
    Cancelled,
}

/// Prompt for the cover, built from the project's title, style and synopsis
pub fn cover_prompt(project: &Project) -> String {
    let mut prompt = format!(
        "Book cover illustration for \"{}\" in a {} style.",
        project.title, project.style
    );
    if !project.synopsis.trim().is_empty() {
        prompt.push_str(" Story: ");
        prompt.push_str(project.synopsis.trim());
    }
    prompt
}

/// Request a cover and store it on `project`. Failures are logged and
/// swallowed. Reports the cover checkpoint before the attempt and 100%
/// after it, whatever the outcome, unless the run was cancelled.
pub async fn generate_cover<I: ImageGenerator + ?Sized>(
    images: &I,
    project: &mut Project,
    enabled: bool,
    call_timeout: Duration,
    reporter: &ProgressReporter<'_>,
    cancel: &CancellationToken,
) -> CoverStatus {
    if cancel.is_cancelled() {
        return CoverStatus::Cancelled;
    }

    reporter.report(PROGRESS_COVER, PHASE_COVER);

    let status = if enabled {
        attempt_cover(images, project, call_timeout, cancel).await
    } else {
        log::info!("Cover generation disabled, skipping");
        CoverStatus::Skipped
    };

    if status != CoverStatus::Cancelled {
        reporter.report(PROGRESS_COMPLETE, PHASE_COMPLETE);
    }
    status
}

async fn attempt_cover<I: ImageGenerator + ?Sized>(
    images: &I,
    project: &mut Project,
    call_timeout: Duration,
    cancel: &CancellationToken,
) -> CoverStatus {
    let prompt = cover_prompt(project);
    let style = project.style.as_str();
    let policy = RetryPolicy::once().with_timeout(call_timeout);

    let prompt_ref = prompt.as_str();
    let outcome = retry_with_backoff(&policy, cancel, "cover generation", move |_| {
        images.generate_image(prompt_ref, style)
    })
    .await;

    let error = match outcome {
        RetryOutcome::Succeeded { value, .. } if !value.trim().is_empty() => {
            log::info!("Cover generated for project {}", project.id);
            project.cover_image = Some(value);
            return CoverStatus::Generated;
        }
        RetryOutcome::Succeeded { .. } => BookforgeError::CoverGeneration(
            "image service returned an empty reference".to_string(),
        ),
        RetryOutcome::Exhausted { last_error, .. } => {
            BookforgeError::CoverGeneration(last_error.to_string())
        }
        RetryOutcome::Cancelled { .. } => return CoverStatus::Cancelled,
    };

    log::warn!("Continuing without a cover for project {}: {}", project.id, error);
    CoverStatus::Failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::materializer::materialize;
    use crate::pipeline::progress::NoopObserver;
    use bookforge_types::{GenerationRequest, Outline};

    fn project(synopsis: Option<&str>) -> Project {
        let outline = Outline {
            title: Some("Moon Pond".to_string()),
            synopsis: synopsis.map(str::to_string),
            ..Outline::default()
        };
        materialize(outline, &GenerationRequest::new("idea", "gouache", "calm", "all", 1))
    }

    #[test]
    fn test_prompt_includes_title_style_and_synopsis() {
        let prompt = cover_prompt(&project(Some("A frog learns to swim.")));
        assert!(prompt.contains("Moon Pond"));
        assert!(prompt.contains("gouache"));
        assert!(prompt.contains("A frog learns to swim."));

        let bare = cover_prompt(&project(None));
        assert!(!bare.contains("Story:"));
    }

    #[tokio::test]
    async fn test_disabled_cover_still_completes_progress() {
        struct Unused;

        #[async_trait::async_trait]
        impl ImageGenerator for Unused {
            async fn generate_image(&self, _: &str, _: &str) -> crate::error::Result<String> {
                panic!("cover generation is disabled");
            }
        }

        let mut project = project(None);
        let observer = NoopObserver;
        let reporter = ProgressReporter::new(&observer);

        let status = generate_cover(
            &Unused,
            &mut project,
            false,
            Duration::from_secs(1),
            &reporter,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(status, CoverStatus::Skipped);
        assert!(project.cover_image.is_none());
        assert_eq!(reporter.last().unwrap().percent, PROGRESS_COMPLETE);
    }
}
