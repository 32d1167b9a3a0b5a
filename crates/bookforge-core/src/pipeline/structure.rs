//! Structure generator: one call to the text service, then validation

use bookforge_types::{GenerationRequest, Outline};
use tokio_util::sync::CancellationToken;

use super::progress::ProgressReporter;
use super::retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
use super::traits::TextGenerator;
use crate::constants::{PHASE_STRUCTURE, PROGRESS_START, PROGRESS_STRUCTURE_DONE};
use crate::error::{BookforgeError, Result};

/// Request an outline and validate it.
///
/// Progress only moves past the structure checkpoint once the outline has
/// passed validation. With the default policy there is a single attempt.
pub async fn generate_outline<T: TextGenerator + ?Sized>(
    text: &T,
    request: &GenerationRequest,
    policy: &RetryPolicy,
    reporter: &ProgressReporter<'_>,
    cancel: &CancellationToken,
) -> Result<Outline> {
    reporter.report(PROGRESS_START, PHASE_STRUCTURE);
    log::info!(
        "Requesting outline: {} pages, style '{}', audience '{}'",
        request.page_count,
        request.style,
        request.target_audience
    );

    let outcome = retry_with_backoff(policy, cancel, "structure generation", move |_| {
        text.generate_outline(request)
    })
    .await;

    let outline = match outcome {
        RetryOutcome::Succeeded { value, .. } => value,
        RetryOutcome::Cancelled { .. } => return Err(BookforgeError::Cancelled),
        RetryOutcome::Exhausted { last_error, attempts } => {
            log::error!(
                "Structure generation failed after {} attempt(s): {}",
                attempts,
                last_error
            );
            return Err(into_structure_error(last_error));
        }
    };

    validate_outline(&outline)?;

    log::info!(
        "Outline '{}' received: {} chapters, {} pages",
        outline.title.as_deref().unwrap_or("<untitled>"),
        outline.chapters.len(),
        outline.total_pages()
    );
    reporter.report(PROGRESS_STRUCTURE_DONE, PHASE_STRUCTURE);

    Ok(outline)
}

/// An outline is usable only if it has a chapter and that first chapter has pages
pub fn validate_outline(outline: &Outline) -> Result<()> {
    let first = outline
        .chapters
        .first()
        .ok_or_else(|| BookforgeError::EmptyContent("outline has no chapters".to_string()))?;

    if first.pages.is_empty() {
        return Err(BookforgeError::EmptyContent("first chapter has no pages".to_string()));
    }

    Ok(())
}

fn into_structure_error(error: BookforgeError) -> BookforgeError {
    match error {
        e @ (BookforgeError::StructureGeneration(_)
        | BookforgeError::EmptyContent(_)
        | BookforgeError::Cancelled) => e,
        other => BookforgeError::StructureGeneration(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookforge_types::{OutlineChapter, OutlinePage};

    #[test]
    fn test_rejects_outline_without_chapters() {
        let outline = Outline::default();
        assert!(matches!(
            validate_outline(&outline),
            Err(BookforgeError::EmptyContent(_))
        ));
    }

    #[test]
    fn test_rejects_empty_first_chapter() {
        let outline = Outline {
            chapters: vec![
                OutlineChapter::default(),
                OutlineChapter {
                    title: Some("Later".to_string()),
                    pages: vec![OutlinePage::default()],
                },
            ],
            ..Outline::default()
        };
        assert!(matches!(
            validate_outline(&outline),
            Err(BookforgeError::EmptyContent(_))
        ));
    }

    #[test]
    fn test_transport_errors_become_structure_errors() {
        let wrapped = into_structure_error(BookforgeError::ServiceUnavailable("502".to_string()));
        assert!(matches!(wrapped, BookforgeError::StructureGeneration(msg) if msg.contains("502")));

        let kept = into_structure_error(BookforgeError::Cancelled);
        assert!(matches!(kept, BookforgeError::Cancelled));
    }
}
