//! Illustration pipeline
//!
//! Pages are addressed through an arena of `(chapter, page)` slots built in
//! reading order. Workers never hold a reference into the project; results
//! are written back by slot index once an attempt sequence finishes. A page
//! that exhausts its attempts simply keeps no image.

use bookforge_types::Project;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::progress::{band_percent, ProgressReporter};
use super::retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
use super::traits::ImageGenerator;
use crate::constants::{PROGRESS_ILLUSTRATION_END, PROGRESS_ILLUSTRATION_START};
use crate::error::{BookforgeError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct IllustrationSettings {
    pub policy: RetryPolicy,
    /// Pause before each illustrated page after the first (sequential mode only)
    pub throttle_delay: Duration,
    /// 1 = one page at a time in reading order
    pub concurrency: usize,
}

/// What happened during one illustration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IllustrationReport {
    pub total_pages: usize,
    pub attempted: usize,
    pub illustrated: usize,
    pub failed: usize,
    pub cancelled: bool,
}

#[derive(Debug)]
struct PageSlot {
    chapter: usize,
    page: usize,
    prompt: Option<String>,
}

fn page_slots(project: &Project) -> Vec<PageSlot> {
    project
        .chapters
        .iter()
        .enumerate()
        .flat_map(|(c, chapter)| {
            chapter.pages.iter().enumerate().map(move |(p, page)| PageSlot {
                chapter: c,
                page: p,
                prompt: page
                    .wants_illustration()
                    .then(|| page.image_prompt.clone())
                    .flatten(),
            })
        })
        .collect()
}

fn store(project: &mut Project, slot: &PageSlot, url: String) {
    project.chapters[slot.chapter].pages[slot.page].image_url = Some(url);
}

fn painting_label(page: usize, total: usize) -> String {
    format!("painting page {} of {}", page, total)
}

/// One image request. An empty reference counts as a failed attempt.
async fn request_image<I: ImageGenerator + ?Sized>(
    images: &I,
    prompt: &str,
    style: &str,
) -> Result<String> {
    let url = images.generate_image(prompt, style).await?;
    if url.trim().is_empty() {
        return Err(BookforgeError::IllustrationAttempt(
            "image service returned an empty reference".to_string(),
        ));
    }
    Ok(url)
}

/// Illustrate every page that carries a prompt, writing image references
/// into `project`. Never fails the run; per-page failures only show up in
/// the returned report.
pub async fn illustrate<I: ImageGenerator + ?Sized>(
    images: &I,
    project: &mut Project,
    settings: &IllustrationSettings,
    reporter: &ProgressReporter<'_>,
    cancel: &CancellationToken,
) -> IllustrationReport {
    let slots = page_slots(project);
    let style = project.style.clone();

    log::info!(
        "Illustrating project {}: {} pages, {} with prompts, concurrency {}",
        project.id,
        slots.len(),
        slots.iter().filter(|s| s.prompt.is_some()).count(),
        settings.concurrency
    );

    let report = if settings.concurrency <= 1 {
        illustrate_sequential(images, project, &slots, &style, settings, reporter, cancel).await
    } else {
        illustrate_concurrent(images, project, &slots, &style, settings, reporter, cancel).await
    };

    log::info!(
        "Illustration {}: {} of {} attempted pages illustrated, {} failed",
        if report.cancelled { "cancelled" } else { "finished" },
        report.illustrated,
        report.attempted,
        report.failed
    );

    report
}

async fn illustrate_sequential<I: ImageGenerator + ?Sized>(
    images: &I,
    project: &mut Project,
    slots: &[PageSlot],
    style: &str,
    settings: &IllustrationSettings,
    reporter: &ProgressReporter<'_>,
    cancel: &CancellationToken,
) -> IllustrationReport {
    let total = slots.len();
    let mut report = IllustrationReport {
        total_pages: total,
        ..IllustrationReport::default()
    };

    if total == 0 {
        reporter.report(PROGRESS_ILLUSTRATION_END, painting_label(0, 0));
        return report;
    }

    for (index, slot) in slots.iter().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        reporter.report(
            band_percent(PROGRESS_ILLUSTRATION_START, PROGRESS_ILLUSTRATION_END, index, total),
            painting_label(index + 1, total),
        );

        let Some(prompt) = slot.prompt.as_deref() else {
            log::debug!("Page {} has no illustration prompt, skipping", index + 1);
            continue;
        };

        if report.attempted > 0 && !settings.throttle_delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(settings.throttle_delay) => {}
            }
        }

        report.attempted += 1;
        let label = format!("illustration of page {}", index + 1);
        let outcome = retry_with_backoff(&settings.policy, cancel, &label, move |_| {
            request_image(images, prompt, style)
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded { value, .. } => {
                store(project, slot, value);
                report.illustrated += 1;
            }
            RetryOutcome::Exhausted { last_error, attempts } => {
                log::warn!(
                    "Page {} left without an image after {} attempt(s): {}",
                    index + 1,
                    attempts,
                    last_error
                );
                report.failed += 1;
            }
            RetryOutcome::Cancelled { .. } => {
                report.cancelled = true;
                break;
            }
        }
    }

    if !report.cancelled {
        reporter.report(PROGRESS_ILLUSTRATION_END, painting_label(total, total));
    }
    report
}

/// Bounded fan-out. The concurrency cap replaces the throttle sleep; write
/// back by slot index keeps page order independent of completion order.
async fn illustrate_concurrent<I: ImageGenerator + ?Sized>(
    images: &I,
    project: &mut Project,
    slots: &[PageSlot],
    style: &str,
    settings: &IllustrationSettings,
    reporter: &ProgressReporter<'_>,
    cancel: &CancellationToken,
) -> IllustrationReport {
    let total = slots.len();
    let work: Vec<(usize, String)> = slots
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| slot.prompt.clone().map(|p| (index, p)))
        .collect();

    let mut report = IllustrationReport {
        total_pages: total,
        attempted: work.len(),
        ..IllustrationReport::default()
    };

    // pages without prompts count as processed from the start
    let mut processed = total - work.len();
    let percent = band_percent(
        PROGRESS_ILLUSTRATION_START,
        PROGRESS_ILLUSTRATION_END,
        processed,
        total,
    );
    reporter.report(percent, painting_label((processed + 1).min(total), total));

    let policy = &settings.policy;
    let mut results = stream::iter(work.into_iter().map(move |(index, prompt)| async move {
        let label = format!("illustration of page {}", index + 1);
        let prompt = prompt.as_str();
        let outcome = retry_with_backoff(policy, cancel, &label, move |_| {
            request_image(images, prompt, style)
        })
        .await;
        (index, outcome)
    }))
    .buffer_unordered(settings.concurrency);

    while let Some((index, outcome)) = results.next().await {
        processed += 1;
        match outcome {
            RetryOutcome::Succeeded { value, .. } => {
                store(project, &slots[index], value);
                report.illustrated += 1;
            }
            RetryOutcome::Exhausted { last_error, attempts } => {
                log::warn!(
                    "Page {} left without an image after {} attempt(s): {}",
                    index + 1,
                    attempts,
                    last_error
                );
                report.failed += 1;
            }
            RetryOutcome::Cancelled { .. } => {
                report.cancelled = true;
                continue;
            }
        }

        if !report.cancelled {
            let percent = band_percent(
                PROGRESS_ILLUSTRATION_START,
                PROGRESS_ILLUSTRATION_END,
                processed,
                total,
            );
            reporter.report(percent, painting_label(processed, total));
        }
    }

    report.cancelled |= cancel.is_cancelled();
    if !report.cancelled {
        reporter.report(PROGRESS_ILLUSTRATION_END, painting_label(total, total));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::materializer::materialize;
    use crate::pipeline::progress::NoopObserver;
    use crate::pipeline::retry::Backoff;
    use async_trait::async_trait;
    use bookforge_types::{
        GenerationProgress, GenerationRequest, Outline, OutlineChapter, OutlinePage,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fails each prompt a scripted number of times before succeeding
    struct ScriptedImages {
        failures: Mutex<HashMap<String, u32>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedImages {
        fn new(failures: &[(&str, u32)]) -> Self {
            Self {
                failures: Mutex::new(failures.iter().map(|(p, n)| (p.to_string(), *n)).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageGenerator for ScriptedImages {
        async fn generate_image(&self, prompt: &str, _style: &str) -> Result<String> {
            self.calls.lock().unwrap().push(prompt.to_string());
            let mut failures = self.failures.lock().unwrap();
            match failures.get_mut(prompt) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    Ok(String::new())
                }
                _ => Ok(format!("https://img.test/{}", prompt.replace(' ', "-"))),
            }
        }
    }

    fn project(prompts: &[Option<&str>]) -> Project {
        let outline = Outline {
            chapters: vec![OutlineChapter {
                title: None,
                pages: prompts
                    .iter()
                    .map(|p| OutlinePage {
                        text: "text".to_string(),
                        image_prompt: p.map(str::to_string),
                        ..OutlinePage::default()
                    })
                    .collect(),
            }],
            ..Outline::default()
        };
        let request = GenerationRequest::new("idea", "ink", "calm", "all", prompts.len() as u32);
        materialize(outline, &request)
    }

    fn settings(concurrency: usize) -> IllustrationSettings {
        IllustrationSettings {
            policy: RetryPolicy::new(3, Backoff::Fixed(Duration::from_secs(2))),
            throttle_delay: Duration::from_secs(1),
            concurrency,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_order_and_throttle() {
        let images = ScriptedImages::new(&[]);
        let mut project = project(&[Some("one"), None, Some("two"), Some("three")]);
        let reporter_sink = NoopObserver;
        let reporter = ProgressReporter::new(&reporter_sink);
        let started = tokio::time::Instant::now();

        let cancel = CancellationToken::new();
        let report = illustrate(&images, &mut project, &settings(1), &reporter, &cancel).await;

        assert_eq!(images.calls(), vec!["one", "two", "three"]);
        assert_eq!(report.illustrated, 3);
        assert_eq!(report.attempted, 3);
        // throttle before "two" and "three" only
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert!(project.chapters[0].pages[1].image_url.is_none());
        assert_eq!(reporter.last().unwrap().percent, PROGRESS_ILLUSTRATION_END);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_reference_is_retried_with_delay() {
        let images = ScriptedImages::new(&[("fox", 2)]);
        let mut project = project(&[Some("fox")]);
        let observer = NoopObserver;
        let reporter = ProgressReporter::new(&observer);
        let started = tokio::time::Instant::now();

        let cancel = CancellationToken::new();
        let report = illustrate(&images, &mut project, &settings(1), &reporter, &cancel).await;

        assert_eq!(images.calls().len(), 3);
        assert_eq!(report.illustrated, 1);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(
            project.chapters[0].pages[0].image_url.as_deref(),
            Some("https://img.test/fox")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_page_keeps_no_image() {
        let images = ScriptedImages::new(&[("fox", 5)]);
        let mut project = project(&[Some("fox"), Some("owl")]);
        let observer = NoopObserver;
        let reporter = ProgressReporter::new(&observer);

        let cancel = CancellationToken::new();
        let report = illustrate(&images, &mut project, &settings(1), &reporter, &cancel).await;

        assert_eq!(images.calls().iter().filter(|c| *c == "fox").count(), 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.illustrated, 1);
        assert!(project.chapters[0].pages[0].image_url.is_none());
        assert!(project.chapters[0].pages[1].image_url.is_some());
    }

    #[tokio::test]
    async fn test_concurrent_preserves_page_order() {
        let images = ScriptedImages::new(&[("b", 1)]);
        let mut project = project(&[Some("a"), Some("b"), None, Some("c"), Some("d")]);
        let observer = NoopObserver;
        let reporter = ProgressReporter::new(&observer);
        let mut fast = settings(3);
        fast.policy = RetryPolicy::new(3, Backoff::Fixed(Duration::ZERO));

        let cancel = CancellationToken::new();
        let report = illustrate(&images, &mut project, &fast, &reporter, &cancel).await;

        assert_eq!(report.illustrated, 4);
        let urls: Vec<Option<String>> = project.pages().map(|p| p.image_url.clone()).collect();
        assert_eq!(
            urls,
            vec![
                Some("https://img.test/a".to_string()),
                Some("https://img.test/b".to_string()),
                None,
                Some("https://img.test/c".to_string()),
                Some("https://img.test/d".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_labels_count_from_page_one() {
        let images = ScriptedImages::new(&[]);
        let mut project = project(&[Some("a"), Some("b"), Some("c")]);
        let labels = Mutex::new(Vec::new());
        let observer = |p: &GenerationProgress| {
            labels.lock().unwrap().push(p.phase_label.clone());
        };
        let reporter = ProgressReporter::new(&observer);
        let mut fast = settings(2);
        fast.policy = RetryPolicy::new(1, Backoff::Fixed(Duration::ZERO));

        let cancel = CancellationToken::new();
        illustrate(&images, &mut project, &fast, &reporter, &cancel).await;

        let labels = labels.lock().unwrap().clone();
        assert_eq!(labels.first().map(String::as_str), Some("painting page 1 of 3"));
        assert_eq!(labels.last().map(String::as_str), Some("painting page 3 of 3"));
        assert!(!labels.iter().any(|l| l.contains("page 0")));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_touches_nothing() {
        let images = ScriptedImages::new(&[]);
        let mut project = project(&[Some("a"), Some("b")]);
        let observer = NoopObserver;
        let reporter = ProgressReporter::new(&observer);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = illustrate(&images, &mut project, &settings(1), &reporter, &cancel).await;

        assert!(report.cancelled);
        assert!(images.calls().is_empty());
        assert_eq!(project.illustrated_page_count(), 0);
    }

    #[tokio::test]
    async fn test_project_without_prompts() {
        let images = ScriptedImages::new(&[]);
        let mut project = project(&[None, None]);
        let observer = NoopObserver;
        let reporter = ProgressReporter::new(&observer);

        let cancel = CancellationToken::new();
        let report = illustrate(&images, &mut project, &settings(1), &reporter, &cancel).await;

        assert_eq!(report.attempted, 0);
        assert_eq!(report.total_pages, 2);
        assert!(images.calls().is_empty());
        assert_eq!(reporter.last().unwrap().phase_label, "painting page 2 of 2");
    }
}
