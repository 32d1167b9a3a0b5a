//! Result assembler: the run's single terminal event

use bookforge_types::{GenerationOutcome, Project, RunStatus};
use std::time::Duration;

/// Wrap the finished project. A completed run waits `settle_delay` first so
/// an observer can show the 100% state; a cancelled run returns at once.
pub async fn assemble(
    project: Project,
    status: RunStatus,
    settle_delay: Duration,
) -> GenerationOutcome {
    if status == RunStatus::Completed && !settle_delay.is_zero() {
        tokio::time::sleep(settle_delay).await;
    }

    log::info!(
        "Project {} assembled ({:?}): {} of {} pages illustrated, cover {}",
        project.id,
        status,
        project.illustrated_page_count(),
        project.page_count(),
        if project.cover_image.is_some() { "present" } else { "absent" }
    );

    GenerationOutcome { status, project }
}
