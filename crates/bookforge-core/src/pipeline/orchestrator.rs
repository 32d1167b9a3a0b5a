//! Generation orchestrator
//!
//! Runs the stages strictly in order for one request:
//! quota gate -> structure -> materialize -> illustrate -> cover -> assemble.
//! Only pre-flight and structure failures abort the run. Illustration and
//! cover failures degrade the project instead.

use bookforge_types::{GenerationOutcome, GenerationRequest, Project, RunStatus, Tier};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::assembler::assemble;
use super::cover::{generate_cover, CoverStatus};
use super::illustration::{illustrate, IllustrationSettings};
use super::ledger::QuotaLedger;
use super::materializer::materialize;
use super::progress::{ProgressObserver, ProgressReporter};
use super::quota::check_quota;
use super::structure::generate_outline;
use super::traits::{ImageGenerator, TextGenerator};
use crate::config::PipelineConfig;
use crate::constants::{PHASE_MATERIALIZE, PROGRESS_STRUCTURE_DONE};
use crate::error::{BookforgeError, Result};

pub struct GenerationOrchestrator<T: TextGenerator, I: ImageGenerator> {
    text: T,
    images: I,
    config: PipelineConfig,
}

impl<T: TextGenerator, I: ImageGenerator> GenerationOrchestrator<T, I> {
    pub fn new(text: T, images: I, config: PipelineConfig) -> Self {
        Self { text, images, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Check the quota against a caller-supplied monthly count, then run.
    /// On success the caller is responsible for incrementing its counter.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        tier: Tier,
        current_monthly_count: u32,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        request.validate()?;
        check_quota(tier, request, current_monthly_count).into_result()?;
        self.run(request, observer, cancel).await
    }

    /// Reserve a quota slot, run, then commit the slot if the run completed.
    /// Failed and cancelled runs release it.
    ///
    /// Once a project exists it is always returned: a ledger error after the
    /// run is logged, and the unsettled reservation expires on its own.
    pub async fn generate_with_ledger<L: QuotaLedger + ?Sized>(
        &self,
        ledger: &L,
        account: &str,
        tier: Tier,
        request: &GenerationRequest,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        request.validate()?;
        let reservation = ledger.reserve(account, tier, request).map_err(normalize_failure)?;

        match self.run(request, observer, cancel).await {
            Ok(outcome) if outcome.is_complete() => {
                match ledger.commit(reservation) {
                    Ok(used) => log::info!(
                        "Account {} has used {} of {} generations this month",
                        account,
                        used,
                        tier.monthly_limit()
                    ),
                    Err(e) => log::error!(
                        "Failed to record generation of project {} for {}: {}",
                        outcome.project.id,
                        account,
                        e
                    ),
                }
                Ok(outcome)
            }
            Ok(outcome) => {
                if let Err(e) = ledger.release(reservation) {
                    log::error!("Failed to release quota reservation for {}: {}", account, e);
                }
                Ok(outcome)
            }
            Err(e) => {
                if let Err(release_err) = ledger.release(reservation) {
                    log::error!(
                        "Failed to release quota reservation for {}: {}",
                        account,
                        release_err
                    );
                }
                Err(e)
            }
        }
    }

    /// Run stages 2 to 7 for a request that has already passed the quota gate.
    ///
    /// Cancellation before the project exists yields `Err(Cancelled)`; after
    /// that it yields a cancelled outcome carrying every page illustrated so far.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let reporter = ProgressReporter::new(observer);
        log::info!(
            "Starting generation: {} pages, style '{}'",
            request.page_count,
            request.style
        );

        match self.run_stages(request, &reporter, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(BookforgeError::Cancelled) => {
                log::info!("Generation cancelled before a project was assembled");
                reporter.report_cancelled();
                Err(BookforgeError::Cancelled)
            }
            Err(e) => {
                log::error!("Generation failed: {}", e);
                Err(normalize_failure(e))
            }
        }
    }

    async fn run_stages(
        &self,
        request: &GenerationRequest,
        reporter: &ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let policy = self.config.structure_policy();
        let outline = generate_outline(&self.text, request, &policy, reporter, cancel).await?;
        if cancel.is_cancelled() {
            return Err(BookforgeError::Cancelled);
        }

        reporter.report(PROGRESS_STRUCTURE_DONE, PHASE_MATERIALIZE);
        let mut project = materialize(outline, request);

        let timings = self.config.timings();
        let settings = IllustrationSettings {
            policy: self.config.illustration_policy(),
            throttle_delay: timings.throttle_delay,
            concurrency: self.config.illustration_concurrency,
        };

        let illustration =
            illustrate(&self.images, &mut project, &settings, reporter, cancel).await;
        if illustration.cancelled {
            return Ok(self.cancelled(project, reporter).await);
        }

        let cover = generate_cover(
            &self.images,
            &mut project,
            self.config.cover_enabled,
            timings.call_timeout,
            reporter,
            cancel,
        )
        .await;
        if cover == CoverStatus::Cancelled {
            return Ok(self.cancelled(project, reporter).await);
        }

        Ok(assemble(project, RunStatus::Completed, timings.settle_delay).await)
    }

    async fn cancelled(
        &self,
        project: Project,
        reporter: &ProgressReporter<'_>,
    ) -> GenerationOutcome {
        log::info!(
            "Generation cancelled; returning project {} with {} illustrated pages",
            project.id,
            project.illustrated_page_count()
        );
        reporter.report_cancelled();
        assemble(project, RunStatus::Cancelled, Duration::ZERO).await
    }
}

/// Typed failures pass through; anything unexpected becomes a generic
/// failure carrying the underlying message.
fn normalize_failure(error: BookforgeError) -> BookforgeError {
    match error {
        e @ (BookforgeError::StructureGeneration(_)
        | BookforgeError::EmptyContent(_)
        | BookforgeError::QuotaExceeded { .. }
        | BookforgeError::PageLimitExceeded { .. }
        | BookforgeError::Validation(_)
        | BookforgeError::Generation(_)) => e,
        other => BookforgeError::Generation(other.to_string()),
    }
}
