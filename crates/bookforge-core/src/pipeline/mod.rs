//! The generation pipeline and its stages

use std::time::Duration;

pub mod assembler;
pub mod cover;
pub mod illustration;
pub mod ledger;
pub mod materializer;
pub mod orchestrator;
pub mod progress;
pub mod quota;
pub mod retry;
pub mod structure;
pub mod traits;

pub use assembler::assemble;
pub use cover::{cover_prompt, generate_cover, CoverStatus};
pub use illustration::{illustrate, IllustrationReport, IllustrationSettings};
pub use ledger::{FileQuotaLedger, InMemoryQuotaLedger, QuotaLedger, QuotaReservation, QuotaUsage};
pub use materializer::materialize;
pub use orchestrator::GenerationOrchestrator;
pub use progress::{band_percent, NoopObserver, ProgressObserver, ProgressReporter};
pub use quota::{check_quota, DenialReason, QuotaDecision};
pub use retry::{retry_with_backoff, Backoff, RetryOutcome, RetryPolicy};
pub use structure::{generate_outline, validate_outline};
pub use traits::{ImageGenerator, TextGenerator};

/// Fixed waits used by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTimings {
    pub throttle_delay: Duration,
    pub settle_delay: Duration,
    pub call_timeout: Duration,
}
