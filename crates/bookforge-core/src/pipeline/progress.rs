//! Progress reporting for one pipeline run
//!
//! The [`ProgressReporter`] is the only writer of the run's
//! [`GenerationProgress`]. Stages call [`ProgressReporter::report`]; none of
//! them read the value back to make decisions. Percentages are clamped to the
//! running maximum so observers always see a non-decreasing sequence.

use bookforge_types::GenerationProgress;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use crate::constants::PHASE_CANCELLED;

/// Receives progress notifications. Must tolerate rapid repeated calls.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &GenerationProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&GenerationProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &GenerationProgress) {
        self(progress)
    }
}

impl ProgressObserver for UnboundedSender<GenerationProgress> {
    fn on_progress(&self, progress: &GenerationProgress) {
        // A dropped receiver means nobody is watching any more
        let _ = self.send(progress.clone());
    }
}

/// Observer that discards every event
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _progress: &GenerationProgress) {}
}

pub struct ProgressReporter<'a> {
    observer: &'a dyn ProgressObserver,
    last: Mutex<Option<GenerationProgress>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(observer: &'a dyn ProgressObserver) -> Self {
        Self {
            observer,
            last: Mutex::new(None),
        }
    }

    /// Emit a progress event. A percent lower than the previous one is raised
    /// to the previous value.
    pub fn report(&self, percent: u8, phase_label: impl Into<String>) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let floor = last.as_ref().map(|p| p.percent).unwrap_or(0);
        let progress = GenerationProgress::new(percent.max(floor), phase_label);

        log::debug!("Progress {}%: {}", progress.percent, progress.phase_label);
        self.observer.on_progress(&progress);
        *last = Some(progress);
    }

    /// Mark the run as cancelled without moving the percentage
    pub fn report_cancelled(&self) {
        self.report(0, PHASE_CANCELLED);
    }

    /// Last emitted value
    pub fn last(&self) -> Option<GenerationProgress> {
        self.last.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Linear position of `done / total` inside the `[start, end]` percent band
pub fn band_percent(start: u8, end: u8, done: usize, total: usize) -> u8 {
    if total == 0 || done >= total {
        return end;
    }
    let span = end.saturating_sub(start) as usize;
    start + (span * done / total) as u8
}
