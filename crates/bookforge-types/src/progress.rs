//! Progress and terminal outcome records

use serde::{Deserialize, Serialize};

use crate::project::Project;

/// Run-wide completion state. Written only by the progress reporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationProgress {
    /// 0..=100, never decreasing within one run
    pub percent: u8,
    pub phase_label: String,
}

impl GenerationProgress {
    pub fn new(percent: u8, phase_label: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            phase_label: phase_label.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    /// The caller cancelled mid-run; pages illustrated so far are kept
    Cancelled,
}

/// Terminal event of a pipeline run that produced a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub status: RunStatus,
    pub project: Project,
}

impl GenerationOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }
}
