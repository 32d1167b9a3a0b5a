//! Quota gate: pure pre-flight check of a request against the caller's tier

use bookforge_types::{GenerationRequest, Tier};
use serde::{Deserialize, Serialize};

use crate::error::{BookforgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    QuotaExceeded { used: u32, limit: u32 },
    PageLimitExceeded { requested: u32, max: u32 },
}

impl From<DenialReason> for BookforgeError {
    fn from(reason: DenialReason) -> Self {
        match reason {
            DenialReason::QuotaExceeded { used, limit } => Self::QuotaExceeded { used, limit },
            DenialReason::PageLimitExceeded { requested, max } => {
                Self::PageLimitExceeded { requested, max }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed,
    Denied(DenialReason),
}

impl QuotaDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied(reason) => Err(reason.into()),
        }
    }
}

/// Check a request against `tier`. The caller owns and persists the monthly
/// counter; this only reads it.
pub fn check_quota(
    tier: Tier,
    request: &GenerationRequest,
    current_monthly_count: u32,
) -> QuotaDecision {
    let limits = tier.limits();

    if current_monthly_count >= limits.monthly_limit {
        log::info!(
            "Quota denied for tier {}: {} of {} generations used",
            tier,
            current_monthly_count,
            limits.monthly_limit
        );
        return QuotaDecision::Denied(DenialReason::QuotaExceeded {
            used: current_monthly_count,
            limit: limits.monthly_limit,
        });
    }

    if request.page_count > limits.max_pages {
        log::info!(
            "Quota denied for tier {}: {} pages requested, {} allowed",
            tier,
            request.page_count,
            limits.max_pages
        );
        return QuotaDecision::Denied(DenialReason::PageLimitExceeded {
            requested: request.page_count,
            max: limits.max_pages,
        });
    }

    QuotaDecision::Allowed
}
