//! Subscription tiers and their quota limits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Result, TypesError};

/// Quota class of a caller. Immutable reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Creator,
    Professional,
    Studio,
}

/// Limits attached to a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub monthly_limit: u32,
    pub max_pages: u32,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Creator, Tier::Professional, Tier::Studio];

    pub fn limits(&self) -> TierLimits {
        match self {
            Self::Free => TierLimits { monthly_limit: 3, max_pages: 12 },
            Self::Creator => TierLimits { monthly_limit: 20, max_pages: 24 },
            Self::Professional => TierLimits { monthly_limit: 60, max_pages: 48 },
            Self::Studio => TierLimits { monthly_limit: 250, max_pages: 100 },
        }
    }

    pub fn monthly_limit(&self) -> u32 {
        self.limits().monthly_limit
    }

    pub fn max_pages(&self) -> u32 {
        self.limits().max_pages
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Creator => "creator",
            Self::Professional => "professional",
            Self::Studio => "studio",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "creator" => Ok(Self::Creator),
            "professional" | "pro" => Ok(Self::Professional),
            "studio" => Ok(Self::Studio),
            other => Err(TypesError::UnknownTier(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_grow_with_tier() {
        for pair in Tier::ALL.windows(2) {
            assert!(pair[0].monthly_limit() < pair[1].monthly_limit());
            assert!(pair[0].max_pages() < pair[1].max_pages());
        }
    }

    #[test]
    fn test_parse_tier_names() {
        assert_eq!("Free".parse::<Tier>().unwrap(), Tier::Free);
        assert_eq!("pro".parse::<Tier>().unwrap(), Tier::Professional);
        assert!("platinum".parse::<Tier>().is_err());

        for tier in Tier::ALL {
            assert_eq!(tier.to_string().parse::<Tier>().unwrap(), tier);
        }
    }
}
