//! Pricing tier vocabulary.

use serde::{Deserialize, Serialize};

/// The closed set of pricing tiers the tier detector may recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierLevel {
    Essential,
    Pro,
    Elite,
    PrimePremium,
    LongevityPremium,
}

impl std::fmt::Display for TierLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TierLevel::Essential => "essential",
            TierLevel::Pro => "pro",
            TierLevel::Elite => "elite",
            TierLevel::PrimePremium => "prime_premium",
            TierLevel::LongevityPremium => "longevity_premium",
        };
        write!(f, "{s}")
    }
}

/// How sensitive the customer appears to be to price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSensitivity {
    Low,
    Medium,
    High,
}
