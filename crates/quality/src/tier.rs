use std::fmt;
use std::str::FromStr;

use paceconfig::TierName;
use serde::{Deserialize, Serialize};

/// Frame budget of the 30 fps tier.
pub const LOW_FRAME_BUDGET_MS: f32 = 33.33;
/// Frame budget of the 60 fps tiers.
pub const SMOOTH_FRAME_BUDGET_MS: f32 = 16.67;

/// Visual-fidelity tier. Ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quality tier '{0}'; expected low, medium, or high")]
pub struct ParseTierError(pub String);

impl QualityTier {
    pub const ALL: [QualityTier; 3] = [QualityTier::Low, QualityTier::Medium, QualityTier::High];

    /// One tier down, saturating at `Low`.
    pub fn lower(self) -> Self {
        match self {
            QualityTier::High => QualityTier::Medium,
            QualityTier::Medium | QualityTier::Low => QualityTier::Low,
        }
    }

    /// One tier up, saturating at `High`.
    pub fn higher(self) -> Self {
        match self {
            QualityTier::Low => QualityTier::Medium,
            QualityTier::Medium | QualityTier::High => QualityTier::High,
        }
    }

    /// Maximum acceptable time per frame on this tier.
    pub fn frame_budget_ms(self) -> f32 {
        match self {
            QualityTier::Low => LOW_FRAME_BUDGET_MS,
            QualityTier::Medium | QualityTier::High => SMOOTH_FRAME_BUDGET_MS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TierName::parse(s)
            .map(QualityTier::from)
            .ok_or_else(|| ParseTierError(s.trim().to_string()))
    }
}

impl From<TierName> for QualityTier {
    fn from(value: TierName) -> Self {
        match value {
            TierName::Low => QualityTier::Low,
            TierName::Medium => QualityTier::Medium,
            TierName::High => QualityTier::High,
        }
    }
}

impl From<QualityTier> for TierName {
    fn from(value: QualityTier) -> Self {
        match value {
            QualityTier::Low => TierName::Low,
            QualityTier::Medium => TierName::Medium,
            QualityTier::High => TierName::High,
        }
    }
}
