//! Confidence scores and pessimistic propagation.
//!
//! Every cost unit carries a confidence in [0, 1]. Aggregation is
//! always the minimum over contributors: an estimate is only as
//! trustworthy as its weakest input. Symbolic outputs have confidence
//! zero by construction.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CONFIDENCE
// =============================================================================

/// A confidence score clamped to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// Full confidence.
    pub const CERTAIN: Confidence = Confidence(1.0);
    /// No confidence; used for symbolic outputs.
    pub const ZERO: Confidence = Confidence(0.0);

    /// Creates a confidence, clamping into [0, 1].
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Returns the raw score.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Pessimistic combination: the minimum of the two scores.
    #[must_use]
    pub fn combine_min(&self, other: Confidence) -> Confidence {
        Confidence(self.0.min(other.0))
    }

    /// Multiplicative degradation, e.g. when a usage value came from a
    /// profile default rather than an explicit override.
    #[must_use]
    pub fn degrade(&self, factor: f64) -> Confidence {
        Confidence::new(self.0 * factor)
    }

    /// Minimum over an iterator of scores; `CERTAIN` when empty.
    #[must_use]
    pub fn min_of(scores: impl IntoIterator<Item = Confidence>) -> Confidence {
        scores
            .into_iter()
            .fold(Confidence::CERTAIN, |acc, c| acc.combine_min(c))
    }

    /// Maps the score to its coarse level tag.
    #[must_use]
    pub fn level(&self) -> ConfidenceLevel {
        if self.0 >= 0.9 {
            ConfidenceLevel::High
        } else if self.0 >= 0.7 {
            ConfidenceLevel::Medium
        } else if self.0 > 0.0 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::Unknown
        }
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::CERTAIN
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// =============================================================================
// CONFIDENCE LEVEL
// =============================================================================

/// Coarse confidence tag emitted in result summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// Score ≥ 0.9.
    High,
    /// Score ≥ 0.7.
    Medium,
    /// Score > 0.
    Low,
    /// Score is exactly zero (symbolic outputs present).
    Unknown,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        };
        write!(f, "{tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clamping() {
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(Confidence::new(0.95).level(), ConfidenceLevel::High);
        assert_eq!(Confidence::new(0.9).level(), ConfidenceLevel::High);
        assert_eq!(Confidence::new(0.7).level(), ConfidenceLevel::Medium);
        assert_eq!(Confidence::new(0.5).level(), ConfidenceLevel::Low);
        assert_eq!(Confidence::ZERO.level(), ConfidenceLevel::Unknown);
    }

    #[test]
    fn min_of_empty_is_certain() {
        assert_eq!(Confidence::min_of([]), Confidence::CERTAIN);
    }

    proptest! {
        #[test]
        fn combine_min_is_pessimistic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let combined = Confidence::new(a).combine_min(Confidence::new(b));
            prop_assert!(combined.value() <= a);
            prop_assert!(combined.value() <= b);
        }

        #[test]
        fn degrade_never_raises(score in 0.0f64..=1.0, factor in 0.0f64..=1.0) {
            let degraded = Confidence::new(score).degrade(factor);
            prop_assert!(degraded.value() <= score);
        }
    }
}
