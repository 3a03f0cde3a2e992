//! Estimation context: configuration, cancellation, deadlines.
//!
//! Everything the pipeline needs travels in explicit values; there
//! are no process-wide singletons in the engine.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use terracast_core::error::{EstimateError, EstimateResult};
use terracast_core::money::Currency;
use terracast_pricing::FallbackPlan;

use crate::provider::EnvironmentHints;

// =============================================================================
// ENGINE CONFIG
// =============================================================================

/// Tuning knobs for one estimation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker pool width for cost derivation.
    pub worker_width: usize,
    /// Progress sampling interval.
    pub progress_interval: Duration,
    /// Currency of the estimation.
    pub currency: Currency,
    /// Region hints for provider finalization.
    pub hints: EnvironmentHints,
    /// Rate-key fallback plans keyed by service.
    pub fallback_plans: BTreeMap<String, FallbackPlan>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut fallback_plans = BTreeMap::new();
        // Attributes safe to relax per service, most-specific first.
        if let Ok(plan) = FallbackPlan::new(["tenancy", "os"]) {
            fallback_plans.insert("AmazonEC2".to_string(), plan);
        }
        if let Ok(plan) = FallbackPlan::new(["deployment_option"]) {
            fallback_plans.insert("AmazonRDS".to_string(), plan);
        }
        Self {
            worker_width: 4,
            progress_interval: Duration::from_millis(100),
            currency: Currency::Usd,
            hints: EnvironmentHints::default(),
            fallback_plans,
        }
    }
}

// =============================================================================
// CANCELLATION
// =============================================================================

/// Cooperative cancellation: a flag plus an optional deadline.
///
/// The orchestrator checks the signal between phases and before each
/// instance is dispatched; pending work is abandoned, finished work is
/// discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal with a deadline relative to now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// True once cancelled (deadline not considered).
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Errors when cancelled or past the deadline.
    pub fn check(&self) -> EstimateResult<()> {
        if self.is_cancelled() {
            return Err(EstimateError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(EstimateError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_trips_the_check() {
        let signal = CancelSignal::new();
        assert!(signal.check().is_ok());
        signal.cancel();
        assert!(matches!(signal.check(), Err(EstimateError::Cancelled)));
    }

    #[test]
    fn deadline_trips_the_check() {
        let signal = CancelSignal::with_timeout(Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(
            signal.check(),
            Err(EstimateError::DeadlineExceeded)
        ));
    }

    #[test]
    fn clones_share_the_flag() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        clone.cancel();
        assert!(signal.is_cancelled());
    }
}
