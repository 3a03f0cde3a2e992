//! The two-envelope diff entry point.
//!
//! Runs two full estimations against the same pricing snapshot and
//! mapper set, then compares them. This is the surface a code-review
//! gate calls: base branch in, head branch in, change-impact report
//! out.

use terracast_core::envelope::InputEnvelope;
use terracast_core::error::EstimateResult;
use terracast_core::input::ParsedConfig;
use terracast_core::usage::UsageContext;
use terracast_engine::{CancelSignal, Estimator};
use terracast_pricing::PricingSnapshot;

use crate::diff::{compute_diff, DiffConfig, DiffResult};

/// Estimates both revisions and diffs the results.
///
/// Both sides run under their own envelope (mode included) but share
/// the snapshot, usage context, and cancellation signal; errors from
/// either estimation propagate unchanged.
#[allow(clippy::too_many_arguments)]
pub fn diff_configurations(
    estimator: &Estimator,
    base_envelope: &InputEnvelope,
    base_config: &ParsedConfig,
    head_envelope: &InputEnvelope,
    head_config: &ParsedConfig,
    snapshot: &PricingSnapshot,
    usage: &UsageContext,
    cancel: &CancelSignal,
    config: &DiffConfig,
) -> EstimateResult<DiffResult> {
    let base = estimator.estimate(base_envelope, base_config, snapshot, usage, cancel)?;
    let head = estimator.estimate(head_envelope, head_config, snapshot, usage, cancel)?;
    Ok(compute_diff(&base, &head, config))
}
