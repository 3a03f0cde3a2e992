//! # Terracast Diff
//!
//! Compares two completed cost graphs and explains what changed and
//! why. Assets partition into added/removed/changed/unchanged; changed
//! assets get component-level change drivers and causal chains that
//! follow the dependency graph upstream ("the instance changed because
//! its subnet was replaced").
//!
//! A symbolic bucket on either side makes the diff non-authoritative
//! for absolute amounts; structural output remains valid, but the
//! minimum confidence drops to zero.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod api;
pub mod diff;

pub use api::diff_configurations;
pub use diff::{
    compute_diff, AssetChange, AssetSummary, CausalLink, ChangeDriver, DiffConfig, DiffResult,
    Relation,
};
