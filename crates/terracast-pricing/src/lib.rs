//! # Terracast Pricing
//!
//! Rate keys, rates, and immutable pricing snapshots.
//!
//! A [`PricingSnapshot`] is a sealed, content-hashed catalog of rates
//! for one (provider, region, alias). It is produced either by the
//! ingestion lifecycle or by [`SnapshotBuilder`] in tests, and once
//! sealed it never changes: estimation may share one snapshot across
//! any number of concurrent requests.
//!
//! Rate lookup is by [`RateKey`], a tuple that always includes the
//! provider alias, so multi-account configurations cannot silently
//! read another account's prices.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod fallback;
pub mod rate;
pub mod rate_key;
pub mod snapshot;

pub use error::{PricingError, PricingResult};
pub use fallback::FallbackPlan;
pub use rate::{Rate, TierBounds};
pub use rate_key::RateKey;
pub use snapshot::{PricingSnapshot, RateMatch, SnapshotBuilder, SnapshotMeta};
