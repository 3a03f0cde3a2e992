//! # Terracast Mappers
//!
//! Per-(cloud, resource-type) rules that turn asset attributes into
//! usage vectors and priceable cost units.
//!
//! A [`ResourceMapper`] is two pure functions: `build_usage` derives
//! usage vectors from the asset and the caller's [`UsageContext`], and
//! `build_cost_units` turns those vectors into [`PriceableUnit`]s:
//! numeric units carrying a rate key, or symbolic units carrying the
//! reason no number exists. Mappers never guess: absent usage with no
//! default is a symbolic unit, not a zero.
//!
//! The [`MapperRegistry`] also carries the tier catalog. Tier 1
//! resources are directly billable and must have a mapper; tier 2
//! resources bill on usage the configuration cannot supply and
//! typically emit symbolic units; tier 3 resources carry no direct
//! charge and must *not* have a mapper; they exist in the cost graph
//! for lineage only. A registry that violates those rules refuses to
//! load.
//!
//! [`UsageContext`]: terracast_core::usage::UsageContext

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod aws;
pub mod error;
pub mod mapper;
pub mod registry;
pub mod unit;

pub use error::{RegistryError, RegistryResult};
pub use mapper::{AssetView, Cloud, ResourceMapper};
pub use registry::{MapperRegistry, RegistryBuilder, ResourceTier, TierEntry};
pub use unit::PriceableUnit;
