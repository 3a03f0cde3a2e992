//! # Terracast Core
//!
//! Core types for the Terracast cost estimation engine.
//!
//! This crate holds the vocabulary shared by every other Terracast
//! crate: the normalized [`InputEnvelope`], the parsed-configuration
//! input consumed from the HCL parser, currency-checked decimal
//! arithmetic, confidence scores, and usage vectors.
//!
//! Everything here is pure data: no I/O, no clocks, no globals. The
//! envelope's content hash is the only identity that matters for
//! estimation: two envelopes with equal hashes must produce identical
//! results against the same pricing snapshot.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod confidence;
pub mod envelope;
pub mod error;
pub mod hashing;
pub mod input;
pub mod money;
pub mod usage;

pub use confidence::{Confidence, ConfidenceLevel};
pub use envelope::{EnvelopeOptions, EstimationMode, InputEnvelope, RawRequest, SourceKind};
pub use error::{EstimateError, EstimateResult, Failure};
pub use money::{Currency, Money, HOURS_PER_MONTH};
pub use usage::{UsageContext, UsageSource, UsageValue, UsageVector};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::confidence::{Confidence, ConfidenceLevel};
    pub use crate::envelope::{
        EnvelopeOptions, EstimationMode, InputEnvelope, RawRequest, RefResolver, SourceKind,
    };
    pub use crate::error::{EstimateError, EstimateResult, Failure};
    pub use crate::input::{
        AttrView, Expression, ParsedConfig, ParsedDataSource, ParsedModule, ParsedProvider,
        ParsedResource, ParsedValue, SourceLocation,
    };
    pub use crate::money::{Currency, Money, HOURS_PER_MONTH};
    pub use crate::usage::{UsageContext, UsageSource, UsageValue, UsageVector};
}
