//! Error types for the Terracast estimation engine.
//!
//! These are the *recoverable* error kinds of estimation. Invariant
//! violations (mutating a sealed graph, finalizing providers before
//! sealing, a symbolic cost unit with a numeric amount) are programmer
//! bugs and panic instead; they are never represented here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A specialized Result type for estimation operations.
pub type EstimateResult<T> = Result<T, EstimateError>;

/// The main error type for estimation operations.
#[derive(Error, Debug, Clone)]
pub enum EstimateError {
    /// Envelope validation failed; caller error.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of what was invalid.
        message: String,
        /// Path to the offending field or file, when known.
        path: Option<String>,
    },

    /// Strict-mode expansion of an unresolvable count/for_each.
    #[error("Unknown cardinality for {address}: {expression}")]
    UnknownCardinality {
        /// Terraform address of the definition.
        address: String,
        /// The unresolvable expression text.
        expression: String,
    },

    /// Strict-mode pricing miss.
    #[error("Rate not found: {rate_key}")]
    RateNotFound {
        /// Canonical string form of the rate key that missed.
        rate_key: String,
    },

    /// No mapper registered for a billable resource type.
    #[error("Unsupported resource type {resource_type} at {address}")]
    UnsupportedResource {
        /// The resource type with no mapper.
        resource_type: String,
        /// Terraform address of the definition.
        address: String,
    },

    /// The dependency graph has a cycle.
    #[error("Dependency cycle detected at {node}")]
    Cycle {
        /// First node found on the cycle.
        node: String,
    },

    /// Estimation was cancelled by the caller.
    #[error("Estimation cancelled")]
    Cancelled,

    /// The orchestrator deadline elapsed before completion.
    #[error("Estimation deadline exceeded")]
    DeadlineExceeded,
}

impl EstimateError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            path: None,
        }
    }

    /// Creates an invalid input error scoped to a path.
    #[must_use]
    pub fn invalid_input_at(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Creates an unknown cardinality error.
    #[must_use]
    pub fn unknown_cardinality(address: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::UnknownCardinality {
            address: address.into(),
            expression: expression.into(),
        }
    }

    /// Creates a rate-not-found error.
    #[must_use]
    pub fn rate_not_found(rate_key: impl Into<String>) -> Self {
        Self::RateNotFound {
            rate_key: rate_key.into(),
        }
    }

    /// Creates an unsupported resource error.
    #[must_use]
    pub fn unsupported_resource(
        resource_type: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self::UnsupportedResource {
            resource_type: resource_type.into(),
            address: address.into(),
        }
    }

    /// Stable machine-readable code for this error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::UnknownCardinality { .. } => "unknown_cardinality",
            Self::RateNotFound { .. } => "rate_not_found",
            Self::UnsupportedResource { .. } => "unsupported_resource",
            Self::Cycle { .. } => "cycle",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }

    /// Converts this error into the user-visible failure shape.
    #[must_use]
    pub fn to_failure(&self) -> Failure {
        let path = match self {
            Self::InvalidInput { path, .. } => path.clone(),
            Self::UnknownCardinality { address, .. }
            | Self::UnsupportedResource { address, .. } => Some(address.clone()),
            Self::Cycle { node } => Some(node.clone()),
            _ => None,
        };
        Failure {
            code: self.code().to_string(),
            message: self.to_string(),
            path,
        }
    }
}

/// User-visible failure shape: `{ code, message, path? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Stable error kind code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Offending address, field, or file, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
