//! Error types for the pricing store.

use thiserror::Error;

/// A specialized Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The main error type for store operations.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The referenced snapshot does not exist.
    #[error("Snapshot not found: {id}")]
    NotFound {
        /// The missing snapshot id.
        id: String,
    },

    /// A write conflicted with concurrent state.
    #[error("Store conflict: {reason}")]
    Conflict {
        /// What conflicted.
        reason: String,
    },

    /// The backend is unreachable or misconfigured.
    #[error("Store connection error: {reason}")]
    Connection {
        /// Connection failure detail.
        reason: String,
    },

    /// Required connection settings are missing.
    #[error("Store configuration error: {reason}")]
    Configuration {
        /// What is missing or malformed.
        reason: String,
    },
}

impl StoreError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
