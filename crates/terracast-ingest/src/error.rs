//! Error types for the ingestion lifecycle.

use thiserror::Error;

use terracast_storage::StoreError;

use crate::phase::IngestPhase;

/// A specialized Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// What went wrong inside one phase.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Catalog fetch failed.
    #[error("Network error fetching {service}: {reason}")]
    Network {
        /// Service being fetched.
        service: String,
        /// Failure detail.
        reason: String,
    },

    /// A governance contract was not met.
    #[error("Validation failed: {reason}")]
    Validation {
        /// Which contract failed and how.
        reason: String,
    },

    /// The backup dump could not be written or read.
    #[error("Backup error: {reason}")]
    Backup {
        /// Failure detail.
        reason: String,
    },

    /// A temp file or checkpoint operation failed.
    #[error("Staging error: {reason}")]
    Staging {
        /// Failure detail.
        reason: String,
    },

    /// The store refused the commit.
    #[error("Commit failed: {0}")]
    Commit(#[from] StoreError),

    /// A backup file's recorded hash does not match its rates.
    #[error("Backup {path} is corrupt: {reason}")]
    CorruptBackup {
        /// Path of the offending file.
        path: String,
        /// What mismatched.
        reason: String,
    },
}

impl IngestError {
    /// Creates a network error.
    #[must_use]
    pub fn network(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Creates a backup error.
    #[must_use]
    pub fn backup(reason: impl Into<String>) -> Self {
        Self::Backup {
            reason: reason.into(),
        }
    }

    /// Creates a staging error.
    #[must_use]
    pub fn staging(reason: impl Into<String>) -> Self {
        Self::Staging {
            reason: reason.into(),
        }
    }
}

/// A phase-stamped lifecycle failure: exactly where it died, and why.
#[derive(Error, Debug)]
#[error("Ingestion failed during {phase}: {error}")]
pub struct IngestFailure {
    /// The phase that was running.
    pub phase: IngestPhase,
    /// The underlying error.
    #[source]
    pub error: IngestError,
}

impl IngestFailure {
    /// Stamps an error with its phase.
    #[must_use]
    pub fn at(phase: IngestPhase, error: IngestError) -> Self {
        Self { phase, error }
    }
}
