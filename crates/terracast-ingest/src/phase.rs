//! Ingestion phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// States of the ingestion lifecycle, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestPhase {
    /// Pulling the complete provider catalog.
    Fetching,
    /// Canonicalizing attribute keys, units, and prices.
    Normalizing,
    /// Enforcing per-service governance contracts.
    Validating,
    /// Building the snapshot view and content hash.
    Staging,
    /// Backup dump written to disk.
    BackedUp,
    /// Writing the snapshot to the store.
    Committing,
    /// The snapshot is live.
    Active,
    /// The pipeline aborted; nothing was committed past the backup.
    Failed,
}

impl fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fetching => "fetching",
            Self::Normalizing => "normalizing",
            Self::Validating => "validating",
            Self::Staging => "staging",
            Self::BackedUp => "backed_up",
            Self::Committing => "committing",
            Self::Active => "active",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}
