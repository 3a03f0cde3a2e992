//! The pricing store trait.

use terracast_pricing::{PricingSnapshot, SnapshotMeta};

use crate::error::StoreResult;

/// Persistence operations for pricing snapshots.
///
/// Backends must make [`commit_snapshot`] atomic: snapshot row, rate
/// keys, rates, and activation land together or not at all. Snapshots
/// are never mutated after commit; deactivation flips the active flag
/// and deletes nothing.
///
/// [`commit_snapshot`]: PricingStore::commit_snapshot
pub trait PricingStore: Send + Sync {
    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// True when the backend is reachable.
    fn is_healthy(&self) -> bool;

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    /// The active snapshot for one (provider, region, alias).
    fn find_active(
        &self,
        provider: &str,
        region: &str,
        alias: &str,
    ) -> StoreResult<Option<SnapshotMeta>>;

    /// A snapshot matching (provider, region, alias, content hash),
    /// active or not. Idempotent ingestion keys on this.
    fn find_by_content_hash(
        &self,
        provider: &str,
        region: &str,
        alias: &str,
        content_hash: &str,
    ) -> StoreResult<Option<SnapshotMeta>>;

    /// Loads a full snapshot by id.
    fn load(&self, id: &str) -> StoreResult<Option<PricingSnapshot>>;

    /// Lists snapshot metadata for one (provider, region, alias),
    /// newest first.
    fn list(&self, provider: &str, region: &str, alias: &str) -> StoreResult<Vec<SnapshotMeta>>;

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Commits a sealed snapshot in one transaction and activates it,
    /// deactivating any previously active snapshot for the same
    /// (provider, region, alias). Returns the committed metadata.
    fn commit_snapshot(&self, snapshot: &PricingSnapshot) -> StoreResult<SnapshotMeta>;

    /// Deactivates a snapshot. Rows are kept; returns false when the
    /// snapshot was already inactive.
    fn deactivate(&self, id: &str) -> StoreResult<bool>;
}
