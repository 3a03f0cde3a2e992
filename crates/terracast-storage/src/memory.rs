//! In-memory pricing store for tests and dry-runs.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use tracing::debug;

use terracast_pricing::{PricingSnapshot, SnapshotMeta};

use crate::error::StoreResult;
use crate::store::PricingStore;

/// A [`PricingStore`] backed by a process-local map.
///
/// Snapshots are stored by id; the "transaction" is the write lock.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: RwLock<BTreeMap<String, PricingSnapshot>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    /// True when nothing has been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }

    fn scope_matches(meta: &SnapshotMeta, provider: &str, region: &str, alias: &str) -> bool {
        meta.provider == provider && meta.region == region && meta.alias == alias
    }
}

impl PricingStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn find_active(
        &self,
        provider: &str,
        region: &str,
        alias: &str,
    ) -> StoreResult<Option<SnapshotMeta>> {
        let snapshots = self.snapshots.read();
        Ok(snapshots
            .values()
            .map(PricingSnapshot::meta)
            .find(|meta| meta.active && Self::scope_matches(meta, provider, region, alias))
            .cloned())
    }

    fn find_by_content_hash(
        &self,
        provider: &str,
        region: &str,
        alias: &str,
        content_hash: &str,
    ) -> StoreResult<Option<SnapshotMeta>> {
        let snapshots = self.snapshots.read();
        Ok(snapshots
            .values()
            .map(PricingSnapshot::meta)
            .find(|meta| {
                meta.content_hash == content_hash
                    && Self::scope_matches(meta, provider, region, alias)
            })
            .cloned())
    }

    fn load(&self, id: &str) -> StoreResult<Option<PricingSnapshot>> {
        Ok(self.snapshots.read().get(id).cloned())
    }

    fn list(&self, provider: &str, region: &str, alias: &str) -> StoreResult<Vec<SnapshotMeta>> {
        let snapshots = self.snapshots.read();
        let mut metas: Vec<SnapshotMeta> = snapshots
            .values()
            .map(PricingSnapshot::meta)
            .filter(|meta| Self::scope_matches(meta, provider, region, alias))
            .cloned()
            .collect();
        metas.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(metas)
    }

    fn commit_snapshot(&self, snapshot: &PricingSnapshot) -> StoreResult<SnapshotMeta> {
        let mut snapshots = self.snapshots.write();
        let meta = snapshot.meta().clone();

        // Single writer per scope: supersede the previous active
        // snapshot, keeping its rows.
        let superseded: Vec<String> = snapshots
            .iter()
            .filter(|(_, existing)| {
                let m = existing.meta();
                m.active && Self::scope_matches(m, &meta.provider, &meta.region, &meta.alias)
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in superseded {
            if let Some(existing) = snapshots.remove(&id) {
                snapshots.insert(id, existing.deactivated());
            }
        }

        let committed = snapshot.clone().activated();
        let committed_meta = committed.meta().clone();
        snapshots.insert(committed_meta.id.to_string(), committed);
        debug!(
            id = %committed_meta.id,
            content_hash = %committed_meta.content_hash,
            "snapshot committed"
        );
        Ok(committed_meta)
    }

    fn deactivate(&self, id: &str) -> StoreResult<bool> {
        let mut snapshots = self.snapshots.write();
        match snapshots.remove(id) {
            Some(snapshot) => {
                let was_active = snapshot.meta().active;
                snapshots.insert(id.to_string(), snapshot.deactivated());
                Ok(was_active)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use terracast_core::money::Currency;
    use terracast_pricing::{Rate, RateKey, SnapshotBuilder};

    fn snapshot(price: Decimal) -> PricingSnapshot {
        let mut builder = SnapshotBuilder::new("aws", "us-east-1", "default", "test");
        builder.add_rate(
            RateKey::new("aws", "AmazonEC2", "Compute Instance", "us-east-1", "default")
                .with_attribute("instance_type", "t3.micro"),
            Rate::new("hours", price, Currency::Usd),
        );
        builder.seal()
    }

    #[test]
    fn commit_activates_and_supersedes() {
        let store = MemoryStore::new();
        let first = store.commit_snapshot(&snapshot(dec!(0.0104))).unwrap();
        assert!(first.active);

        let second = store.commit_snapshot(&snapshot(dec!(0.0110))).unwrap();
        assert!(second.active);

        let active = store
            .find_active("aws", "us-east-1", "default")
            .unwrap()
            .unwrap();
        assert_eq!(active.id, second.id);

        // The superseded snapshot still exists, inactive, rows intact.
        let old = store.load(&first.id.to_string()).unwrap().unwrap();
        assert!(!old.meta().active);
        assert_eq!(old.rate_count(), 1);
    }

    #[test]
    fn content_hash_lookup_scopes_by_region() {
        let store = MemoryStore::new();
        let meta = store.commit_snapshot(&snapshot(dec!(0.0104))).unwrap();
        assert!(store
            .find_by_content_hash("aws", "us-east-1", "default", &meta.content_hash)
            .unwrap()
            .is_some());
        assert!(store
            .find_by_content_hash("aws", "eu-west-1", "default", &meta.content_hash)
            .unwrap()
            .is_none());
    }

    #[test]
    fn deactivate_keeps_rows() {
        let store = MemoryStore::new();
        let meta = store.commit_snapshot(&snapshot(dec!(0.0104))).unwrap();
        assert!(store.deactivate(&meta.id.to_string()).unwrap());
        assert!(!store.deactivate(&meta.id.to_string()).unwrap());
        assert_eq!(store.len(), 1);
    }
}
