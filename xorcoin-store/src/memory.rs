//! In-memory container store.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::traits::ContainerStore;
use xorcoin_core::types::{ContainerEntry, ContainerPolicy, ContainerRef, PublicKey, Versioned};

/// Write counters of a store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Containers created
    pub containers_created: u64,
    /// Entries inserted
    pub inserts: u64,
    /// Successful version-conditioned updates
    pub updates: u64,
    /// Successful version-conditioned deletes
    pub deletes: u64,
    /// Writes rejected because the observed version was stale
    pub version_conflicts: u64,
}

/// Export form of one container, used for persistence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredContainer {
    /// Where the container lives
    pub container: ContainerRef,
    /// Who may mutate it
    pub policy: ContainerPolicy,
    /// Every entry, tombstones included
    pub entries: Vec<ContainerEntry>,
}

#[derive(Debug)]
struct Slot {
    value: Vec<u8>,
    version: u64,
}

#[derive(Debug)]
struct Container {
    policy: ContainerPolicy,
    entries: BTreeMap<String, Slot>,
}

/// In-memory container store.
///
/// Each container sits behind its own map shard lock, so a version check
/// and the write that depends on it happen atomically with respect to every
/// other writer of that container.
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Primary storage: container → entries
    containers: DashMap<ContainerRef, Container>,
    /// Write counters
    stats: RwLock<StoreStats>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }

    /// Returns the number of containers.
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Returns true if the store holds no containers.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Removes every container.
    pub fn clear(&self) {
        self.containers.clear();
        *self.stats.write() = StoreStats::default();
    }

    /// Returns all containers (for export/backup).
    pub fn all_containers(&self) -> Vec<StoredContainer> {
        let mut all: Vec<StoredContainer> = self
            .containers
            .iter()
            .map(|item| StoredContainer {
                container: item.key().clone(),
                policy: item.policy.clone(),
                entries: listing(&item.entries),
            })
            .collect();
        all.sort_by(|a, b| a.container.cmp(&b.container));
        all
    }

    /// Imports containers, replacing any at the same reference.
    ///
    /// Entry versions are kept as exported.
    pub fn import(&self, containers: Vec<StoredContainer>) -> usize {
        let mut imported = 0;
        for stored in containers {
            let entries = stored
                .entries
                .into_iter()
                .map(|e| (e.key, Slot { value: e.value, version: e.version }))
                .collect();
            self.containers.insert(
                stored.container,
                Container {
                    policy: stored.policy,
                    entries,
                },
            );
            imported += 1;
        }
        imported
    }

    fn record_conflict(&self) {
        self.stats.write().version_conflicts += 1;
    }
}

fn listing(entries: &BTreeMap<String, Slot>) -> Vec<ContainerEntry> {
    entries
        .iter()
        .map(|(key, slot)| ContainerEntry {
            key: key.clone(),
            value: slot.value.clone(),
            version: slot.version,
        })
        .collect()
}

fn container_not_found(container: &ContainerRef) -> CoinError {
    CoinError::NotFound(format!("container {}", container))
}

/// Empty values mark tombstones, so they are never accepted as content.
fn empty_value(key: &str) -> CoinError {
    CoinError::ValidationError(format!("empty value for entry '{}'", key))
}

fn entry_not_found(container: &ContainerRef, key: &str) -> CoinError {
    CoinError::NotFound(format!("entry '{}' in container {}", key, container))
}

#[async_trait]
impl ContainerStore for MemoryStore {
    #[instrument(skip(self, policy, entries), fields(container = %container, seeded = entries.len()))]
    async fn create(
        &self,
        container: &ContainerRef,
        policy: ContainerPolicy,
        entries: Vec<(String, Vec<u8>)>,
    ) -> Result<()> {
        use dashmap::mapref::entry::Entry;

        if let Some((key, _)) = entries.iter().find(|(_, value)| value.is_empty()) {
            return Err(empty_value(key));
        }

        match self.containers.entry(container.clone()) {
            Entry::Occupied(_) => Err(CoinError::AlreadyExists(container.to_string())),
            Entry::Vacant(vacant) => {
                let entries = entries
                    .into_iter()
                    .map(|(key, value)| (key, Slot { value, version: 0 }))
                    .collect();
                vacant.insert(Container { policy, entries });
                self.stats.write().containers_created += 1;
                debug!("Container created");
                Ok(())
            }
        }
    }

    async fn exists(&self, container: &ContainerRef) -> Result<bool> {
        Ok(self.containers.contains_key(container))
    }

    #[instrument(skip(self), fields(container = %container))]
    async fn get(&self, container: &ContainerRef, key: &str) -> Result<Versioned<Vec<u8>>> {
        let stored = self
            .containers
            .get(container)
            .ok_or_else(|| container_not_found(container))?;
        let slot = stored
            .entries
            .get(key)
            .ok_or_else(|| entry_not_found(container, key))?;
        Ok(Versioned::new(slot.value.clone(), slot.version))
    }

    #[instrument(skip(self, value, signer), fields(container = %container, signer = %signer.short()))]
    async fn insert(
        &self,
        container: &ContainerRef,
        key: &str,
        value: Vec<u8>,
        signer: &PublicKey,
    ) -> Result<()> {
        let mut stored = self
            .containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;

        if !stored.policy.may_insert(signer) {
            return Err(CoinError::PermissionDenied(format!("insert into {}", container)));
        }
        if value.is_empty() {
            return Err(empty_value(key));
        }
        if stored.entries.contains_key(key) {
            return Err(CoinError::DuplicateId(key.to_string()));
        }

        stored.entries.insert(key.to_string(), Slot { value, version: 0 });
        self.stats.write().inserts += 1;
        debug!("Entry inserted");
        Ok(())
    }

    #[instrument(skip(self, value, signer), fields(container = %container, signer = %signer.short()))]
    async fn update(
        &self,
        container: &ContainerRef,
        key: &str,
        value: Vec<u8>,
        observed_version: u64,
        signer: &PublicKey,
    ) -> Result<u64> {
        let mut stored = self
            .containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;

        if !stored.policy.may_update(signer) {
            return Err(CoinError::PermissionDenied(format!("update in {}", container)));
        }
        if value.is_empty() {
            return Err(empty_value(key));
        }

        let slot = match stored.entries.get_mut(key) {
            Some(slot) if !slot.value.is_empty() => slot,
            _ => return Err(entry_not_found(container, key)),
        };

        if slot.version != observed_version {
            let actual = slot.version;
            drop(stored);
            self.record_conflict();
            debug!(observed_version, actual, "Update lost version race");
            return Err(CoinError::VersionConflict {
                key: key.to_string(),
                expected: observed_version,
                actual,
            });
        }

        slot.value = value;
        slot.version += 1;
        let version = slot.version;
        drop(stored);

        self.stats.write().updates += 1;
        debug!(version, "Entry updated");
        Ok(version)
    }

    #[instrument(skip(self, signer), fields(container = %container, signer = %signer.short()))]
    async fn delete(
        &self,
        container: &ContainerRef,
        key: &str,
        observed_version: u64,
        signer: &PublicKey,
    ) -> Result<u64> {
        let mut stored = self
            .containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;

        if !stored.policy.may_delete(signer) {
            return Err(CoinError::PermissionDenied(format!("delete in {}", container)));
        }

        let slot = match stored.entries.get_mut(key) {
            Some(slot) if !slot.value.is_empty() => slot,
            _ => return Err(entry_not_found(container, key)),
        };

        if slot.version != observed_version {
            let actual = slot.version;
            drop(stored);
            self.record_conflict();
            debug!(observed_version, actual, "Delete lost version race");
            return Err(CoinError::VersionConflict {
                key: key.to_string(),
                expected: observed_version,
                actual,
            });
        }

        slot.value.clear();
        slot.version += 1;
        let version = slot.version;
        drop(stored);

        self.stats.write().deletes += 1;
        debug!(version, "Entry tombstoned");
        Ok(version)
    }

    #[instrument(skip(self), fields(container = %container))]
    async fn entries(&self, container: &ContainerRef) -> Result<Vec<ContainerEntry>> {
        let stored = self
            .containers
            .get(container)
            .ok_or_else(|| container_not_found(container))?;
        let entries = listing(&stored.entries);
        debug!(count = entries.len(), "Listed entries");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xorcoin_core::types::XorAddress;

    fn container(n: u8) -> ContainerRef {
        ContainerRef::new(XorAddress::from_array([n; 32]), 20_082_018)
    }

    fn key(n: u8) -> PublicKey {
        PublicKey::from_bytes(vec![n; 16])
    }

    async fn public_store(open_insert: bool, open_update: bool) -> (MemoryStore, ContainerRef) {
        let store = MemoryStore::new();
        let c = container(1);
        let mut policy = ContainerPolicy::public(key(1));
        if open_insert {
            policy = policy.with_open_insert();
        }
        if open_update {
            policy = policy.with_open_update();
        }
        store
            .create(&c, policy, vec![("meta".into(), b"m".to_vec())])
            .await
            .unwrap();
        (store, c)
    }

    #[tokio::test]
    async fn test_create_and_get_seeded_entry() {
        let (store, c) = public_store(false, false).await;

        assert!(store.exists(&c).await.unwrap());
        assert!(!store.exists(&container(2)).await.unwrap());

        let entry = store.get(&c, "meta").await.unwrap();
        assert_eq!(entry.value, b"m");
        assert_eq!(entry.version, 0);
    }

    #[tokio::test]
    async fn test_create_twice_fails_already_exists() {
        let (store, c) = public_store(false, false).await;
        let result = store.create(&c, ContainerPolicy::private(key(9)), vec![]).await;
        assert!(matches!(result, Err(CoinError::AlreadyExists(_))));

        // The original policy survives
        store.insert(&c, "x", b"1".to_vec(), &key(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (store, c) = public_store(false, false).await;
        assert!(matches!(store.get(&c, "nope").await, Err(CoinError::NotFound(_))));
        assert!(matches!(
            store.get(&container(7), "meta").await,
            Err(CoinError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_duplicate_rejected() {
        let (store, c) = public_store(true, false).await;
        store.insert(&c, "tx1", b"a".to_vec(), &key(2)).await.unwrap();
        let result = store.insert(&c, "tx1", b"b".to_vec(), &key(2)).await;
        assert!(matches!(result, Err(CoinError::DuplicateId(id)) if id == "tx1"));
        assert_eq!(store.get(&c, "tx1").await.unwrap().value, b"a");
    }

    #[tokio::test]
    async fn test_empty_values_rejected() {
        let (store, c) = public_store(true, false).await;

        assert!(matches!(
            store.insert(&c, "tx1", Vec::new(), &key(2)).await,
            Err(CoinError::ValidationError(_))
        ));
        assert!(matches!(
            store.update(&c, "meta", Vec::new(), 0, &key(1)).await,
            Err(CoinError::ValidationError(_))
        ));
        assert!(matches!(
            store.create(&container(2), ContainerPolicy::private(key(1)), vec![("k".into(), vec![])]).await,
            Err(CoinError::ValidationError(_))
        ));

        // Nothing was written, so the id is still free
        store.insert(&c, "tx1", b"a".to_vec(), &key(2)).await.unwrap();
        assert_eq!(store.get(&c, "meta").await.unwrap().version, 0);
        assert!(!store.exists(&container(2)).await.unwrap());
        assert_eq!(store.stats().inserts, 1);
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let (store, c) = public_store(false, false).await;
        let v1 = store.update(&c, "meta", b"n".to_vec(), 0, &key(1)).await.unwrap();
        let v2 = store.update(&c, "meta", b"o".to_vec(), v1, &key(1)).await.unwrap();
        assert_eq!((v1, v2), (1, 2));
        assert_eq!(store.get(&c, "meta").await.unwrap(), Versioned::new(b"o".to_vec(), 2));
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let (store, c) = public_store(false, false).await;
        store.update(&c, "meta", b"n".to_vec(), 0, &key(1)).await.unwrap();

        let result = store.update(&c, "meta", b"lost".to_vec(), 0, &key(1)).await;
        match result {
            Err(CoinError::VersionConflict { key, expected, actual }) => {
                assert_eq!(key, "meta");
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected version conflict, got {:?}", other),
        }
        assert_eq!(store.get(&c, "meta").await.unwrap().value, b"n");
        assert_eq!(store.stats().version_conflicts, 1);
    }

    #[tokio::test]
    async fn test_delete_leaves_tombstone() {
        let (store, c) = public_store(true, false).await;
        store.insert(&c, "tx1", b"a".to_vec(), &key(2)).await.unwrap();

        let version = store.delete(&c, "tx1", 0, &key(1)).await.unwrap();
        assert_eq!(version, 1);

        let entry = store.get(&c, "tx1").await.unwrap();
        assert!(entry.value.is_empty());

        let listed = store.entries(&c).await.unwrap();
        assert!(listed.iter().any(|e| e.key == "tx1" && e.is_tombstone()));

        // Tombstoned ids stay taken and cannot be deleted twice
        assert!(matches!(
            store.insert(&c, "tx1", b"b".to_vec(), &key(2)).await,
            Err(CoinError::DuplicateId(_))
        ));
        assert!(matches!(
            store.delete(&c, "tx1", 1, &key(1)).await,
            Err(CoinError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_delete_conflicts() {
        let (store, c) = public_store(false, false).await;
        store.update(&c, "meta", b"n".to_vec(), 0, &key(1)).await.unwrap();
        let result = store.delete(&c, "meta", 0, &key(1)).await;
        assert!(matches!(result, Err(CoinError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn test_permissions() {
        let (closed, c) = public_store(false, false).await;
        let stranger = key(9);
        assert!(matches!(
            closed.insert(&c, "x", b"1".to_vec(), &stranger).await,
            Err(CoinError::PermissionDenied(_))
        ));
        assert!(matches!(
            closed.update(&c, "meta", b"1".to_vec(), 0, &stranger).await,
            Err(CoinError::PermissionDenied(_))
        ));

        let (open, c) = public_store(true, true).await;
        open.insert(&c, "x", b"1".to_vec(), &stranger).await.unwrap();
        open.update(&c, "x", b"2".to_vec(), 0, &stranger).await.unwrap();

        // Deletes stay owner-only whatever the policy
        assert!(matches!(
            open.delete(&c, "x", 1, &stranger).await,
            Err(CoinError::PermissionDenied(_))
        ));
        open.delete(&c, "x", 1, &key(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_entries_sorted_by_key() {
        let (store, c) = public_store(true, false).await;
        store.insert(&c, "b", b"2".to_vec(), &key(2)).await.unwrap();
        store.insert(&c, "a", b"1".to_vec(), &key(2)).await.unwrap();

        let keys: Vec<String> = store.entries(&c).await.unwrap().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["a", "b", "meta"]);
    }

    #[tokio::test]
    async fn test_import_export() {
        let (store1, c) = public_store(true, false).await;
        store1.insert(&c, "tx1", b"a".to_vec(), &key(2)).await.unwrap();
        store1.update(&c, "meta", b"n".to_vec(), 0, &key(1)).await.unwrap();

        let exported = store1.all_containers();
        assert_eq!(exported.len(), 1);

        let store2 = MemoryStore::new();
        assert_eq!(store2.import(exported), 1);
        assert_eq!(store2.get(&c, "meta").await.unwrap().version, 1);
        assert_eq!(store2.entries(&c).await.unwrap(), store1.entries(&c).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear() {
        let (store, _) = public_store(false, false).await;
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[test]
    fn test_stats_count_operations() {
        let (store, c) = tokio_test::block_on(public_store(true, false));
        tokio_test::block_on(async {
            store.insert(&c, "tx1", b"a".to_vec(), &key(2)).await.unwrap();
            store.update(&c, "meta", b"n".to_vec(), 0, &key(1)).await.unwrap();
            let _ = store.update(&c, "meta", b"x".to_vec(), 0, &key(1)).await;
            store.delete(&c, "tx1", 0, &key(1)).await.unwrap();
        });

        let stats = store.stats();
        assert_eq!(stats.containers_created, 1);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.version_conflicts, 1);
    }

    #[tokio::test]
    async fn test_concurrent_updates_exactly_one_wins() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let (store, c) = public_store(false, true).await;
        let store = Arc::new(store);
        let mut tasks = JoinSet::new();

        for i in 0..32u8 {
            let store = store.clone();
            let c = c.clone();
            tasks.spawn(async move { store.update(&c, "meta", vec![i], 0, &key(i)).await });
        }

        let mut wins = 0;
        let mut conflicts = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap() {
                Ok(version) => {
                    assert_eq!(version, 1);
                    wins += 1;
                }
                Err(CoinError::VersionConflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(conflicts, 31);
        assert_eq!(store.get(&c, "meta").await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_commute() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let (store, c) = public_store(true, false).await;
        let store = Arc::new(store);
        let mut tasks = JoinSet::new();

        for i in 0..50u8 {
            let store = store.clone();
            let c = c.clone();
            tasks.spawn(async move { store.insert(&c, &format!("tx{}", i), vec![i + 1], &key(i)).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.entries(&c).await.unwrap().len(), 51);
        assert_eq!(store.stats().inserts, 50);
    }
}
