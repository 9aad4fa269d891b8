//! File-based container store with persistence.
//!
//! Keeps every container in memory and writes the whole store to one file.
//! Suitable for a single user's local wallet, where the CLI opens the store,
//! runs one command and flushes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use xorcoin_core::error::{CoinError, Result};
use xorcoin_core::traits::ContainerStore;
use xorcoin_core::types::{ContainerEntry, ContainerPolicy, ContainerRef, PublicKey, Versioned};

use crate::memory::{StoreStats, StoredContainer};
use crate::MemoryStore;

/// File-based container store.
///
/// Uses a memory store internally with periodic persistence to disk.
///
/// # File Format
///
/// ```text
/// magic (4 bytes): "XCNS"
/// version (1 byte): 1
/// count (8 bytes): number of containers, little endian
/// containers (variable): JSON array of exported containers
/// ```
///
/// A write is reported once it lands in memory. A failed auto-save is
/// logged and leaves the store dirty, so the next [`FileStore::flush`]
/// tries again.
pub struct FileStore {
    /// Path to the storage file
    path: PathBuf,
    /// In-memory storage
    memory: MemoryStore,
    /// Whether there are unsaved changes
    dirty: AtomicBool,
    /// Auto-save threshold (save after N writes)
    auto_save_threshold: u64,
    /// Writes since last save
    writes_since_save: AtomicU64,
    /// One save at a time; they share the temp file
    save_lock: Mutex<()>,
}

/// File format magic bytes
const MAGIC: &[u8; 4] = b"XCNS";
/// Current file format version
const VERSION: u8 = 1;
/// Magic + version + count
const HEADER_LEN: usize = 13;

impl FileStore {
    /// Opens the store at `path`.
    ///
    /// If the file exists, it is loaded. Otherwise the store starts empty
    /// and the file is created on first save.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryStore::new(),
            dirty: AtomicBool::new(false),
            auto_save_threshold: 100,
            writes_since_save: AtomicU64::new(0),
            save_lock: Mutex::new(()),
        };

        if fs::try_exists(&store.path).await? {
            store.load().await?;
        }

        Ok(store)
    }

    /// Opens a file store with a custom auto-save threshold.
    pub async fn with_auto_save(path: impl AsRef<Path>, threshold: u64) -> Result<Self> {
        let mut store = Self::new(path).await?;
        store.auto_save_threshold = threshold;
        Ok(store)
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<()> {
        let mut file = fs::File::open(&self.path).await.map_err(|e| {
            CoinError::IoError(std::io::Error::new(e.kind(), format!("Failed to open store file: {}", e)))
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await?;

        if contents.len() < HEADER_LEN {
            return Err(CoinError::StoreError("File too short".into()));
        }

        if &contents[0..4] != MAGIC {
            return Err(CoinError::StoreError("Invalid magic bytes".into()));
        }

        let version = contents[4];
        if version != VERSION {
            return Err(CoinError::VersionMismatch {
                expected: VERSION,
                actual: version,
            });
        }

        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&contents[5..HEADER_LEN]);
        let count = u64::from_le_bytes(count_bytes);
        info!(count, "Loading containers from file");

        let containers: Vec<StoredContainer> = serde_json::from_slice(&contents[HEADER_LEN..])
            .map_err(|e| CoinError::BinarySerializationError(e.to_string()))?;

        if containers.len() as u64 != count {
            return Err(CoinError::StoreError(format!(
                "Header announces {} containers, body holds {}",
                count,
                containers.len()
            )));
        }

        self.memory.import(containers);
        self.dirty.store(false, Ordering::SeqCst);
        debug!("Store loaded successfully");

        Ok(())
    }

    /// Saves every container to the file.
    #[instrument(skip(self), fields(path = ?self.path))]
    pub async fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock().await;

        // Cleared before the snapshot so a write racing this save marks
        // the store dirty again
        self.dirty.store(false, Ordering::SeqCst);
        self.writes_since_save.store(0, Ordering::SeqCst);

        if let Err(e) = self.write_snapshot().await {
            self.dirty.store(true, Ordering::SeqCst);
            return Err(e);
        }

        debug!("Store saved successfully");
        Ok(())
    }

    async fn write_snapshot(&self) -> Result<()> {
        let containers = self.memory.all_containers();
        let count = containers.len() as u64;

        info!(count, "Saving store to file");

        let serialized = serde_json::to_vec(&containers)
            .map_err(|e| CoinError::BinarySerializationError(e.to_string()))?;

        let mut contents = Vec::with_capacity(HEADER_LEN + serialized.len());
        contents.extend_from_slice(MAGIC);
        contents.push(VERSION);
        contents.extend_from_slice(&count.to_le_bytes());
        contents.extend_from_slice(&serialized);

        // Write to temp, then rename
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    /// Checks if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Saves if dirty.
    pub async fn flush(&self) -> Result<()> {
        if self.is_dirty() {
            self.save().await?;
        }
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the underlying memory store.
    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// Returns write counters since the store was opened.
    pub fn stats(&self) -> StoreStats {
        self.memory.stats()
    }

    /// Returns the number of containers.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    async fn after_write(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        let writes = self.writes_since_save.fetch_add(1, Ordering::SeqCst);
        if writes >= self.auto_save_threshold {
            if let Err(e) = self.save().await {
                warn!(path = ?self.path, error = %e, "Auto-save failed, changes stay in memory until flushed");
            }
        }
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if self.is_dirty() {
            warn!(path = ?self.path, "FileStore dropped with unsaved changes");
        }
    }
}

#[async_trait]
impl ContainerStore for FileStore {
    async fn create(
        &self,
        container: &ContainerRef,
        policy: ContainerPolicy,
        entries: Vec<(String, Vec<u8>)>,
    ) -> Result<()> {
        self.memory.create(container, policy, entries).await?;
        self.after_write().await;
        Ok(())
    }

    async fn exists(&self, container: &ContainerRef) -> Result<bool> {
        self.memory.exists(container).await
    }

    async fn get(&self, container: &ContainerRef, key: &str) -> Result<Versioned<Vec<u8>>> {
        self.memory.get(container, key).await
    }

    async fn insert(
        &self,
        container: &ContainerRef,
        key: &str,
        value: Vec<u8>,
        signer: &PublicKey,
    ) -> Result<()> {
        self.memory.insert(container, key, value, signer).await?;
        self.after_write().await;
        Ok(())
    }

    async fn update(
        &self,
        container: &ContainerRef,
        key: &str,
        value: Vec<u8>,
        observed_version: u64,
        signer: &PublicKey,
    ) -> Result<u64> {
        let version = self
            .memory
            .update(container, key, value, observed_version, signer)
            .await?;
        self.after_write().await;
        Ok(version)
    }

    async fn delete(
        &self,
        container: &ContainerRef,
        key: &str,
        observed_version: u64,
        signer: &PublicKey,
    ) -> Result<u64> {
        let version = self.memory.delete(container, key, observed_version, signer).await?;
        self.after_write().await;
        Ok(version)
    }

    async fn entries(&self, container: &ContainerRef) -> Result<Vec<ContainerEntry>> {
        self.memory.entries(container).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use xorcoin_core::types::XorAddress;

    fn container(n: u8) -> ContainerRef {
        ContainerRef::new(XorAddress::from_array([n; 32]), 21_082_018)
    }

    fn owner() -> PublicKey {
        PublicKey::from_bytes(vec![0xAA; 16])
    }

    async fn seed(store: &FileStore, n: u8) {
        store
            .create(
                &container(n),
                ContainerPolicy::public(owner()).with_open_update(),
                vec![("coin".into(), vec![n])],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_new_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");

        let store = FileStore::new(&path).await.unwrap();
        assert!(store.is_empty());
        assert!(!path.exists()); // File not created until save
    }

    #[tokio::test]
    async fn test_save_and_load_keeps_versions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");

        {
            let store = FileStore::new(&path).await.unwrap();
            seed(&store, 1).await;
            seed(&store, 2).await;
            store.update(&container(1), "coin", vec![9], 0, &owner()).await.unwrap();
            store.save().await.unwrap();
        }

        {
            let store = FileStore::new(&path).await.unwrap();
            assert_eq!(store.len(), 2);

            let coin = store.get(&container(1), "coin").await.unwrap();
            assert_eq!(coin, Versioned::new(vec![9], 1));

            // Version checks still apply after reload
            let stale = store.update(&container(1), "coin", vec![3], 0, &owner()).await;
            assert!(matches!(stale, Err(CoinError::VersionConflict { .. })));
            store.flush().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_dirty_tracking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");

        let store = FileStore::new(&path).await.unwrap();
        assert!(!store.is_dirty());

        seed(&store, 1).await;
        assert!(store.is_dirty());

        store.save().await.unwrap();
        assert!(!store.is_dirty());

        // Failed writes do not dirty the store
        let _ = store.update(&container(1), "coin", vec![1], 7, &owner()).await;
        assert!(!store.is_dirty());
    }

    #[tokio::test]
    async fn test_auto_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");

        // Saves when writes_since_save >= 2, i.e. on the third write
        let store = FileStore::with_auto_save(&path, 2).await.unwrap();

        seed(&store, 1).await;
        seed(&store, 2).await;
        assert!(!path.exists());

        seed(&store, 3).await;

        let reloaded = FileStore::new(&path).await.unwrap();
        assert_eq!(reloaded.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_auto_save_keeps_landed_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");
        let temp_path = path.with_extension("tmp");

        let store = FileStore::with_auto_save(&path, 0).await.unwrap();
        seed(&store, 1).await;

        // A directory in the temp file's place makes every save fail
        fs::create_dir(&temp_path).await.unwrap();
        let version = store.update(&container(1), "coin", vec![7], 0, &owner()).await.unwrap();
        assert_eq!(version, 1);
        assert_eq!(store.get(&container(1), "coin").await.unwrap(), Versioned::new(vec![7], 1));
        assert!(store.is_dirty());
        assert!(store.flush().await.is_err());
        assert!(store.is_dirty());

        fs::remove_dir(&temp_path).await.unwrap();
        store.flush().await.unwrap();
        assert!(!store.is_dirty());

        let reloaded = FileStore::new(&path).await.unwrap();
        assert_eq!(reloaded.get(&container(1), "coin").await.unwrap(), Versioned::new(vec![7], 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_with_auto_save() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");
        let store = Arc::new(FileStore::with_auto_save(&path, 0).await.unwrap());
        seed(&store, 1).await;

        let mut tasks = JoinSet::new();
        for i in 0..16u8 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .insert(&container(1), &format!("tx{}", i), vec![i + 1], &owner())
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }
        store.flush().await.unwrap();

        let reloaded = FileStore::new(&path).await.unwrap();
        assert_eq!(reloaded.entries(&container(1)).await.unwrap().len(), 17);
    }

    #[tokio::test]
    async fn test_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");

        let store = FileStore::new(&path).await.unwrap();
        seed(&store, 1).await;

        store.flush().await.unwrap();
        assert!(!store.is_dirty());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_invalid_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");

        fs::write(&path, b"invalid data").await.unwrap();
        assert!(FileStore::new(&path).await.is_err());

        fs::write(&path, b"XCNS\x09\x00\x00\x00\x00\x00\x00\x00\x00[]").await.unwrap();
        assert!(matches!(
            FileStore::new(&path).await,
            Err(CoinError::VersionMismatch { expected: 1, actual: 9 })
        ));
    }

    #[tokio::test]
    async fn test_atomic_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.bin");
        let temp_path = path.with_extension("tmp");

        let store = FileStore::new(&path).await.unwrap();
        seed(&store, 1).await;
        store.save().await.unwrap();

        assert!(!temp_path.exists());
        assert!(path.exists());
    }
}
