//! On-disk dictionary store: binary record file, prefix-bucketed position
//! index, incremental merge, and the cached lookup path.

pub mod index;
pub mod merge;
pub mod reader;
pub mod types;

pub use index::PositionIndex;
pub use merge::{ImportOptions, ImportOutcome, SourceFormat, import};
pub use reader::Lookup;
pub use types::{Entry, PrefixKey, Span};

use crate::utils::hash::file_digest;
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

const STORE_FILE: &str = "dictionary.lexdata";
const INDEX_FILE: &str = "dictionary.lexpos";
const STORE_TEMP_FILE: &str = "dictionary.lexdata.tmp";
const INDEX_TEMP_FILE: &str = "dictionary.lexpos.tmp";

/// Owner of the persisted store/index pair and of the in-memory
/// [`PositionIndex`] snapshot. The snapshot is only ever replaced wholesale
/// (never mutated in place), so concurrent readers observe either the fully
/// old or the fully new index.
pub struct Store {
    dir: PathBuf,
    snapshot: RwLock<Arc<PositionIndex>>,
    generation: AtomicU64,
}

impl Store {
    /// Open a store rooted at `dir`, loading the index snapshot if the index
    /// file exists. The directory is created if missing.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create store directory {}", dir.display()))?;
        let store = Self {
            dir: dir.to_path_buf(),
            snapshot: RwLock::new(Arc::new(PositionIndex::empty())),
            generation: AtomicU64::new(0),
        };
        if store.index_path().exists() {
            let text = fs::read_to_string(store.index_path())
                .with_context(|| format!("failed to read {}", store.index_path().display()))?;
            store.install(PositionIndex::parse(&text));
        }
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub(crate) fn store_temp_path(&self) -> PathBuf {
        self.dir.join(STORE_TEMP_FILE)
    }

    pub(crate) fn index_temp_path(&self) -> PathBuf {
        self.dir.join(INDEX_TEMP_FILE)
    }

    /// Current in-memory index snapshot.
    pub fn snapshot(&self) -> Arc<PositionIndex> {
        self.snapshot.read().expect("index snapshot lock poisoned").clone()
    }

    /// Replace the in-memory snapshot wholesale and bump the generation so
    /// readers know to drop buckets parsed from the previous store file.
    pub fn install(&self, index: PositionIndex) {
        let mut guard = self.snapshot.write().expect("index snapshot lock poisoned");
        *guard = Arc::new(index);
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Monotone counter identifying the installed snapshot.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Delete the persisted store and index. This is the manual resolution
    /// for the `IndexMissingWhileStorePresent` refusal.
    pub fn reset(&self) -> Result<()> {
        for path in [self.store_path(), self.index_path()] {
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
            }
        }
        self.install(PositionIndex::empty());
        info!("store reset at {}", self.dir.display());
        Ok(())
    }

    /// Content hashes of the persisted pair, for external edit detection.
    /// Returns `None` unless both files exist.
    pub fn fingerprint(&self) -> Result<Option<StoreFingerprint>> {
        let (store_path, index_path) = (self.store_path(), self.index_path());
        if !store_path.exists() || !index_path.exists() {
            return Ok(None);
        }
        Ok(Some(StoreFingerprint {
            store: file_digest(&store_path)?,
            index: file_digest(&index_path)?,
        }))
    }

    /// Size in bytes of the persisted store file, zero if absent.
    pub fn store_size(&self) -> u64 {
        fs::metadata(self.store_path()).map(|m| m.len()).unwrap_or(0)
    }
}

/// Hex digests of the persisted store/index pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFingerprint {
    pub store: String,
    pub index: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_empty_dir() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.snapshot().populated_count(), 0);
        assert_eq!(store.generation(), 0);
        assert!(store.fingerprint().unwrap().is_none());
    }

    #[test]
    fn test_install_bumps_generation() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store.install(PositionIndex::empty());
        store.install(PositionIndex::empty());
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_open_loads_existing_index() {
        let dir = tempdir().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            let mut populated = std::collections::BTreeMap::new();
            populated.insert(PrefixKey::of("cat"), vec![Span::new(0, 10)]);
            let index = PositionIndex::from_populated(populated);
            fs::write(store.index_path(), index.serialize()).unwrap();
        }
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.snapshot().populated_count(), 1);
        assert_eq!(
            store.snapshot().spans(PrefixKey::of("cat")),
            Some(&[Span::new(0, 10)][..])
        );
    }
}
