//! "Already computed" markers for derived artifacts.
//!
//! A [`CacheStore`] maps a fingerprint to the instant its marker expires.
//! The resizer only trusts a hit when the store reports the fingerprint as
//! live **and** the artifact file still exists on disk, so a store can lose
//! entries (restart, corruption, manual cleanup) without ever serving a
//! missing file. Losing an entry only costs one recomputation.
//!
//! # Stores
//!
//! - [`MemoryStore`]: a process-local map. Nothing survives a restart.
//!   Expired entries are pruned on every `put`.
//! - [`FileStore`]: a JSON manifest at `<root>/.image-resizer-cache.json`,
//!   shared by every process writing to the same root. Expired entries are
//!   pruned whenever the manifest is rewritten. A manifest that cannot be
//!   parsed or was written by another format version loads as empty.
//!
//! The store is picked by the `cache` config key via [`open_store`].
//!
//! # Expiry
//!
//! `put` records `now + ttl` and `has` is true while `now < expiry`. Markers
//! are never refreshed in place: a new `put` for the same fingerprint simply
//! replaces the old expiry.

use crate::config::{CacheDriver, ResizerConfig};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Name of the file store manifest within the output root.
const MANIFEST_FILENAME: &str = ".image-resizer-cache.json";

/// Version of the manifest format. Bump this to discard every existing
/// manifest when the layout or fingerprint derivation changes.
const MANIFEST_VERSION: u32 = 1;

/// Pluggable fingerprint → expiry store.
///
/// Implementations must be shareable across threads; the resizer holds one
/// store and may be called concurrently.
pub trait CacheStore: Send + Sync {
    /// Whether `fingerprint` has a marker that is still live at `now`.
    fn has_at(&self, fingerprint: &str, now: DateTime<Utc>) -> bool;

    /// Record a marker for `fingerprint` expiring `ttl_minutes` after `now`.
    fn put_at(&self, fingerprint: &str, ttl_minutes: u32, now: DateTime<Utc>) -> io::Result<()>;

    fn has(&self, fingerprint: &str) -> bool {
        self.has_at(fingerprint, Utc::now())
    }

    fn put(&self, fingerprint: &str, ttl_minutes: u32) -> io::Result<()> {
        self.put_at(fingerprint, ttl_minutes, Utc::now())
    }
}

fn expiry(now: DateTime<Utc>, ttl_minutes: u32) -> DateTime<Utc> {
    now + Duration::minutes(i64::from(ttl_minutes))
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded markers. Expired ones linger until the next `put`.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn has_at(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(fingerprint)
            .is_some_and(|expires| now < *expires)
    }

    fn put_at(&self, fingerprint: &str, ttl_minutes: u32, now: DateTime<Utc>) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, expires| now < *expires);
        entries.insert(fingerprint.to_string(), expiry(now, ttl_minutes));
        Ok(())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

/// On-disk manifest layout.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Manifest {
    version: u32,
    /// Fingerprint → expiry instant (RFC 3339).
    entries: BTreeMap<String, DateTime<Utc>>,
}

impl Manifest {
    fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// JSON manifest store shared across processes.
///
/// Every call re-reads the manifest so markers written by other processes
/// are seen. Writes within one process are serialized by a lock; writes from
/// different processes may race, in which case the last writer wins and the
/// losing entries are simply recomputed later.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store whose manifest lives directly under `root`.
    pub fn new(root: &Path) -> Self {
        Self {
            path: manifest_path(root),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns an empty manifest if the file doesn't exist or can't be
    /// parsed (version mismatch, corruption).
    fn load(&self) -> Manifest {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Manifest::empty(),
        };
        match serde_json::from_str::<Manifest>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            Ok(m) => {
                debug!(
                    "Ignoring cache manifest version {} at {}",
                    m.version,
                    self.path.display()
                );
                Manifest::empty()
            }
            Err(e) => {
                debug!("Ignoring unreadable cache manifest {}: {e}", self.path.display());
                Manifest::empty()
            }
        }
    }

    fn save(&self, manifest: &Manifest) -> io::Result<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        write_atomic(&self.path, json.as_bytes())
    }
}

impl CacheStore for FileStore {
    fn has_at(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        self.load()
            .entries
            .get(fingerprint)
            .is_some_and(|expires| now < *expires)
    }

    fn put_at(&self, fingerprint: &str, ttl_minutes: u32, now: DateTime<Utc>) -> io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut manifest = self.load();
        manifest.entries.retain(|_, expires| now < *expires);
        manifest
            .entries
            .insert(fingerprint.to_string(), expiry(now, ttl_minutes));
        self.save(&manifest)
    }
}

/// Resolve the file store manifest path for an output root.
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILENAME)
}

/// Open the store selected by `config.cache`.
pub fn open_store(config: &ResizerConfig) -> Box<dyn CacheStore> {
    match config.cache {
        CacheDriver::File => Box::new(FileStore::new(&config.root)),
        CacheDriver::Memory => Box::new(MemoryStore::new()),
    }
}

/// Write `bytes` to `path` through a temp file in the same directory and an
/// atomic rename. Parent directories are created as needed.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
