#![forbid(unsafe_code)]

//! Durable store backed by a single JSON object file.
//!
//! # Format
//!
//! The file holds one JSON object mapping each key to its record string:
//!
//! ```text
//! {"name":"\"Test1\"","prefs":"{\"theme\":\"dark\"}"}
//! ```
//!
//! Records are opaque strings here; their encoding belongs to the codec that
//! wrote them.
//!
//! # Invariants
//!
//! 1. **Write-through**: `set`/`remove` return only after the whole file has
//!    been rewritten and synced.
//! 2. **Atomic replace**: the file is written to a sibling `*.tmp` path and
//!    renamed over the original, so readers never observe a torn file.
//! 3. **Failed writes roll back**: if persisting fails, the in-memory view is
//!    restored to its pre-call state before the error is returned.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unparsable file | Corruption, foreign writer | `open` fails with [`StoreError::Corrupt`] |
//! | Missing file | First run | Store opens empty; file created on first write |
//! | Missing parent dir | `create_dirs(false)` | Writes fail with [`StoreError::Io`] |
//! | Quota | Write grows past `quota_bytes` | [`StoreError::QuotaExceeded`], file untouched |

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::store::{KeyValueStore, bytes_after_set, entry_bytes};

/// Environment variable naming the backing file for [`FileStoreConfig::from_env`].
pub const ENV_STORE_PATH: &str = "KEEPSAKE_STORE_PATH";

/// Environment variable holding an optional byte quota.
pub const ENV_STORE_QUOTA: &str = "KEEPSAKE_STORE_QUOTA";

/// Configuration for a [`FileStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStoreConfig {
    /// Path of the backing JSON file.
    pub path: PathBuf,

    /// Create missing parent directories on open. Default: true.
    pub create_dirs: bool,

    /// Reject writes that would grow the store past this many bytes
    /// (keys plus records). Default: unbounded.
    pub quota_bytes: Option<usize>,
}

impl FileStoreConfig {
    /// Configuration for `path` with defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_dirs: true,
            quota_bytes: None,
        }
    }

    /// Set whether missing parent directories are created.
    #[must_use]
    pub fn create_dirs(mut self, create: bool) -> Self {
        self.create_dirs = create;
        self
    }

    /// Set the byte quota.
    #[must_use]
    pub fn quota_bytes(mut self, quota: Option<usize>) -> Self {
        self.quota_bytes = quota;
        self
    }

    /// Read configuration from [`ENV_STORE_PATH`] and [`ENV_STORE_QUOTA`].
    ///
    /// Returns `None` when no path is set. An unparsable quota is ignored.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable variable lookup.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let path = lookup(ENV_STORE_PATH).filter(|p| !p.is_empty())?;
        let quota = lookup(ENV_STORE_QUOTA).and_then(|v| v.trim().parse().ok());
        Some(Self::new(path).quota_bytes(quota))
    }
}

#[derive(Debug, Default)]
struct FileInner {
    entries: BTreeMap<String, String>,
    used: usize,
}

/// Key-value store persisted to a JSON file. Single-process, single-writer.
#[derive(Debug)]
pub struct FileStore {
    config: FileStoreConfig,
    inner: RefCell<FileInner>,
}

impl FileStore {
    /// Open (or prepare to create) the store described by `config`.
    pub fn open(config: FileStoreConfig) -> Result<Self, StoreError> {
        if config.create_dirs {
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let entries = load_entries(&config.path)?;
        let used = entries.iter().map(|(k, v)| entry_bytes(k, v)).sum();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            path = %config.path.display(),
            records = entries.len(),
            bytes = used,
            "file store opened"
        );

        Ok(Self {
            config,
            inner: RefCell::new(FileInner { entries, used }),
        })
    }

    /// Open the store at `path` with default configuration.
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open(FileStoreConfig::new(path))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// All keys, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().entries.keys().cloned().collect()
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string(entries).map_err(|e| StoreError::Io(e.to_string()))?;
        replace_file(&self.config.path, |file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        })?;

        #[cfg(feature = "tracing")]
        tracing::trace!(
            path = %self.config.path.display(),
            bytes = json.len(),
            "file store persisted"
        );
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.borrow().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        let needed = bytes_after_set(&inner.entries, inner.used, key, value);
        if let Some(capacity) = self.config.quota_bytes.filter(|&cap| needed > cap) {
            return Err(StoreError::QuotaExceeded { needed, capacity });
        }

        let previous = inner.entries.insert(key.to_owned(), value.to_owned());
        if let Err(err) = self.persist(&inner.entries) {
            match previous {
                Some(old) => inner.entries.insert(key.to_owned(), old),
                None => inner.entries.remove(key),
            };
            return Err(err);
        }
        inner.used = needed;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        let Some(old) = inner.entries.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.persist(&inner.entries) {
            inner.entries.insert(key.to_owned(), old);
            return Err(err);
        }
        inner.used -= entry_bytes(key, &old);
        Ok(())
    }
}

/// Write `path` through a sibling temp file and rename it into place.
///
/// The temp file is removed if any step fails, so a failed write leaves
/// neither a partial file nor a stray `*.tmp` behind.
fn replace_file(
    path: &Path,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<()> {
    let tmp = tmp_path(path);
    let result = File::create(&tmp)
        .and_then(|mut file| write(&mut file))
        .and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(err.into()),
    };
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&text)
        .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))
}
