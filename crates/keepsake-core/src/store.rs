#![forbid(unsafe_code)]

//! Synchronous key-value store abstraction and in-process backends.
//!
//! # Design
//!
//! [`KeyValueStore`] is the only capability bindings consume. All methods take
//! `&self`: a store is shared, externally owned state, and backends use
//! interior mutability. Each call is a single synchronous operation visible to
//! every later call on the same handle. There are no transactions and no
//! compare-and-set; concurrent writers to one key race and the last write wins.
//!
//! # Backends
//!
//! | Backend | Durability | Notes |
//! |---------|------------|-------|
//! | [`MemoryStore`] | process lifetime | optional byte quota |
//! | [`PrefixedStore`] | inherits inner store | namespaces keys |
//! | [`FileStore`](crate::FileStore) | on disk | JSON object file |

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::StoreError;

/// A synchronous string-to-string store.
pub trait KeyValueStore {
    /// Read the record at `key`, or `None` if there is no entry.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` at `key`, overwriting any existing record.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete the record at `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Rc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Byte footprint of one record, as counted against a quota.
pub(crate) fn entry_bytes(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Bytes a map would hold after writing `value` at `key`.
pub(crate) fn bytes_after_set(
    entries: &BTreeMap<String, String>,
    used: usize,
    key: &str,
    value: &str,
) -> usize {
    let replaced = entries.get(key).map_or(0, |old| entry_bytes(key, old));
    used - replaced + entry_bytes(key, value)
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<String, String>,
    used: usize,
}

/// In-process store backed by an ordered map.
///
/// Cloning is not provided; share a store between bindings with `Rc`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RefCell<MemoryInner>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Create an empty, unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects writes growing it past `bytes`
    /// (keys plus values, UTF-8 lengths).
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            inner: RefCell::default(),
            quota: Some(bytes),
        }
    }

    /// Configured quota, if any.
    #[must_use]
    pub fn quota(&self) -> Option<usize> {
        self.quota
    }

    /// Bytes currently held.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.inner.borrow().used
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

    /// Remove every record.
    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.entries.clear();
        inner.used = 0;
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.borrow().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        let needed = bytes_after_set(&inner.entries, inner.used, key, value);
        if let Some(capacity) = self.quota.filter(|&capacity| needed > capacity) {
            return Err(StoreError::QuotaExceeded { needed, capacity });
        }
        inner.entries.insert(key.to_owned(), value.to_owned());
        inner.used = needed;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if let Some(old) = inner.entries.remove(key) {
            inner.used -= entry_bytes(key, &old);
        }
        Ok(())
    }
}

/// Namespacing adapter: every key is stored as `<prefix><key>`.
#[derive(Debug, Clone)]
pub struct PrefixedStore<S> {
    inner: S,
    prefix: String,
}

impl<S: KeyValueStore> PrefixedStore<S> {
    /// Wrap `inner`, prefixing all keys with `prefix`.
    pub fn new(inner: S, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    /// The namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

impl<S: KeyValueStore> KeyValueStore for PrefixedStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(&self.full_key(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(&self.full_key(key), value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(&self.full_key(key))
    }
}
