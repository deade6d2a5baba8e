#![forbid(unsafe_code)]

//! Store wrappers for tests: operation recording and fault injection.
//!
//! Available under `cfg(test)` and the `test-helpers` feature.

use std::cell::RefCell;

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// One call observed by a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Get(String),
    Set(String, String),
    Remove(String),
}

impl StoreOp {
    /// Whether the operation mutates the store.
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Get(_))
    }
}

/// Forwards to an inner store and logs every call, failed or not.
#[derive(Debug, Default)]
pub struct RecordingStore<S> {
    inner: S,
    ops: RefCell<Vec<StoreOp>>,
}

impl<S: KeyValueStore> RecordingStore<S> {
    /// Wrap `inner` with an empty log.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            ops: RefCell::new(Vec::new()),
        }
    }

    /// Operations recorded so far, in call order.
    #[must_use]
    pub fn ops(&self) -> Vec<StoreOp> {
        self.ops.borrow().clone()
    }

    /// Drain the log.
    pub fn take_ops(&self) -> Vec<StoreOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    /// Number of recorded `set`/`remove` calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.ops.borrow().iter().filter(|op| op.is_write()).count()
    }

    /// Number of recorded `get` calls.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.ops.borrow().len() - self.write_count()
    }

    /// The wrapped store; calls made through it are not recorded.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: KeyValueStore> KeyValueStore for RecordingStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.ops.borrow_mut().push(StoreOp::Get(key.to_owned()));
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ops
            .borrow_mut()
            .push(StoreOp::Set(key.to_owned(), value.to_owned()));
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.ops.borrow_mut().push(StoreOp::Remove(key.to_owned()));
        self.inner.remove(key)
    }
}

#[derive(Debug, Default, Clone)]
struct Faults {
    get: Option<StoreError>,
    set: Option<StoreError>,
    remove: Option<StoreError>,
}

/// Forwards to an inner store, failing selected operations on demand.
///
/// Faults persist until cleared; a failing call never reaches the inner store.
#[derive(Debug, Default)]
pub struct FaultyStore<S> {
    inner: S,
    faults: RefCell<Faults>,
}

impl<S: KeyValueStore> FaultyStore<S> {
    /// Wrap `inner` with no faults armed.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: RefCell::default(),
        }
    }

    /// Fail subsequent `get` calls with `err` (`None` restores them).
    pub fn fail_get(&self, err: Option<StoreError>) {
        self.faults.borrow_mut().get = err;
    }

    /// Fail subsequent `set` calls with `err` (`None` restores them).
    pub fn fail_set(&self, err: Option<StoreError>) {
        self.faults.borrow_mut().set = err;
    }

    /// Fail subsequent `remove` calls with `err` (`None` restores them).
    pub fn fail_remove(&self, err: Option<StoreError>) {
        self.faults.borrow_mut().remove = err;
    }

    /// Restore all operations.
    pub fn heal(&self) {
        *self.faults.borrow_mut() = Faults::default();
    }

    /// The wrapped store; calls made through it bypass fault injection.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: KeyValueStore> KeyValueStore for FaultyStore<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(err) = self.faults.borrow().get.clone() {
            return Err(err);
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(err) = self.faults.borrow().set.clone() {
            return Err(err);
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if let Some(err) = self.faults.borrow().remove.clone() {
            return Err(err);
        }
        self.inner.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn recording_logs_in_order() {
        let store = RecordingStore::new(MemoryStore::new());
        store.get("a").unwrap();
        store.set("a", "1").unwrap();
        store.remove("a").unwrap();

        assert_eq!(
            store.ops(),
            vec![
                StoreOp::Get("a".into()),
                StoreOp::Set("a".into(), "1".into()),
                StoreOp::Remove("a".into()),
            ]
        );
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.read_count(), 1);

        assert_eq!(store.take_ops().len(), 3);
        assert!(store.ops().is_empty());
    }

    #[test]
    fn faulty_store_blocks_selected_ops() {
        let store = FaultyStore::new(MemoryStore::new());
        store.fail_set(Some(StoreError::Unavailable("offline".into())));

        let err = store.set("k", "v").unwrap_err();
        assert_eq!(err, StoreError::Unavailable("offline".into()));
        assert_eq!(store.inner().get("k").unwrap(), None);

        // Reads still work.
        assert_eq!(store.get("k").unwrap(), None);

        store.heal();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
