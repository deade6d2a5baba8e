#![forbid(unsafe_code)]

//! Persisted binding: an observed value kept in sync with one store key.
//!
//! # Design
//!
//! [`Persisted<T, C>`] owns the key, a shared handle to the store, a codec,
//! and an [`ObservedCell`] the host subscribes to. Creation reads the record
//! once; afterwards the binding never reads the store again and treats its
//! own cell as the source of truth for what the host sees.
//!
//! ```text
//! create ──► get(key) ──┬── Some(raw) ──► decode ──────────────► Synced(v)
//!                       └── None ──► resolve initial ──┬─ Some ─► set ─► Synced(v)
//!                                                      └─ None ─────────► Cleared
//! apply(Set v | With f→Some v) ──► encode ──► set(key) ──► replace ──► notify
//! apply(Clear | With f→None)   ──► remove(key) ────────► replace ──► notify
//! ```
//!
//! # Invariants
//!
//! 1. An existing record always wins over the initial value and is not
//!    rewritten on creation.
//! 2. The initial value is resolved at most once, and only if the record is
//!    missing.
//! 3. Every update performs exactly one `set` or `remove` and no `get`.
//! 4. The observed value changes only after the store accepted the write.
//! 5. The store write happens even when the new value equals the current one;
//!    subscribers are only notified when the value actually changes.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Record fails to decode on create | `PersistError::Deserialization`, no fallback to the initial value |
//! | Value fails to encode | `PersistError::Serialization`, store and value untouched |
//! | Store rejects get/set/remove | `PersistError::Store`, value untouched |
//!
//! Several bindings may share a key. They are not coordinated: the last
//! write wins in the store, and each binding only reflects its own writes.

use std::rc::Rc;

use keepsake_core::{Codec, JsonCodec, KeyValueStore, PersistError, Result, StorageKey};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::initial::InitialValue;
use super::observed::{ObservedCell, Subscription};
use super::update::Update;

/// Whether a binding currently holds a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// A value is present and stored.
    Synced,
    /// No value and no record.
    Cleared,
}

struct PersistedInner<T, C> {
    key: StorageKey,
    store: Rc<dyn KeyValueStore>,
    codec: C,
    cell: ObservedCell<T>,
}

impl<T: Clone + PartialEq + 'static, C: Codec<T>> PersistedInner<T, C> {
    fn apply(&self, update: Update<T>) -> Result<()> {
        let current = self.cell.get();
        self.commit(update.resolve(current.as_ref()))
    }

    fn commit(&self, next: Option<T>) -> Result<()> {
        match &next {
            Some(value) => write_through(&*self.store, &self.codec, &self.key, value)?,
            None => {
                self.store
                    .remove(self.key.as_str())
                    .map_err(|e| PersistError::from_store(self.key.as_str(), e))?;
                tracing::debug!(key = %self.key, "record removed");
            }
        }
        let changed = self.cell.replace(next);
        tracing::trace!(key = %self.key, changed, version = self.cell.version(), "binding updated");
        Ok(())
    }
}

fn write_through<T, C: Codec<T>>(
    store: &dyn KeyValueStore,
    codec: &C,
    key: &StorageKey,
    value: &T,
) -> Result<()> {
    let raw = codec
        .encode(value)
        .map_err(|e| PersistError::from_codec(key.as_str(), e))?;
    store
        .set(key.as_str(), &raw)
        .map_err(|e| PersistError::from_store(key.as_str(), e))?;
    tracing::debug!(key = %key, bytes = raw.len(), "record written");
    Ok(())
}

/// A value bound to one key of a [`KeyValueStore`].
///
/// Cloning a `Persisted` creates another handle to the **same** binding.
/// Dropping every handle detaches the binding; the record stays in the store.
pub struct Persisted<T, C = JsonCodec> {
    inner: Rc<PersistedInner<T, C>>,
}

impl<T, C> Clone for Persisted<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug, C> std::fmt::Debug for Persisted<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persisted")
            .field("key", &self.inner.key)
            .field("cell", &self.inner.cell)
            .finish_non_exhaustive()
    }
}

impl<T> Persisted<T, JsonCodec>
where
    T: Serialize + DeserializeOwned + Clone + PartialEq + 'static,
{
    /// Bind `key` of `store` using JSON records.
    ///
    /// Reads the record once. If present it is decoded and becomes the value;
    /// otherwise `initial` is resolved and, unless absent, written through.
    pub fn create(
        store: Rc<dyn KeyValueStore>,
        key: impl Into<String>,
        initial: InitialValue<T>,
    ) -> Result<Self> {
        Self::create_with_codec(store, key, initial, JsonCodec)
    }
}

impl<T, C> Persisted<T, C>
where
    T: Clone + PartialEq + 'static,
    C: Codec<T>,
{
    /// Bind `key` of `store`, encoding records with `codec`.
    pub fn create_with_codec(
        store: Rc<dyn KeyValueStore>,
        key: impl Into<String>,
        initial: InitialValue<T>,
        codec: C,
    ) -> Result<Self> {
        let key = StorageKey::new(key)?;
        let stored = store
            .get(key.as_str())
            .map_err(|e| PersistError::from_store(key.as_str(), e))?;

        let value = match stored {
            Some(raw) => {
                let value = codec.decode(&raw).map_err(|e| {
                    tracing::warn!(key = %key, error = %e, "stored record failed to decode");
                    PersistError::from_codec(key.as_str(), e)
                })?;
                tracing::debug!(key = %key, "binding hydrated from store");
                Some(value)
            }
            None => {
                let value = initial.resolve();
                if let Some(v) = &value {
                    write_through(&*store, &codec, &key, v)?;
                }
                tracing::debug!(key = %key, present = value.is_some(), "binding initialized");
                value
            }
        };

        Ok(Self {
            inner: Rc::new(PersistedInner {
                key,
                store,
                codec,
                cell: ObservedCell::new(value),
            }),
        })
    }

    /// The bound key.
    #[must_use]
    pub fn key(&self) -> &StorageKey {
        &self.inner.key
    }

    /// Clone of the current value (`None` when cleared).
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.inner.cell.get()
    }

    /// Run `f` on a snapshot of the current value.
    ///
    /// The value is cloned out first, so `f` may update this binding.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        let current = self.inner.cell.get();
        f(current.as_ref())
    }

    /// [`BindingState::Synced`] while a value is present, otherwise
    /// [`BindingState::Cleared`].
    #[must_use]
    pub fn state(&self) -> BindingState {
        if self.inner.cell.is_present() {
            BindingState::Synced
        } else {
            BindingState::Cleared
        }
    }

    /// Apply an update: write through (or remove), then notify.
    pub fn apply(&self, update: Update<T>) -> Result<()> {
        self.inner.apply(update)
    }

    /// Replace the value.
    pub fn set(&self, value: T) -> Result<()> {
        self.inner.commit(Some(value))
    }

    /// Clear the value and remove the record.
    pub fn clear(&self) -> Result<()> {
        self.inner.commit(None)
    }

    /// Derive the next value from the current one; `None` clears.
    pub fn update(&self, f: impl FnOnce(Option<&T>) -> Option<T> + 'static) -> Result<()> {
        self.inner.apply(Update::with(f))
    }

    /// Detached update handle sharing this binding.
    #[must_use]
    pub fn setter(&self) -> Setter<T, C> {
        Setter {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Split into the current value and the update handle.
    #[must_use]
    pub fn into_parts(self) -> (Option<T>, Setter<T, C>) {
        let value = self.value();
        (value, Setter { inner: self.inner })
    }

    /// Subscribe to value changes (see [`ObservedCell::subscribe`]).
    pub fn subscribe(&self, callback: impl Fn(Option<&T>) + 'static) -> Subscription {
        self.inner.cell.subscribe(callback)
    }

    /// Version of the observed value; bumps once per change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.cell.version()
    }

    /// Read the store and check that the record still matches the value.
    ///
    /// `Ok(false)` means another writer changed or removed the record.
    pub fn is_synced(&self) -> Result<bool> {
        let key = self.inner.key.as_str();
        let stored = self
            .inner
            .store
            .get(key)
            .map_err(|e| PersistError::from_store(key, e))?;
        match stored {
            None => Ok(!self.inner.cell.is_present()),
            Some(raw) => {
                let decoded = self
                    .inner
                    .codec
                    .decode(&raw)
                    .map_err(|e| PersistError::from_codec(key, e))?;
                Ok(self.inner.cell.with(|v| v == Some(&decoded)))
            }
        }
    }
}

/// Update handle detached from a [`Persisted`] binding.
///
/// Shares the binding's state; updates through a setter notify the same
/// subscribers. Cheap to clone.
pub struct Setter<T, C = JsonCodec> {
    inner: Rc<PersistedInner<T, C>>,
}

impl<T, C> Clone for Setter<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, C> std::fmt::Debug for Setter<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setter")
            .field("key", &self.inner.key)
            .finish_non_exhaustive()
    }
}

impl<T, C> Setter<T, C>
where
    T: Clone + PartialEq + 'static,
    C: Codec<T>,
{
    /// Apply an update to the shared binding (see [`Persisted::apply`]).
    pub fn apply(&self, update: Update<T>) -> Result<()> {
        self.inner.apply(update)
    }

    /// Replace the value.
    pub fn set(&self, value: T) -> Result<()> {
        self.inner.commit(Some(value))
    }

    /// Clear the value and remove the record.
    pub fn clear(&self) -> Result<()> {
        self.inner.commit(None)
    }

    /// Derive the next value from the current one; `None` clears.
    pub fn update(&self, f: impl FnOnce(Option<&T>) -> Option<T> + 'static) -> Result<()> {
        self.inner.apply(Update::with(f))
    }

    /// Current value of the shared binding.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.inner.cell.get()
    }

    /// Re-attach a full binding handle.
    #[must_use]
    pub fn binding(&self) -> Persisted<T, C> {
        Persisted {
            inner: Rc::clone(&self.inner),
        }
    }
}
