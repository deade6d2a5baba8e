#![forbid(unsafe_code)]

//! Observed optional value with synchronous change notification.
//!
//! # Design
//!
//! [`ObservedCell<T>`] holds an `Option<T>` (where `None` is the absence
//! marker) in shared, reference-counted storage. Replacing the value with a
//! different one (by `PartialEq`) bumps the version and calls every live
//! subscriber in registration order before `replace` returns.
//!
//! # Performance
//!
//! | Operation     | Complexity                 |
//! |---------------|----------------------------|
//! | `get()`       | O(1) + clone of `T`        |
//! | `replace()`   | O(S) where S = subscribers |
//! | `subscribe()` | O(1) amortized             |
//!
//! # Failure Modes
//!
//! - **Re-entrant replace**: a subscriber may call `replace()` on the same
//!   cell; callbacks run outside the interior borrow, so this nests instead of
//!   panicking. The nested notification delivers the newer value to every
//!   subscriber, and the outer loop stops there, so no subscriber is left
//!   holding a superseded value.
//! - **Re-entrant `with`**: calling `replace()` from inside a `with()`
//!   closure panics (the value is still borrowed).
//! - **Subscriber leak**: callbacks live as long as their [`Subscription`].
//!   Dead entries are pruned lazily during notification.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(Option<&T>)>;
type CallbackWeak<T> = Weak<dyn Fn(Option<&T>)>;

struct CellInner<T> {
    value: Option<T>,
    version: u64,
    subscribers: Vec<CallbackWeak<T>>,
}

/// A shared, version-tracked optional value.
///
/// Cloning an `ObservedCell` creates another handle to the **same** state.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing `replace`.
/// 2. `replace(v)` where `v == current` changes nothing and notifies nobody.
/// 3. Subscribers are notified in registration order.
pub struct ObservedCell<T> {
    inner: Rc<RefCell<CellInner<T>>>,
}

impl<T> Clone for ObservedCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObservedCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservedCell")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> ObservedCell<T> {
    /// Create a cell at version 0 with no subscribers.
    #[must_use]
    pub fn new(value: Option<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CellInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    ///
    /// # Panics
    ///
    /// Panics if `f` calls [`replace`](Self::replace) on this cell.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.inner.borrow().value.as_ref())
    }

    /// Whether a value is present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.inner.borrow().value.is_some()
    }

    /// Replace the value. Returns whether it changed; subscribers have been
    /// notified by the time this returns `true`.
    pub fn replace(&self, value: Option<T>) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
        true
    }

    /// Register `callback` for value changes. It receives the new value
    /// (`None` when cleared). Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(Option<&T>) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Current version; changes only when the value does.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Registered subscribers, including dropped ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn notify(&self) {
        let (callbacks, value, version) = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let live: Vec<CallbackRc<T>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (live, inner.value.clone(), inner.version)
        };
        for cb in &callbacks {
            cb(value.as_ref());
            // A nested replace already delivered a newer value to everyone.
            if self.inner.borrow().version != version {
                break;
            }
        }
    }
}

/// RAII guard for a subscriber callback.
///
/// Holds the only strong reference to the callback; once dropped, the weak
/// entry in the cell fails to upgrade and is pruned on the next notification.
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
