#![forbid(unsafe_code)]

//! Runtime: reactive bindings between observed values and persistent stores.
//!
//! # Role in Keepsake
//! `keepsake-runtime` owns the binding logic. A [`Persisted<T>`] links one
//! [`StorageKey`](keepsake_core::StorageKey) of a
//! [`KeyValueStore`](keepsake_core::KeyValueStore) to one observed value:
//! it reads the record when created, writes every update through, deletes
//! the record when the value is cleared, and notifies subscribers
//! synchronously.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use keepsake_core::{KeyValueStore, MemoryStore};
//! use keepsake_runtime::{InitialValue, Persisted};
//!
//! let store = Rc::new(MemoryStore::new());
//! let name = Persisted::<String>::create(
//!     store.clone(),
//!     "name",
//!     InitialValue::value("Test1".to_string()),
//! )
//! .unwrap();
//! assert_eq!(name.value().as_deref(), Some("Test1"));
//! assert_eq!(store.get("name").unwrap().as_deref(), Some("\"Test1\""));
//!
//! name.set("New Test1".to_string()).unwrap();
//! assert_eq!(store.get("name").unwrap().as_deref(), Some("\"New Test1\""));
//!
//! name.clear().unwrap();
//! assert_eq!(name.value(), None);
//! assert_eq!(store.get("name").unwrap(), None);
//! ```

pub mod reactive;

pub use reactive::{
    BindingState, InitialValue, ObservedCell, Persisted, Setter, Subscription, Update,
};
