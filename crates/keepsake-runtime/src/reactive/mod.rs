#![forbid(unsafe_code)]

//! Reactive persisted bindings.
//!
//! This module provides the pieces a host needs to keep a value both
//! observable and durable:
//!
//! - [`ObservedCell`]: a version-tracked optional value with synchronous
//!   subscriber notification.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`InitialValue`]: literal or lazily computed default, resolved once.
//! - [`Update`]: replace, clear, or derive-from-previous update request.
//! - [`Persisted`]: the binding itself, plus its detached [`Setter`].
//!
//! # Architecture
//!
//! Everything is single-threaded and synchronous. `Persisted<T>` shares its
//! state through `Rc`, holds an `Rc<dyn KeyValueStore>`, and owns an
//! `ObservedCell<T>` that hosts subscribe to for re-rendering.
//!
//! # Invariants
//!
//! 1. Outside an in-flight update, a present observed value equals the
//!    decoded record at the binding's key; an absent value means no record.
//! 2. Each update issues exactly one store write or removal and no read.
//! 3. Subscribers are notified after the store operation succeeds, in
//!    registration order.
//! 4. A failed update leaves the observed value unchanged.

pub mod initial;
pub mod observed;
pub mod persisted;
pub mod update;

pub use initial::InitialValue;
pub use observed::{ObservedCell, Subscription};
pub use persisted::{BindingState, Persisted, Setter};
pub use update::Update;
