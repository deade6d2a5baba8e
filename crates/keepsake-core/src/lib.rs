#![forbid(unsafe_code)]

//! Core: storage keys, codecs, errors, and key-value store backends.
//!
//! # Role in Keepsake
//! `keepsake-core` is the durability layer. It owns the string encoding of
//! persisted values and the store abstraction those strings are written to.
//!
//! # Primary responsibilities
//! - **StorageKey**: validated, non-empty identifier of a store slot.
//! - **Codec**: lossless conversion between `T` and the stored string.
//! - **KeyValueStore**: synchronous get/set/remove capability, with
//!   [`MemoryStore`], [`PrefixedStore`] and [`FileStore`] backends.
//! - **Errors**: [`PersistError`], [`StoreError`], [`CodecError`].
//!
//! # How it fits in the system
//! The runtime (`keepsake-runtime`) binds an observed value to one key of a
//! store through a codec. Nothing here knows about observers or re-rendering.

pub mod codec;
pub mod error;
pub mod file_store;
pub mod key;
pub mod store;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use codec::{Codec, JsonCodec};
pub use error::{CodecError, PersistError, Result, StoreError};
pub use file_store::{FileStore, FileStoreConfig};
pub use key::StorageKey;
pub use store::{KeyValueStore, MemoryStore, PrefixedStore};
