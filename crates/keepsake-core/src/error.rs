//! Error types shared by codecs, stores, and bindings.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Surfaced as |
//! |---------|-------|-------------|
//! | Value not encodable | Codec rejects the value | [`PersistError::Serialization`] |
//! | Record not decodable | Corrupted or foreign-format record | [`PersistError::Deserialization`] |
//! | Store rejected an operation | Quota, I/O, unavailable backend | [`PersistError::Store`] |
//! | Empty key | Caller passed `""` | [`PersistError::InvalidKey`] |
//!
//! None of these are retried or swallowed by the crate.

/// Result alias for binding-level operations.
pub type Result<T> = std::result::Result<T, PersistError>;

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore) backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The write would grow the store past its capacity.
    QuotaExceeded {
        /// Bytes the store would hold after the write.
        needed: usize,
        /// Configured capacity in bytes.
        capacity: usize,
    },
    /// The backend cannot serve requests right now.
    Unavailable(String),
    /// An I/O operation on the backing medium failed.
    Io(String),
    /// The backing medium holds data the store cannot interpret.
    Corrupt(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded { needed, capacity } => {
                write!(f, "quota exceeded: {needed} bytes needed, capacity {capacity}")
            }
            Self::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            Self::Io(msg) => write!(f, "store i/o error: {msg}"),
            Self::Corrupt(msg) => write!(f, "store data corrupt: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Errors raised by a [`Codec`](crate::Codec). Keyless; bindings attach the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The value has no representation in the encoding.
    Encode(String),
    /// The raw record is not valid data for the encoding.
    Decode(String),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(msg) => write!(f, "encode failed: {msg}"),
            Self::Decode(msg) => write!(f, "decode failed: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Errors surfaced by persisted bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// The value could not be encoded for `key`.
    Serialization { key: String, message: String },
    /// The record stored at `key` could not be decoded.
    Deserialization { key: String, message: String },
    /// The store rejected an operation on `key`.
    Store { key: String, source: StoreError },
    /// Storage keys must be non-empty.
    InvalidKey,
}

impl PersistError {
    /// Attach `key` to a codec failure.
    #[must_use]
    pub fn from_codec(key: &str, err: CodecError) -> Self {
        match err {
            CodecError::Encode(message) => Self::Serialization {
                key: key.to_owned(),
                message,
            },
            CodecError::Decode(message) => Self::Deserialization {
                key: key.to_owned(),
                message,
            },
        }
    }

    /// Attach `key` to a store failure.
    #[must_use]
    pub fn from_store(key: &str, source: StoreError) -> Self {
        Self::Store {
            key: key.to_owned(),
            source,
        }
    }

    /// The key the failure relates to, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Serialization { key, .. }
            | Self::Deserialization { key, .. }
            | Self::Store { key, .. } => Some(key),
            Self::InvalidKey => None,
        }
    }
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization { key, message } => {
                write!(f, "cannot serialize value for '{key}': {message}")
            }
            Self::Deserialization { key, message } => {
                write!(f, "cannot deserialize record at '{key}': {message}")
            }
            Self::Store { key, source } => write!(f, "store error at '{key}': {source}"),
            Self::InvalidKey => write!(f, "storage key must not be empty"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}
