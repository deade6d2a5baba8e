#![forbid(unsafe_code)]

//! Conversion between in-memory values and stored record strings.
//!
//! # Invariants
//!
//! 1. **Round-trip**: for every value `v` a codec accepts,
//!    `decode(encode(v)) == v` under `PartialEq`.
//! 2. **Purity**: `decode` has no side effects and depends only on its input.
//! 3. **No absence sentinel**: codecs never see "no value". Absence is a
//!    missing record, handled by the binding as a store removal.
//!
//! The encoding is part of the durable contract: records written by one codec
//! are only readable by a codec producing the same format.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

/// Lossless conversion between `T` and a store record string.
pub trait Codec<T> {
    /// Encode `value` into its record string.
    fn encode(&self, value: &T) -> Result<String, CodecError>;

    /// Decode a record string back into a value.
    fn decode(&self, raw: &str) -> Result<T, CodecError>;
}

/// Compact JSON text via serde.
///
/// Strings encode with surrounding quotes (`"Test1"` becomes `"\"Test1\""`),
/// so records are interchangeable with any JSON-producing writer.
///
/// Non-finite floats serialize as `null` and fail to decode back into a
/// float; values containing them do not round-trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec {
    fn encode(&self, value: &T) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, raw: &str) -> Result<T, CodecError> {
        serde_json::from_str(raw).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
