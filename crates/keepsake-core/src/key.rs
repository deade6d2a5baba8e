//! Validated storage keys.

use crate::error::PersistError;

/// Identifier of one slot in a key-value store.
///
/// Always non-empty. Several bindings may use the same key; nothing here
/// coordinates them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    /// Create a key, rejecting the empty string.
    pub fn new(key: impl Into<String>) -> Result<Self, PersistError> {
        let key = key.into();
        if key.is_empty() {
            return Err(PersistError::InvalidKey);
        }
        Ok(Self(key))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for StorageKey {
    type Error = PersistError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for StorageKey {
    type Error = PersistError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert_eq!(StorageKey::new(""), Err(PersistError::InvalidKey));
        assert!(StorageKey::try_from(String::new()).is_err());
    }

    #[test]
    fn accepts_any_non_empty() {
        let key = StorageKey::new("name").unwrap();
        assert_eq!(key.as_str(), "name");
        assert_eq!(key.to_string(), "name");

        let ws = StorageKey::try_from(" ").unwrap();
        assert_eq!(ws.as_ref(), " ");
    }
}
