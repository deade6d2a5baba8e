//! Update requests accepted by a binding.

/// What a binding should do with its value.
///
/// The variant, not the shape of `T`, decides whether an argument is applied
/// as a function, so a `T` that is itself callable is never invoked by
/// accident.
pub enum Update<T> {
    /// Replace the value and write it through.
    Set(T),
    /// Drop the value and remove the record.
    Clear,
    /// Compute the next value from the current one. Returning `None` clears.
    With(Box<dyn FnOnce(Option<&T>) -> Option<T>>),
}

impl<T> Update<T> {
    /// Functional update from the previous value.
    pub fn with(f: impl FnOnce(Option<&T>) -> Option<T> + 'static) -> Self {
        Self::With(Box::new(f))
    }

    /// Resolve against `current`, producing the value to apply.
    pub fn resolve(self, current: Option<&T>) -> Option<T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Clear => None,
            Self::With(f) => f(current),
        }
    }
}

impl<T> From<Option<T>> for Update<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Set(value),
            None => Self::Clear,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Set(value) => f.debug_tuple("Set").field(value).finish(),
            Self::Clear => f.write_str("Clear"),
            Self::With(_) => f.write_str("With(..)"),
        }
    }
}
