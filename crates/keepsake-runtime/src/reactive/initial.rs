//! Default values for bindings whose key has no record yet.

/// Value used when a binding is created for a key with no stored record.
///
/// Resolved at most once per binding, and only when the record is missing;
/// a lazy producer is never called if the store already holds a value.
/// Resolving to `None` leaves the store without an entry.
pub enum InitialValue<T> {
    /// Use this value as-is.
    Literal(Option<T>),
    /// Compute the value on demand.
    Lazy(Box<dyn FnOnce() -> Option<T>>),
}

impl<T> InitialValue<T> {
    /// A literal default.
    pub fn value(value: T) -> Self {
        Self::Literal(Some(value))
    }

    /// No default: a missing record stays missing.
    pub fn absent() -> Self {
        Self::Literal(None)
    }

    /// A default computed by `f`, only if needed.
    pub fn lazy(f: impl FnOnce() -> T + 'static) -> Self {
        Self::Lazy(Box::new(move || Some(f())))
    }

    /// Like [`lazy`](Self::lazy), where the producer may decide on absence.
    pub fn lazy_optional(f: impl FnOnce() -> Option<T> + 'static) -> Self {
        Self::Lazy(Box::new(f))
    }

    /// Consume the value, running the producer if there is one.
    pub fn resolve(self) -> Option<T> {
        match self {
            Self::Literal(value) => value,
            Self::Lazy(f) => f(),
        }
    }
}

impl<T> From<Option<T>> for InitialValue<T> {
    fn from(value: Option<T>) -> Self {
        Self::Literal(value)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for InitialValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}
