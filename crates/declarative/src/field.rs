//! Three-state attribute values for desired and persisted snapshots

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A snapshot attribute
///
/// - `Unset`: the caller did not specify a value; mappers may default it
/// - `Unknown`: the value depends on a remote call that has not happened yet
/// - `Known`: an explicit value
///
/// Serializes as the plain value for `Known` and as `null` otherwise, so a
/// persisted snapshot never carries `Unknown` across a save/load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    #[default]
    Unset,
    Unknown,
    Known(T),
}

impl<T> Field<T> {
    /// Whether the caller left this attribute out
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Whether this attribute waits on a remote call
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Whether this attribute holds an explicit value
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Whether this attribute is either unset or unknown
    pub fn is_absent(&self) -> bool {
        !self.is_known()
    }

    /// Borrow the explicit value, if any
    pub fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Take the explicit value, if any
    pub fn into_known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Replace an absent value with the result of `default`
    pub fn default_with(&mut self, default: impl FnOnce() -> T) {
        if self.is_absent() {
            *self = Self::Known(default());
        }
    }

    /// Replace an unknown value with the result of `default`, leaving unset alone
    pub fn resolve_unknown(&mut self, default: impl FnOnce() -> T) {
        if self.is_unknown() {
            *self = Self::Known(default());
        }
    }

    /// Take `other`'s explicit value when this attribute is unknown
    pub fn inherit(&mut self, other: &Self)
    where
        T: Clone,
    {
        if self.is_unknown()
            && let Self::Known(value) = other
        {
            *self = Self::Known(value.clone());
        }
    }

    /// Map the explicit value, keeping the state otherwise
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Self::Unset => Field::Unset,
            Self::Unknown => Field::Unknown,
            Self::Known(value) => Field::Known(f(value)),
        }
    }

    /// Use `other` when this attribute is absent
    pub fn or(self, other: Self) -> Self {
        if self.is_known() { self } else { other }
    }

    /// Turn an unset attribute into an unknown one
    ///
    /// Used when building a desired snapshot for computed attributes the
    /// caller omitted.
    pub fn or_unknown(self) -> Self {
        match self {
            Self::Unset => Self::Unknown,
            other => other,
        }
    }
}

impl<T: Clone + Default> Field<T> {
    /// The explicit value, or `T::default()` when absent
    pub fn value(&self) -> T {
        self.as_known().cloned().unwrap_or_default()
    }
}

impl Field<String> {
    /// The explicit string, or `""` when absent
    pub fn as_str(&self) -> &str {
        self.as_known().map_or("", String::as_str)
    }

    /// Whether the attribute is absent or an empty string
    pub fn is_blank(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Self::Known)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(value) => serializer.serialize_some(value),
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}
