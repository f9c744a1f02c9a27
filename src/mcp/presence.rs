//! Optional tool arguments that remember whether they were supplied
//!
//! A caller may leave an optional argument out, send it as `null`, or send
//! a value. Only a sent value is forwarded to Label Studio.

use serde::{Deserialize, Deserializer};

/// Binding state of an optional argument
#[derive(Debug, Clone, PartialEq)]
pub enum Presence<T> {
    /// The key was absent from the arguments
    Omitted,
    /// The key was present with a `null` value
    Null,
    /// The key carried a value
    Given(T),
}

impl<T> Default for Presence<T> {
    fn default() -> Self {
        Presence::Omitted
    }
}

impl<T> Presence<T> {
    /// The supplied value, if any; `Omitted` and `Null` both yield `None`
    pub fn into_given(self) -> Option<T> {
        match self {
            Presence::Given(value) => Some(value),
            Presence::Omitted | Presence::Null => None,
        }
    }

    pub fn is_omitted(&self) -> bool {
        matches!(self, Presence::Omitted)
    }
}

// Absent keys never reach this impl: fields are declared `#[serde(default)]`
// so they fall back to `Omitted`.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Presence<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Presence::Given(value),
            None => Presence::Null,
        })
    }
}
