//! Serde helpers for partial updates.

use serde::{Deserialize, Deserializer};

/// Deserialize a nullable field so that an absent key and an explicit `null`
/// can be told apart. Use with `#[serde(default, deserialize_with = ...)]`:
///
/// - absent: `None`
/// - `null`: `Some(None)`
/// - value: `Some(Some(value))`
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Apply a [`double_option`] patch to a nullable column value.
pub fn patch_nullable<T>(current: Option<T>, patch: Option<Option<T>>) -> Option<T> {
    match patch {
        Some(value) => value,
        None => current,
    }
}
