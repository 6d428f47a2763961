use serde::{Deserialize, Deserializer};

/// Keeps "key absent" and "key is null" apart: absent stays `None` through
/// `#[serde(default)]`, null becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
