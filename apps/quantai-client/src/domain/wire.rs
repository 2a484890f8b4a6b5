//! Serde helpers shared by backend payload types.
//!
//! Part of the analysis payload is model output relayed as-is, so fields
//! typed as numbers or string lists may arrive as text, objects or `null`.
//! The `lenient_*` helpers keep whatever is readable instead of failing
//! the whole payload.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize `null` as `T::default()`.
///
/// Pair with `#[serde(default)]` so a missing field and an explicit `null`
/// behave the same. The backend emits `null` for values it could not
/// compute (NaN metrics, missing company names).
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a number that may arrive as numeric text (`"72"`, `"64.5%"`).
///
/// Anything unreadable, and non-finite values, become `None`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

/// Deserialize any JSON value as display text. `null` is empty.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(text_of)
}

/// Deserialize a list of display strings.
///
/// Non-string items are kept as their JSON text, `null` items are dropped,
/// and a lone scalar becomes a one-item list.
pub fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .into_iter()
            .filter(|item| !item.is_null())
            .map(text_of)
            .collect(),
        other => vec![text_of(other)],
    })
}

/// Deserialize a JSON object as a map; any other shape is empty.
pub fn lenient_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    })
}

/// Deserialize an object of display texts keyed by `K`.
///
/// `null` values are dropped. Anything but an object is `None`.
pub fn lenient_text_map<'de, D, K>(deserializer: D) -> Result<Option<BTreeMap<K, String>>, D::Error>
where
    D: Deserializer<'de>,
    K: From<String> + Ord,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => Some(
            map.into_iter()
                .filter(|(_, text)| !text.is_null())
                .map(|(key, text)| (K::from(key), text_of(text)))
                .collect(),
        ),
        _ => None,
    })
}

/// Deserialize `T`, falling back to `T::default()` when the value has the
/// wrong shape.
pub fn lenient_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn text_of(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    }
}
