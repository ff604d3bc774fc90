//! PATCH body semantics shared by every partial-update call site.
//!
//! A field in a partial update is in one of three states: left alone, explicitly
//! cleared, or set to a new value. [`FieldPatch`] names those states and
//! [`present_fields`] is the one place that decides which keys reach the wire.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Three-state field of a partial update.
///
/// Declare patch struct fields as
/// `#[serde(default, skip_serializing_if = "FieldPatch::is_unset")]` so that `Unset`
/// is omitted, `Clear` serializes as `null` and `Value(x)` as `x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPatch<T> {
    /// Not part of the patch; the server keeps its current value.
    Unset,
    /// Explicitly remove the current value.
    Clear,
    /// Replace the current value.
    Value(T),
}

impl<T> Default for FieldPatch<T> {
    fn default() -> Self {
        FieldPatch::Unset
    }
}

impl<T> FieldPatch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, FieldPatch::Unset)
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, FieldPatch::Clear)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FieldPatch::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> FieldPatch<&T> {
        match self {
            FieldPatch::Unset => FieldPatch::Unset,
            FieldPatch::Clear => FieldPatch::Clear,
            FieldPatch::Value(v) => FieldPatch::Value(v),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldPatch<U> {
        match self {
            FieldPatch::Unset => FieldPatch::Unset,
            FieldPatch::Clear => FieldPatch::Clear,
            FieldPatch::Value(v) => FieldPatch::Value(f(v)),
        }
    }

    /// The value the server holds after applying this patch on top of `current`.
    pub fn resolve(self, current: Option<T>) -> Option<T> {
        match self {
            FieldPatch::Unset => current,
            FieldPatch::Clear => None,
            FieldPatch::Value(v) => Some(v),
        }
    }
}

impl FieldPatch<String> {
    /// Interpret a text input: an empty or missing value means "leave unchanged".
    pub fn from_form(input: Option<String>) -> Self {
        match input {
            Some(v) if !v.is_empty() => FieldPatch::Value(v),
            _ => FieldPatch::Unset,
        }
    }
}

impl<T> From<Option<T>> for FieldPatch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldPatch::Value(v),
            None => FieldPatch::Unset,
        }
    }
}

impl<T: Serialize> Serialize for FieldPatch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldPatch::Value(v) => serializer.serialize_some(v),
            FieldPatch::Unset | FieldPatch::Clear => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldPatch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => FieldPatch::Value(v),
            None => FieldPatch::Clear,
        })
    }
}

/// Keep only the `keys` that are present in `object` with a value other than `""`.
///
/// Values pass through unchanged; `null` stays, since it is an explicit clear. The
/// returned map is ordered by key, not by `keys`.
pub fn present_fields(object: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| match object.get(*key) {
            None => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(value) => Some((key.to_string(), value.clone())),
        })
        .collect()
}

/// Serialize `patch` and reduce it to a PATCH body with [`present_fields`].
pub fn patch_body<T: Serialize>(
    patch: &T,
    keys: &[&str],
) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(patch)? {
        Value::Object(object) => Ok(present_fields(&object, keys)),
        other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "patch must serialize to a JSON object, got {}",
            other
        ))),
    }
}
