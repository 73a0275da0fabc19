//! Untyped caller context as a tagged union
//!
//! Call sites attach free-form context to every entry. Rather than carrying
//! `serde_json::Value` through the whole stack, the context is modelled as
//! an explicit union so that consumers (redaction in particular) visit it
//! with an exhaustive match.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ordered string-keyed context map
pub type ContextMap = BTreeMap<String, ContextValue>;

/// A single context value
///
/// Serializes as plain JSON, so the on-disk line format is identical to
/// what a hand-written JSON object would look like.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ContextValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<ContextValue>),
    Map(ContextMap),
}

impl ContextValue {
    /// Borrow the string payload, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the nested map, if this is a map
    pub fn as_map(&self) -> Option<&ContextMap> {
        match self {
            ContextValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow the elements, if this is an array
    pub fn as_array(&self) -> Option<&[ContextValue]> {
        match self {
            ContextValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ContextValue::Null)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

impl From<&String> for ContextValue {
    fn from(value: &String) -> Self {
        ContextValue::String(value.clone())
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ContextValue {
                fn from(value: $t) -> Self {
                    ContextValue::Number(serde_json::Number::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl From<f64> for ContextValue {
    /// Non-finite floats have no JSON representation and become `Null`
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(ContextValue::Number)
            .unwrap_or(ContextValue::Null)
    }
}

impl From<f32> for ContextValue {
    fn from(value: f32) -> Self {
        ContextValue::from(value as f64)
    }
}

impl From<ContextMap> for ContextValue {
    fn from(value: ContextMap) -> Self {
        ContextValue::Map(value)
    }
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
    fn from(value: Vec<T>) -> Self {
        ContextValue::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ContextValue::Null)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ContextValue::Null,
            serde_json::Value::Bool(b) => ContextValue::Bool(b),
            serde_json::Value::Number(n) => ContextValue::Number(n),
            serde_json::Value::String(s) => ContextValue::String(s),
            serde_json::Value::Array(items) => {
                ContextValue::Array(items.into_iter().map(ContextValue::from).collect())
            }
            serde_json::Value::Object(map) => ContextValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ContextValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<ContextValue> for serde_json::Value {
    fn from(value: ContextValue) -> Self {
        match value {
            ContextValue::Null => serde_json::Value::Null,
            ContextValue::Bool(b) => serde_json::Value::Bool(b),
            ContextValue::Number(n) => serde_json::Value::Number(n),
            ContextValue::String(s) => serde_json::Value::String(s),
            ContextValue::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            ContextValue::Map(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

/// Convert a JSON object into a context map
///
/// Non-object values are wrapped under a single `value` key so that no
/// caller data is silently discarded.
pub fn context_from_json(value: serde_json::Value) -> ContextMap {
    match ContextValue::from(value) {
        ContextValue::Map(map) => map,
        ContextValue::Null => ContextMap::new(),
        other => {
            let mut map = ContextMap::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Build a [`ContextMap`] from `key => value` pairs
///
/// ```
/// use swipe_diag_core::context;
///
/// let ctx = context! {
///     "userId" => 42,
///     "screen" => "checkout",
///     "retry" => false,
/// };
/// assert_eq!(ctx.len(), 3);
/// ```
#[macro_export]
macro_rules! context {
    () => {
        $crate::ContextMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::ContextMap::new();
        $(
            map.insert(::std::string::String::from($key), $crate::ContextValue::from($value));
        )+
        map
    }};
}
