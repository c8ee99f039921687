//! Dynamic object model for the values a host application hands to the scanner.
//!
//! Route handlers and the validation schemas attached to them are not Rust types the
//! scanner knows about. They arrive as loosely shaped property bags, possibly carrying
//! callable capabilities (`parse`, `safeParse`, a zero-argument `shape` accessor) and
//! lazily evaluated properties whose read may fail. [`HostValue`] models exactly that
//! surface so the locator and normalizer can probe shapes without knowing which library
//! produced them.

use crate::error::HostError;
use std::fmt;
use std::sync::Arc;

/// Callable capability exposed by a host object.
pub type HostFn = Arc<dyn Fn(&[HostValue]) -> Result<HostValue, HostError> + Send + Sync>;

/// Lazily evaluated property; evaluation may fail.
pub type HostGetter = Arc<dyn Fn() -> Result<HostValue, HostError> + Send + Sync>;

/// A value owned by the host application.
#[derive(Clone)]
pub enum HostValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<HostValue>),
    Object(HostObject),
    Function(HostFn),
    Getter(HostGetter),
}

/// Shared, insertion-ordered property bag with pointer identity.
#[derive(Clone, Default)]
pub struct HostObject {
    entries: Arc<Vec<(String, HostValue)>>,
}

impl HostObject {
    /// Create an object from its properties, keeping their declaration order.
    pub fn new<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, HostValue)>,
    {
        Self {
            entries: Arc::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Read a property, evaluating it if it is a getter.
    ///
    /// Returns `Ok(None)` when the property does not exist.
    pub fn get(&self, key: &str) -> Result<Option<HostValue>, HostError> {
        match self.entries.iter().find(|(k, _)| k == key) {
            Some((_, value)) => value.resolve().map(Some).map_err(|e| match e {
                HostError::Call(message) => HostError::PropertyAccess {
                    key: key.to_string(),
                    message,
                },
                other => other,
            }),
            None => Ok(None),
        }
    }

    /// Read a property and keep it only if it is an object.
    pub fn get_object(&self, key: &str) -> Result<Option<HostObject>, HostError> {
        Ok(self.get(key)?.and_then(|v| v.as_object().cloned()))
    }

    /// Read a property and keep it only if it is a string.
    pub fn get_str(&self, key: &str) -> Result<Option<String>, HostError> {
        Ok(self.get(key)?.and_then(|v| v.as_str().map(str::to_string)))
    }

    /// True when the property exists and is the boolean `true`.
    pub fn is_flag_set(&self, key: &str) -> Result<bool, HostError> {
        Ok(matches!(self.get(key)?, Some(HostValue::Bool(true))))
    }

    /// True when the property exists and is callable. Does not evaluate getters.
    pub fn has_function(&self, key: &str) -> bool {
        self.entries
            .iter()
            .any(|(k, v)| k == key && matches!(v, HostValue::Function(_)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identity comparison, not structural equality.
    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

impl HostValue {
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, HostValue)>,
    {
        HostValue::Object(HostObject::new(entries))
    }

    pub fn string(value: impl Into<String>) -> Self {
        HostValue::String(value.into())
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[HostValue]) -> Result<HostValue, HostError> + Send + Sync + 'static,
    {
        HostValue::Function(Arc::new(f))
    }

    pub fn getter<F>(f: F) -> Self
    where
        F: Fn() -> Result<HostValue, HostError> + Send + Sync + 'static,
    {
        HostValue::Getter(Arc::new(f))
    }

    /// A callable that accepts anything and returns `Null`.
    pub fn noop_function() -> Self {
        HostValue::function(|_| Ok(HostValue::Null))
    }

    /// Evaluate getters until a plain value is reached.
    pub fn resolve(&self) -> Result<HostValue, HostError> {
        let mut current = self.clone();
        while let HostValue::Getter(getter) = current {
            current = getter()?;
        }
        Ok(current)
    }

    /// Invoke a callable value. Non-callables fail with [`HostError::Call`].
    pub fn call(&self, args: &[HostValue]) -> Result<HostValue, HostError> {
        match self.resolve()? {
            HostValue::Function(f) => f(args),
            other => Err(HostError::Call(format!("{} is not callable", other.kind()))),
        }
    }

    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            HostValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, HostValue::Function(_))
    }

    /// Short name of the variant, used in log and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Number(_) => "number",
            HostValue::String(_) => "string",
            HostValue::Array(_) => "array",
            HostValue::Object(_) => "object",
            HostValue::Function(_) => "function",
            HostValue::Getter(_) => "getter",
        }
    }

    /// Build a value tree from JSON.
    ///
    /// The string `"[Function]"` becomes a no-op callable, so JSON manifests can declare
    /// capabilities such as `safeParse` or a `shape` accessor.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => HostValue::Null,
            serde_json::Value::Bool(b) => HostValue::Bool(b),
            serde_json::Value::Number(n) => HostValue::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) if s == "[Function]" => HostValue::noop_function(),
            serde_json::Value::String(s) => HostValue::String(s),
            serde_json::Value::Array(items) => {
                HostValue::Array(items.into_iter().map(HostValue::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                HostValue::object(map.into_iter().map(|(k, v)| (k, HostValue::from_json(v))))
            }
        }
    }
}

impl From<serde_json::Value> for HostValue {
    fn from(value: serde_json::Value) -> Self {
        HostValue::from_json(value)
    }
}

impl From<HostObject> for HostValue {
    fn from(obj: HostObject) -> Self {
        HostValue::Object(obj)
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => write!(f, "null"),
            HostValue::Bool(b) => write!(f, "{}", b),
            HostValue::Number(n) => write!(f, "{}", n),
            HostValue::String(s) => write!(f, "{:?}", s),
            HostValue::Array(items) => f.debug_list().entries(items).finish(),
            HostValue::Object(obj) => obj.fmt(f),
            HostValue::Function(_) => write!(f, "[Function]"),
            HostValue::Getter(_) => write!(f, "[Getter]"),
        }
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_preserves_declaration_order() {
        let obj = HostObject::new([
            ("zeta", HostValue::Null),
            ("alpha", HostValue::Null),
            ("mid", HostValue::Null),
        ]);
        let keys: Vec<_> = obj.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_getter_is_evaluated_on_read() {
        let obj = HostObject::new([("lazy", HostValue::getter(|| Ok(HostValue::Bool(true))))]);
        assert!(obj.is_flag_set("lazy").unwrap());
    }

    #[test]
    fn test_failing_getter_reports_property_name() {
        let obj = HostObject::new([(
            "broken",
            HostValue::getter(|| Err(HostError::Call("boom".to_string()))),
        )]);
        let err = obj.get("broken").unwrap_err();
        assert_eq!(
            err,
            HostError::PropertyAccess {
                key: "broken".to_string(),
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_missing_property_is_none() {
        let obj = HostObject::new([("a", HostValue::Null)]);
        assert!(obj.get("b").unwrap().is_none());
    }

    #[test]
    fn test_call_non_function_fails() {
        let err = HostValue::string("x").call(&[]).unwrap_err();
        assert!(matches!(err, HostError::Call(_)));
    }

    #[test]
    fn test_from_json_maps_function_marker() {
        let value = HostValue::from_json(json!({ "safeParse": "[Function]", "name": "x" }));
        let obj = value.as_object().unwrap();
        assert!(obj.has_function("safeParse"));
        assert_eq!(obj.get_str("name").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_ptr_eq_is_identity() {
        let a = HostObject::new([("k", HostValue::Null)]);
        let b = a.clone();
        let c = HostObject::new([("k", HostValue::Null)]);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
    }
}
