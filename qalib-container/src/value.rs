//! Type-erased values passed to and read from components.
//!
//! A [`Value`] is either plain data (anything serde can represent) or a
//! shared component instance. [`Params`] maps parameter names to values
//! and is what callers hand to `get`/`make`/`build`.

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{QalibError, Result};

/// A shared, type-erased component instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Reserved parameter key selecting the variant in `get`/`make`.
pub const VARIANT_PARAM: &str = "variant";

/// A parameter or field value.
#[derive(Clone)]
pub enum Value {
    /// Plain data, converted with serde.
    Data(serde_json::Value),
    /// A shared instance, passed through by identity.
    Instance {
        instance: Instance,
        type_name: &'static str,
    },
}

impl Value {
    /// The absent value.
    pub fn null() -> Self {
        Value::Data(serde_json::Value::Null)
    }

    /// Serializes `value` into a data value.
    pub fn data<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Value::Data)
            .map_err(|err| QalibError::construction(type_name::<T>(), err))
    }

    /// Wraps a shared instance.
    pub fn instance<T: Any + Send + Sync>(instance: Arc<T>) -> Self {
        Value::Instance {
            instance,
            type_name: type_name::<T>(),
        }
    }

    /// Wraps an optional shared instance; `None` becomes [`Value::null`].
    pub fn optional_instance<T: Any + Send + Sync>(instance: Option<Arc<T>>) -> Self {
        instance.map_or_else(Value::null, Value::instance)
    }

    /// Wraps an already type-erased instance.
    pub fn erased(instance: Instance, type_name: &'static str) -> Self {
        Value::Instance { instance, type_name }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Data(serde_json::Value::Null))
    }

    /// Returns the string content of a data value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Data(data) => data.as_str(),
            Value::Instance { .. } => None,
        }
    }

    /// Returns the type name of what this value holds.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Data(_) => "data",
            Value::Instance { type_name, .. } => type_name,
        }
    }

    /// Deserializes a data value into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> std::result::Result<T, String> {
        match self {
            Value::Data(data) => serde_json::from_value(data.clone()).map_err(|err| err.to_string()),
            Value::Instance { type_name: found, .. } => Err(format!(
                "expected data for {}, got instance of {found}",
                type_name::<T>()
            )),
        }
    }

    /// Downcasts an instance value to `Arc<T>`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> std::result::Result<Arc<T>, String> {
        match self {
            Value::Instance { instance, type_name: found } => instance
                .clone()
                .downcast::<T>()
                .map_err(|_| format!("expected instance of {}, got {found}", type_name::<T>())),
            Value::Data(data) => Err(format!(
                "expected instance of {}, got data {data}",
                type_name::<T>()
            )),
        }
    }

    /// Like [`Value::downcast`], with the absent value mapped to `None`.
    pub fn downcast_optional<T: Any + Send + Sync>(
        &self,
    ) -> std::result::Result<Option<Arc<T>>, String> {
        if self.is_null() {
            return Ok(None);
        }
        self.downcast().map(Some)
    }

    /// Canonical data form used for stable hashing.
    ///
    /// Instances are represented by type name and address, so two maps
    /// only hash alike when they hold the very same instances. An address
    /// is only unique while its instance lives; see [`Params::instances`].
    pub(crate) fn canonical(&self) -> serde_json::Value {
        match self {
            Value::Data(data) => data.clone(),
            Value::Instance { instance, type_name } => serde_json::json!({
                "$instance": type_name,
                "$address": Arc::as_ptr(instance) as *const () as usize,
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Instance { instance: a, .. }, Value::Instance { instance: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(data) => write!(f, "Data({data})"),
            Value::Instance { type_name, .. } => write!(f, "Instance({type_name})"),
        }
    }
}

macro_rules! impl_from_data {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Data(serde_json::Value::from(value))
                }
            }
        )*
    };
}

impl_from_data!(&str, String, bool, i32, i64, u32, u64, f64);

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Data(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Value::null, Into::into)
    }
}

/// Named values, ordered by name.
///
/// The ordering makes iteration, equality and hashing independent of the
/// order in which entries were inserted.
#[derive(Clone, Default, PartialEq)]
pub struct Params {
    values: BTreeMap<String, Value>,
}

/// A snapshot of a component's fields, by name.
pub type FieldMap = Params;

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Overwrites entries with those of `other`; `other` wins on collision.
    pub fn merge(&mut self, other: Params) {
        self.values.extend(other.values);
    }

    /// Removes the reserved `variant` key and returns it.
    ///
    /// # Errors
    /// [`QalibError::InvalidSetting`] if the key holds anything but a string.
    pub fn take_variant(&mut self) -> Result<Option<String>> {
        match self.values.remove(VARIANT_PARAM) {
            None => Ok(None),
            Some(value) => match value.as_str() {
                Some(variant) => Ok(Some(variant.to_string())),
                None => Err(QalibError::InvalidSetting {
                    key: VARIANT_PARAM.to_string(),
                    value: format!("{value:?}"),
                    expected: "a variant name string",
                }),
            },
        }
    }

    /// The shared instances held by this map.
    pub(crate) fn instances(&self) -> Vec<Instance> {
        self.values
            .values()
            .filter_map(|value| match value {
                Value::Instance { instance, .. } => Some(instance.clone()),
                Value::Data(_) => None,
            })
            .collect()
    }

    /// Canonical serialization; identical for structurally equal maps.
    pub(crate) fn canonical_bytes(&self) -> Vec<u8> {
        let canonical: BTreeMap<&str, serde_json::Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.as_str(), v.canonical()))
            .collect();
        // BTreeMap and serde_json::Map (without `preserve_order`) both
        // serialize keys sorted, at every nesting level.
        serde_json::to_vec(&canonical).unwrap_or_default()
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.values.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Builds a [`Params`] map.
///
/// ```
/// use qalib_container::params;
///
/// let params = params! { "text" => "Save", "disabled" => true };
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => { $crate::value::Params::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::value::Params::new();
        $( params.insert($name, $value); )+
        params
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Icon;

    #[test]
    fn data_round_trips_through_serde() {
        let value = Value::data(&vec![1, 2, 3]).unwrap();
        assert_eq!(value.deserialize::<Vec<u8>>().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn instance_downcasts_by_identity() {
        let icon = Arc::new(Icon);
        let value = Value::instance(icon.clone());
        let back = value.downcast::<Icon>().unwrap();
        assert!(Arc::ptr_eq(&icon, &back));
        assert!(value.downcast::<String>().is_err());
        assert!(value.deserialize::<String>().is_err());
    }

    #[test]
    fn null_is_absent_instance() {
        assert!(Value::null().downcast_optional::<Icon>().unwrap().is_none());
        assert_eq!(Value::null().deserialize::<Option<String>>().unwrap(), None);
    }

    #[test]
    fn take_variant_removes_reserved_key() {
        let mut params = crate::params! { "variant" => "danger", "text" => "Delete" };
        assert_eq!(params.take_variant().unwrap().as_deref(), Some("danger"));
        assert!(!params.contains("variant"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn non_string_variant_rejected() {
        let mut params = crate::params! { "variant" => 3 };
        assert!(params.take_variant().is_err());
    }

    #[test]
    fn merge_overwrites() {
        let mut base = crate::params! { "text" => "Submit", "style" => "primary" };
        base.merge(crate::params! { "text" => "Save" });
        assert_eq!(base.get("text").and_then(Value::as_str), Some("Save"));
        assert_eq!(base.get("style").and_then(Value::as_str), Some("primary"));
    }

    #[test]
    fn instances_skips_data() {
        let icon = Arc::new(Icon);
        let params = crate::params! { "icon" => Value::instance(icon.clone()), "text" => "Save" };
        let held = params.instances();
        assert_eq!(held.len(), 1);
        assert_eq!(Arc::as_ptr(&held[0]) as *const (), Arc::as_ptr(&icon) as *const ());
    }

    #[test]
    fn canonical_bytes_ignore_insertion_order() {
        let a = crate::params! { "a" => 1, "b" => serde_json::json!({"x": 1, "y": 2}) };
        let mut b = Params::new();
        b.insert("b", serde_json::json!({"y": 2, "x": 1}));
        b.insert("a", 1);
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }
}
