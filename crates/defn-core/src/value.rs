//! Dynamic values passed into and returned from definitions.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::defn::Defn;
use crate::dtype::DType;

/// Keyword arguments for evaluating a definition.
pub type Kwargs = BTreeMap<String, Value>;

/// Build a [`Kwargs`] map from name/value pairs.
pub fn kwargs<K, V, I>(pairs: I) -> Kwargs
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A Rust type that can travel through definitions as an opaque object.
pub trait ObjectType: Any + Send + Sync + fmt::Debug {
    /// The name the type is known by in type tags and error messages.
    const TYPE_NAME: &'static str;

    fn dtype() -> DType {
        DType::named(Self::TYPE_NAME)
    }
}

/// An opaque payload, typically an array or image produced by a definition.
#[derive(Clone)]
pub struct Object {
    type_name: Arc<str>,
    data: Arc<dyn Any + Send + Sync>,
}

impl Object {
    pub fn new<T: ObjectType>(value: T) -> Self {
        Self {
            type_name: Arc::from(T::TYPE_NAME),
            data: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: ObjectType>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object<{}>", self.type_name)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.data), Arc::as_ptr(&other.data))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Defn(Defn),
    Object(Object),
}

impl Value {
    pub fn object<T: ObjectType>(value: T) -> Self {
        Value::Object(Object::new(value))
    }

    /// The runtime type key of this value.
    ///
    /// A definition instance is keyed by what it produces, everything else by
    /// its own tag.
    pub fn type_key(&self) -> DType {
        match self {
            Value::None => DType::None,
            Value::Bool(_) => DType::Bool,
            Value::Int(_) => DType::Int,
            Value::Float(_) => DType::Float,
            Value::Str(_) => DType::Str,
            Value::Defn(defn) => defn.produces().clone(),
            Value::Object(obj) => DType::named(obj.type_name()),
        }
    }

    /// Human readable type name, as used in operator errors.
    pub fn type_name(&self) -> String {
        match self {
            Value::Defn(defn) => defn.signature().to_string(),
            other => other.type_key().to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_defn(&self) -> Option<&Defn> {
        match self {
            Value::Defn(d) => Some(d),
            _ => None,
        }
    }

    pub fn downcast_ref<T: ObjectType>(&self) -> Option<&T> {
        match self {
            Value::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Defn(d) => write!(f, "{}()", d.name()),
            Value::Object(o) => write!(f, "<{}>", o.type_name()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Defn(d) => d.serialize(serializer),
            Value::Object(o) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("object", o.type_name())?;
                map.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Defn> for Value {
    fn from(v: Defn) -> Self {
        Value::Defn(v)
    }
}

impl From<&Defn> for Value {
    fn from(v: &Defn) -> Self {
        Value::Defn(v.clone())
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Blob(u8);

    impl ObjectType for Blob {
        const TYPE_NAME: &'static str = "Blob";
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Value::object(Blob(1));
        let b = Value::object(Blob(1));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.type_key(), DType::named("Blob"));
        assert_eq!(a.downcast_ref::<Blob>().map(|b| b.0), Some(1));
    }

    #[test]
    fn kwargs_converts_values() {
        let kw = kwargs([("width", 4), ("height", 3)]);
        assert_eq!(kw.get("width"), Some(&Value::Int(4)));
        assert_eq!(kw.len(), 2);
    }

    #[test]
    fn scalar_type_keys() {
        assert_eq!(Value::from(2).type_key(), DType::Int);
        assert_eq!(Value::from("a").type_name(), "str");
        assert_eq!(Value::None.type_name(), "NoneType");
    }
}
