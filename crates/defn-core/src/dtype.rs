//! Type tags.
//!
//! Definitions are declared and dispatched on a closed set of type tags rather
//! than on host-language types. The `Display` form of each tag is what error
//! messages and operator keys print.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "tag", content = "of", rename_all = "snake_case")]
pub enum DType {
    /// No declared type.
    Any,
    /// The type of `Value::None`.
    None,
    Bool,
    Int,
    Float,
    Str,
    /// A library-defined opaque type, e.g. `Mask`.
    Named(String),
    /// `Defn[T]`: any definition that produces `T`.
    Defn(Box<DType>),
}

impl DType {
    pub fn named(name: impl Into<String>) -> Self {
        DType::Named(name.into())
    }

    pub fn defn(produces: DType) -> Self {
        DType::Defn(Box::new(produces))
    }

    /// The tag used as an operand in operator keys: `Defn[T]` contributes `T`.
    pub fn operand_key(&self) -> DType {
        match self {
            DType::Defn(inner) => (**inner).clone(),
            other => other.clone(),
        }
    }

    /// Can a value of this shape be stored in a slot declared with this type?
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (DType::Any, _) | (_, Value::None) => true,
            (DType::Bool, Value::Bool(_))
            | (DType::Int, Value::Int(_))
            | (DType::Float, Value::Float(_))
            | (DType::Str, Value::Str(_)) => true,
            (DType::Named(name), Value::Object(obj)) => obj.type_name() == name,
            (DType::Defn(inner), Value::Defn(defn)) => {
                let produces = defn.produces();
                **inner == DType::Any || *produces == DType::Any || **inner == *produces
            }
            _ => false,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Any => f.write_str("Any"),
            DType::None => f.write_str("NoneType"),
            DType::Bool => f.write_str("bool"),
            DType::Int => f.write_str("int"),
            DType::Float => f.write_str("float"),
            DType::Str => f.write_str("str"),
            DType::Named(name) => f.write_str(name),
            DType::Defn(inner) => write!(f, "Defn[{inner}]"),
        }
    }
}
