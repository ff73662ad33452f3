//! Operator pools.
//!
//! An operator pool maps `(operation, left type, right type)` to the
//! definition type implementing that combination. Operators are ordinary
//! definitions declaring exactly two typed attributes, `a` and `b`; dispatch
//! instantiates the matching type with the two operands.
//!
//! There is one process-wide pool ([`OperatorPool::global`]), created on
//! first use and living for the rest of the process. Isolated pools can be
//! created with [`OperatorPool::new`] and threaded through the definition
//! factory. Pools are written when operators are defined and read when
//! operators are dispatched; definitions are expected to be declared before
//! concurrent use begins.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::defn::{Defn, DefnType};
use crate::dtype::DType;
use crate::error::DefnError;
use crate::schema::Schema;
use crate::token::PoolId;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Add,
    And,
    Div,
    FloorDiv,
    LShift,
    MatMul,
    Mod,
    Mul,
    Or,
    Pow,
    RShift,
    Sub,
    Xor,
    Custom(String),
}

impl Operation {
    pub const BUILTIN: [Operation; 13] = [
        Operation::Add,
        Operation::And,
        Operation::Div,
        Operation::FloorDiv,
        Operation::LShift,
        Operation::MatMul,
        Operation::Mod,
        Operation::Mul,
        Operation::Or,
        Operation::Pow,
        Operation::RShift,
        Operation::Sub,
        Operation::Xor,
    ];

    pub fn custom(name: impl Into<String>) -> Self {
        Operation::Custom(name.into())
    }

    /// The operation identifier, e.g. `floor_division`.
    pub fn name(&self) -> &str {
        match self {
            Operation::Add => "addition",
            Operation::And => "and",
            Operation::Div => "division",
            Operation::FloorDiv => "floor_division",
            Operation::LShift => "left_shift",
            Operation::MatMul => "matrix_multiplication",
            Operation::Mod => "modulus",
            Operation::Mul => "multiplication",
            Operation::Or => "or",
            Operation::Pow => "power",
            Operation::RShift => "right_shift",
            Operation::Sub => "subtraction",
            Operation::Xor => "exclusive_or",
            Operation::Custom(name) => name,
        }
    }

    /// Human readable form, e.g. `Floor division`.
    pub fn phrase(&self) -> String {
        let spaced = self.name().replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OperatorKey {
    pub operation: Operation,
    pub left: DType,
    pub right: DType,
}

impl fmt::Display for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.operation, self.left, self.right)
    }
}

/// Check that a schema has the shape of an operator and compute its key.
pub(crate) fn operator_key(
    operation: &Operation,
    defn: &str,
    schema: &Schema,
) -> Result<OperatorKey, DefnError> {
    let malformed = |reason: String| DefnError::MalformedOperatorDefinition {
        defn: defn.to_string(),
        reason,
    };

    let (Some(a), Some(b)) = (schema.attribute("a"), schema.attribute("b")) else {
        return Err(malformed(
            "Operators must define 2 attributes 'a' and 'b'".to_string(),
        ));
    };

    let extra: Vec<String> = schema
        .attributes(true)
        .filter(|attr| attr.name != "a" && attr.name != "b")
        .map(|attr| format!("'{}'", attr.name))
        .collect();
    if !extra.is_empty() {
        return Err(malformed(format!(
            "Operators must define exactly 2 attributes 'a' and 'b', found extra attributes {}",
            extra.join(", ")
        )));
    }

    let Some(left) = &a.dtype else {
        return Err(malformed(
            "Operator input 'a' is missing a valid type annotation".to_string(),
        ));
    };
    let Some(right) = &b.dtype else {
        return Err(malformed(
            "Operator input 'b' is missing a valid type annotation".to_string(),
        ));
    };

    Ok(OperatorKey {
        operation: operation.clone(),
        left: left.operand_key(),
        right: right.operand_key(),
    })
}

static GLOBAL_POOL: OnceLock<OperatorPool> = OnceLock::new();

/// A shared handle to a set of registered operators.
#[derive(Clone)]
pub struct OperatorPool {
    id: PoolId,
    entries: Arc<RwLock<HashMap<OperatorKey, DefnType>>>,
}

impl OperatorPool {
    /// A fresh, isolated pool.
    pub fn new() -> Self {
        Self {
            id: PoolId::new(),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The process-wide default pool.
    pub fn global() -> OperatorPool {
        GLOBAL_POOL.get_or_init(OperatorPool::new).clone()
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Register an already built definition as the implementation of
    /// `operation` between the types of its `a` and `b` attributes.
    pub fn register(
        &self,
        operation: Operation,
        defn: &DefnType,
    ) -> Result<OperatorKey, DefnError> {
        let key = operator_key(&operation, defn.name(), defn.schema())?;
        self.insert(key.clone(), defn)?;
        Ok(key)
    }

    pub(crate) fn insert(&self, key: OperatorKey, defn: &DefnType) -> Result<(), DefnError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(DefnError::DuplicateOperatorRegistration {
                operation: key.operation.name().to_string(),
                left: key.left.to_string(),
                right: key.right.to_string(),
            });
        }

        debug!(pool = self.id.raw(), key = %key, defn = %defn.name(), "registered operator");
        entries.insert(key, defn.clone());
        Ok(())
    }

    pub fn lookup(&self, key: &OperatorKey) -> Option<DefnType> {
        self.entries.read().get(key).cloned()
    }

    /// Find the operator for `a <operation> b` and instantiate it with the
    /// operands.
    pub fn resolve(
        &self,
        operation: Operation,
        a: impl Into<Value>,
        b: impl Into<Value>,
    ) -> Result<Defn, DefnError> {
        let (a, b) = (a.into(), b.into());
        let key = OperatorKey {
            operation,
            left: a.type_key(),
            right: b.type_key(),
        };

        let Some(defn) = self.lookup(&key) else {
            return Err(DefnError::UnsupportedOperator {
                phrase: key.operation.phrase(),
                left: a.type_name(),
                right: b.type_name(),
            });
        };

        debug!(key = %key, defn = %defn.name(), "dispatching operator");
        defn.instance([("a", a), ("b", b)])
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<OperatorKey> {
        let mut keys: Vec<OperatorKey> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

macro_rules! named_operations {
    ($($method:ident => $op:expr),* $(,)?) => {
        impl OperatorPool {
            $(
                #[doc = concat!("`resolve` for `", stringify!($op), "`.")]
                pub fn $method(
                    &self,
                    a: impl Into<Value>,
                    b: impl Into<Value>,
                ) -> Result<Defn, DefnError> {
                    self.resolve($op, a, b)
                }
            )*
        }
    };
}

named_operations! {
    add => Operation::Add,
    subtract => Operation::Sub,
    multiply => Operation::Mul,
    divide => Operation::Div,
    floor_divide => Operation::FloorDiv,
    modulus => Operation::Mod,
    power => Operation::Pow,
    matmul => Operation::MatMul,
    and => Operation::And,
    or => Operation::Or,
    xor => Operation::Xor,
    left_shift => Operation::LShift,
    right_shift => Operation::RShift,
}

impl Default for OperatorPool {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for OperatorPool {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for OperatorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorPool")
            .field("id", &self.id.raw())
            .field("operators", &self.len())
            .finish()
    }
}
