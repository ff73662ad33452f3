//! Definition types, instances and the definition factory.
//!
//! A [`DefnType`] is what the factory builds from a [`Signature`] and a body:
//! the analogue of a class. Instantiating it with attribute values gives a
//! [`Defn`], which can then be evaluated any number of times with different
//! inputs.
//!
//! ```text
//!   Signature ──reflect──► Schema ──factory──► DefnType ──instance──► Defn ──call──► Value
//!                                                 │
//!                                                 └─(operation)──► OperatorPool
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::digest::schema_digest;
use crate::dtype::DType;
use crate::error::DefnError;
use crate::eval::Evaluator;
use crate::operator::{operator_key, Operation, OperatorKey, OperatorPool};
use crate::schema::{reflect, DefnAttribute, DefnBase, DefnInput, Schema, Signature};
use crate::token::DefnId;
use crate::value::{Kwargs, ObjectType, Value};

/// The terminal computation of a definition.
pub type Body = Arc<dyn Fn(&Args) -> Result<Value, DefnError> + Send + Sync>;

// ============================================================================
// Factory
// ============================================================================

/// Build a definition type from `signature` and `body`, using the global
/// operator pool and no operator registration.
pub fn definition<F, R>(signature: Signature, body: F) -> Result<DefnType, DefnError>
where
    F: Fn(&Args) -> Result<R, DefnError> + Send + Sync + 'static,
    R: Into<Value>,
{
    DefnFactory::new().define(signature, body)
}

/// Configured form of [`definition`].
///
/// `DefnFactory::new().define(sig, body)` and `definition(sig, body)` build
/// identical types.
#[derive(Debug, Clone, Default)]
pub struct DefnFactory {
    operation: Option<Operation>,
    operator_pool: Option<OperatorPool>,
}

impl DefnFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the built type as the implementation of `operation`.
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Use `pool` instead of the global operator pool.
    pub fn operator_pool(mut self, pool: &OperatorPool) -> Self {
        self.operator_pool = Some(pool.clone());
        self
    }

    pub fn define<F, R>(&self, signature: Signature, body: F) -> Result<DefnType, DefnError>
    where
        F: Fn(&Args) -> Result<R, DefnError> + Send + Sync + 'static,
        R: Into<Value>,
    {
        let body: Body = Arc::new(move |args: &Args| body(args).map(Into::into));
        self.define_boxed(signature, body)
    }

    pub fn define_boxed(&self, signature: Signature, body: Body) -> Result<DefnType, DefnError> {
        let pool = self
            .operator_pool
            .clone()
            .unwrap_or_else(OperatorPool::global);

        let schema = reflect(&signature)?;
        let operator = match &self.operation {
            Some(operation) => Some(operator_key(operation, &signature.name, &schema)?),
            None => None,
        };
        let digest = schema_digest(&schema);

        let defn = DefnType(Arc::new(DefnTypeInner {
            id: DefnId::new(),
            name: signature.name,
            doc: signature.doc,
            schema,
            digest,
            body,
            pool: pool.clone(),
            operator: operator.clone(),
        }));

        if let Some(key) = operator {
            pool.insert(key, &defn)?;
        }

        debug!(
            defn = %defn.name(),
            id = %defn.id(),
            inputs = defn.schema().inputs.len(),
            attributes = defn.schema().attributes.len(),
            bases = defn.schema().bases.len(),
            "built definition"
        );
        Ok(defn)
    }
}

// ============================================================================
// Definition types
// ============================================================================

struct DefnTypeInner {
    id: DefnId,
    name: String,
    doc: Option<String>,
    schema: Schema,
    digest: String,
    body: Body,
    pool: OperatorPool,
    operator: Option<OperatorKey>,
}

/// A built definition type. Cloning is cheap; equality is identity.
#[derive(Clone)]
pub struct DefnType(Arc<DefnTypeInner>);

impl DefnType {
    pub fn id(&self) -> DefnId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.0.doc.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.0.schema
    }

    /// Stable fingerprint of the schema, see [`crate::digest`].
    pub fn digest(&self) -> &str {
        &self.0.digest
    }

    /// Inputs needed to evaluate this definition; `inherited = false` keeps
    /// only the directly declared ones.
    pub fn inputs(&self, inherited: bool) -> impl Iterator<Item = &DefnInput> {
        self.0.schema.inputs(inherited)
    }

    pub fn input(&self, name: &str) -> Option<&DefnInput> {
        self.0.schema.input(name)
    }

    pub fn attributes(&self, inherited: bool) -> impl Iterator<Item = &DefnAttribute> {
        self.0.schema.attributes(inherited)
    }

    pub fn attribute(&self, name: &str) -> Option<&DefnAttribute> {
        self.0.schema.attribute(name)
    }

    pub fn bases(&self) -> &[DefnBase] {
        self.0.schema.bases()
    }

    pub fn produces(&self) -> &DType {
        &self.0.schema.produces
    }

    /// `Defn[<produced type>]`.
    pub fn signature(&self) -> DType {
        DType::defn(self.produces().clone())
    }

    /// The key this type was registered under, if it is an operator.
    pub fn operator_key(&self) -> Option<&OperatorKey> {
        self.0.operator.as_ref()
    }

    /// The pool used when instances of this type take part in operators.
    pub fn pool(&self) -> &OperatorPool {
        &self.0.pool
    }

    pub(crate) fn body(&self) -> &Body {
        &self.0.body
    }

    /// Create an instance from attribute values; unspecified attributes take
    /// their defaults.
    pub fn instance<K, V, I>(&self, values: I) -> Result<Defn, DefnError>
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut given: Vec<(String, Value)> = Vec::new();
        for (name, value) in values {
            let name = name.into();
            if self.attribute(&name).is_none() {
                return Err(DefnError::UnknownAttribute {
                    defn: self.name().to_string(),
                    attribute: name,
                });
            }
            given.retain(|(n, _)| *n != name);
            given.push((name, value.into()));
        }

        let mut values = Vec::with_capacity(self.schema().attributes.len());
        for attr in self.attributes(true) {
            let value = match given.iter().position(|(n, _)| *n == attr.name) {
                Some(pos) => given.swap_remove(pos).1,
                None => attr.default.clone().ok_or_else(|| DefnError::MissingAttribute {
                    defn: self.name().to_string(),
                    attribute: attr.name.clone(),
                })?,
            };

            if let Some(dtype) = &attr.dtype {
                if !dtype.accepts(&value) {
                    return Err(DefnError::AttributeTypeMismatch {
                        defn: self.name().to_string(),
                        attribute: attr.name.clone(),
                        expected: dtype.to_string(),
                        found: value.type_name(),
                    });
                }
            }

            values.push((attr.name.clone(), value));
        }

        Ok(Defn {
            ty: self.clone(),
            values,
        })
    }

    /// An instance with every attribute at its default.
    pub fn default_instance(&self) -> Result<Defn, DefnError> {
        self.instance(std::iter::empty::<(String, Value)>())
    }
}

impl PartialEq for DefnType {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for DefnType {}

impl Hash for DefnType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for DefnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.0.name, self.0.id)
    }
}

impl fmt::Display for DefnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

impl Serialize for DefnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

// ============================================================================
// Instances
// ============================================================================

/// An instance of a definition type with concrete attribute values.
#[derive(Debug, Clone, PartialEq)]
pub struct Defn {
    ty: DefnType,
    values: Vec<(String, Value)>,
}

impl Defn {
    pub fn defn_type(&self) -> &DefnType {
        &self.ty
    }

    pub fn name(&self) -> &str {
        self.ty.name()
    }

    pub fn produces(&self) -> &DType {
        self.ty.produces()
    }

    pub fn signature(&self) -> DType {
        self.ty.signature()
    }

    pub fn inputs(&self, inherited: bool) -> impl Iterator<Item = &DefnInput> {
        self.ty.inputs(inherited)
    }

    pub fn attributes(&self, inherited: bool) -> impl Iterator<Item = &DefnAttribute> {
        self.ty.attributes(inherited)
    }

    pub fn bases(&self) -> &[DefnBase] {
        self.ty.bases()
    }

    /// Attribute values, by default only those directly declared on the type.
    pub fn values(&self, inherited: bool) -> BTreeMap<String, Value> {
        self.ty
            .attributes(inherited)
            .filter_map(|attr| {
                self.value(&attr.name)
                    .map(|value| (attr.name.clone(), value.clone()))
            })
            .collect()
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Evaluate with keyword inputs.
    pub fn call(&self, kwargs: &Kwargs) -> Result<Value, DefnError> {
        Evaluator::default().evaluate(self, kwargs)
    }

    /// Evaluate with a general argument list. Positional arguments are
    /// always rejected.
    pub fn invoke(&self, args: &CallArgs) -> Result<Value, DefnError> {
        Evaluator::default().invoke(self, args)
    }

    /// `self <operation> other`, dispatched through this type's pool.
    pub fn apply(&self, operation: Operation, other: impl Into<Value>) -> Result<Defn, DefnError> {
        self.ty
            .pool()
            .resolve(operation, Value::Defn(self.clone()), other)
    }

    /// `other <operation> self`.
    pub fn apply_reflected(
        &self,
        operation: Operation,
        other: impl Into<Value>,
    ) -> Result<Defn, DefnError> {
        self.ty
            .pool()
            .resolve(operation, other, Value::Defn(self.clone()))
    }
}

impl Serialize for Defn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("defn", self.name())?;
        map.serialize_entry("produces", self.produces())?;
        map.serialize_entry("values", &self.values(true))?;
        map.end()
    }
}

macro_rules! defn_operators {
    ($($trait:ident :: $method:ident => $op:expr),* $(,)?) => {
        $(
            impl std::ops::$trait<&Defn> for &Defn {
                type Output = Result<Defn, DefnError>;

                fn $method(self, rhs: &Defn) -> Self::Output {
                    self.apply($op, rhs)
                }
            }

            impl std::ops::$trait<Defn> for Defn {
                type Output = Result<Defn, DefnError>;

                fn $method(self, rhs: Defn) -> Self::Output {
                    self.apply($op, rhs)
                }
            }

            impl std::ops::$trait<Value> for &Defn {
                type Output = Result<Defn, DefnError>;

                fn $method(self, rhs: Value) -> Self::Output {
                    self.apply($op, rhs)
                }
            }

            impl std::ops::$trait<&Defn> for Value {
                type Output = Result<Defn, DefnError>;

                fn $method(self, rhs: &Defn) -> Self::Output {
                    rhs.apply_reflected($op, self)
                }
            }
        )*
    };
}

defn_operators! {
    Add::add => Operation::Add,
    BitAnd::bitand => Operation::And,
    Div::div => Operation::Div,
    Shl::shl => Operation::LShift,
    Rem::rem => Operation::Mod,
    Mul::mul => Operation::Mul,
    BitOr::bitor => Operation::Or,
    Shr::shr => Operation::RShift,
    Sub::sub => Operation::Sub,
    BitXor::bitxor => Operation::Xor,
}

// ============================================================================
// Arguments
// ============================================================================

/// Positional and keyword arguments for [`Defn::invoke`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keywords: Kwargs,
}

impl CallArgs {
    pub fn new(positional: Vec<Value>, keywords: Kwargs) -> Self {
        Self {
            positional,
            keywords,
        }
    }

    pub fn keywords(keywords: Kwargs) -> Self {
        Self {
            positional: Vec::new(),
            keywords,
        }
    }
}

/// The arguments a definition body is called with: its direct inputs, the
/// values of its bases and its direct attributes.
#[derive(Debug, Clone)]
pub struct Args {
    defn: String,
    values: BTreeMap<String, Value>,
}

impl Args {
    pub(crate) fn new(defn: &str, values: BTreeMap<String, Value>) -> Self {
        Self {
            defn: defn.to_string(),
            values,
        }
    }

    /// Name of the definition being evaluated.
    pub fn defn_name(&self) -> &str {
        &self.defn
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&Value, DefnError> {
        self.values
            .get(name)
            .ok_or_else(|| DefnError::MissingArgument {
                defn: self.defn.clone(),
                name: name.to_string(),
            })
    }

    pub fn int(&self, name: &str) -> Result<i64, DefnError> {
        let value = self.get(name)?;
        value.as_int().ok_or_else(|| self.mismatch(name, "int", value))
    }

    /// Floats; integers are widened.
    pub fn float(&self, name: &str) -> Result<f64, DefnError> {
        let value = self.get(name)?;
        value.as_float().ok_or_else(|| self.mismatch(name, "float", value))
    }

    pub fn bool(&self, name: &str) -> Result<bool, DefnError> {
        let value = self.get(name)?;
        value.as_bool().ok_or_else(|| self.mismatch(name, "bool", value))
    }

    pub fn str(&self, name: &str) -> Result<&str, DefnError> {
        let value = self.get(name)?;
        value.as_str().ok_or_else(|| self.mismatch(name, "str", value))
    }

    pub fn defn(&self, name: &str) -> Result<&Defn, DefnError> {
        let value = self.get(name)?;
        value.as_defn().ok_or_else(|| self.mismatch(name, "Defn[Any]", value))
    }

    pub fn object<T: ObjectType>(&self, name: &str) -> Result<&T, DefnError> {
        let value = self.get(name)?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| self.mismatch(name, T::TYPE_NAME, value))
    }

    /// A body failure attributed to this definition.
    pub fn fail(&self, message: impl Into<String>) -> DefnError {
        DefnError::body(self.defn.clone(), message)
    }

    fn mismatch(&self, name: &str, expected: &str, found: &Value) -> DefnError {
        DefnError::ArgumentType {
            defn: self.defn.clone(),
            name: name.to_string(),
            expected: expected.to_string(),
            found: found.type_name(),
        }
    }
}
