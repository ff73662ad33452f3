//! Defn: composable, introspectable definitions
//!
//! A *definition* is a typed unit of computation declared from a plain Rust
//! closure and an explicit [`Signature`]. Each parameter of the signature is
//! one of:
//!
//! 1. **Attribute**: keyword-only, defaultable, fixed when the definition is
//!    instantiated.
//! 2. **Input**: a positional, typed value supplied when the instance is
//!    evaluated.
//! 3. **Base**: a positional parameter annotated with another definition
//!    type, satisfied by evaluating that definition first.
//!
//! Bases contribute their own attributes and inputs to the definition built
//! on top of them, so a tree of definitions is configured and called through
//! its root. Definitions may also be registered as operators in an
//! [`OperatorPool`], which lets instances be combined with `+`, `*`, etc.
//!
//! ## Module Organization
//!
//! - `schema`: signatures, schema records and the reflection builder
//! - `defn`: the definition factory, definition types and instances
//! - `eval`: the evaluator (optionally memoising base results)
//! - `operator`: operator pools and dispatch
//! - `catalog`: named collections of definition types
//! - `digest`: stable schema fingerprints

pub mod catalog;
pub mod config;
pub mod defn;
pub mod digest;
pub mod dtype;
pub mod error;
pub mod eval;
pub mod operator;
pub mod schema;
pub mod token;
pub mod value;

pub use catalog::Catalog;
pub use config::EvalConfig;
pub use defn::{definition, Args, Body, CallArgs, Defn, DefnFactory, DefnType};
pub use dtype::DType;
pub use error::DefnError;
pub use eval::{EvalStats, Evaluator};
pub use operator::{Operation, OperatorKey, OperatorPool};
pub use schema::{
    reflect, Annotation, DefnAttribute, DefnBase, DefnInput, Param, ParamKind, Schema, Signature,
};
pub use token::{DefnId, PoolId};
pub use value::{kwargs, Kwargs, Object, ObjectType, Value};

pub type Result<T> = std::result::Result<T, DefnError>;
