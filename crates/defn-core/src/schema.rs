//! Signatures and the reflection builder.
//!
//! A definition is declared through a [`Signature`]: an explicit list of
//! parameters, each either positional or keyword-only, optionally annotated.
//! [`reflect`] classifies every parameter and produces the definition's
//! [`Schema`]:
//!
//! - keyword-only parameters become **attributes**,
//! - positional parameters annotated with a definition type become **bases**,
//! - any other annotated positional parameter becomes a required **input**.
//!
//! Every base contributes its own attributes and inputs to the schema being
//! built ("inheritance"). Attribute inheritance is first-occurrence-wins: once
//! a name is present, later bases declaring the same name are skipped, so
//! sibling bases sharing an attribute name end up sharing one value. Input
//! inheritance records provenance and rejects conflicting types.

use std::collections::HashSet;
use std::hash::Hash;

use serde::Serialize;
use tracing::debug;

use crate::defn::DefnType;
use crate::dtype::DType;
use crate::error::DefnError;
use crate::value::Value;

// ============================================================================
// Signatures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Positional,
    KeywordOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Type(DType),
    /// A concrete definition type.
    Defn(DefnType),
}

impl From<DType> for Annotation {
    fn from(value: DType) -> Self {
        Annotation::Type(value)
    }
}

impl From<&DefnType> for Annotation {
    fn from(value: &DefnType) -> Self {
        Annotation::Defn(value.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub annotation: Option<Annotation>,
    /// `None` means no default was given.
    pub default: Option<Value>,
}

impl Param {
    pub fn positional(name: impl Into<String>, annotation: impl Into<Annotation>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Positional,
            annotation: Some(annotation.into()),
            default: None,
        }
    }

    pub fn keyword(
        name: impl Into<String>,
        annotation: Option<Annotation>,
        default: Option<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::KeywordOnly,
            annotation,
            default,
        }
    }
}

/// The declared shape of a definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub name: String,
    pub doc: Option<String>,
    pub params: Vec<Param>,
    /// Declared produced type; `Any` when absent.
    pub returns: Option<DType>,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            params: Vec::new(),
            returns: None,
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// A required input of the given type.
    pub fn input(self, name: impl Into<String>, dtype: DType) -> Self {
        self.param(Param::positional(name, dtype))
    }

    /// A parameter satisfied by evaluating another definition.
    pub fn base(self, name: impl Into<String>, defn: &DefnType) -> Self {
        self.param(Param::positional(name, defn))
    }

    /// A positional parameter without any annotation.
    pub fn untyped(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            kind: ParamKind::Positional,
            annotation: None,
            default: None,
        });
        self
    }

    /// An untyped attribute with a default.
    pub fn attr(self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.param(Param::keyword(name, None, Some(default.into())))
    }

    pub fn typed_attr(
        self,
        name: impl Into<String>,
        dtype: DType,
        default: impl Into<Value>,
    ) -> Self {
        self.param(Param::keyword(
            name,
            Some(Annotation::Type(dtype)),
            Some(default.into()),
        ))
    }

    /// A typed attribute that must be given a value on instantiation.
    pub fn required_attr(self, name: impl Into<String>, dtype: DType) -> Self {
        self.param(Param::keyword(name, Some(Annotation::Type(dtype)), None))
    }

    pub fn returns(mut self, dtype: DType) -> Self {
        self.returns = Some(dtype);
        self
    }
}

// ============================================================================
// Schema records
// ============================================================================

/// A required runtime argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefnInput {
    pub name: String,
    pub dtype: DType,
    pub inherited: bool,
    /// Definitions the input was inherited from; empty for direct inputs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<DefnType>,
}

impl DefnInput {
    pub fn direct(name: impl Into<String>, dtype: DType) -> Self {
        Self {
            name: name.into(),
            dtype,
            inherited: false,
            sources: Vec::new(),
        }
    }

    pub fn inherited(name: impl Into<String>, dtype: DType, sources: Vec<DefnType>) -> Self {
        Self {
            name: name.into(),
            dtype,
            inherited: true,
            sources,
        }
    }
}

/// A configurable, defaultable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefnAttribute {
    pub name: String,
    /// `None` when no default was declared.
    pub default: Option<Value>,
    pub inherited: bool,
    pub dtype: Option<DType>,
}

/// A parameter slot satisfied by another definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefnBase {
    pub name: String,
    pub defn: DefnType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub inputs: Vec<DefnInput>,
    pub attributes: Vec<DefnAttribute>,
    pub bases: Vec<DefnBase>,
    pub produces: DType,
}

impl Schema {
    pub fn inputs(&self, inherited: bool) -> impl Iterator<Item = &DefnInput> {
        self.inputs.iter().filter(move |i| inherited || !i.inherited)
    }

    pub fn input(&self, name: &str) -> Option<&DefnInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn attributes(&self, inherited: bool) -> impl Iterator<Item = &DefnAttribute> {
        self.attributes
            .iter()
            .filter(move |a| inherited || !a.inherited)
    }

    pub fn attribute(&self, name: &str) -> Option<&DefnAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn bases(&self) -> &[DefnBase] {
        &self.bases
    }

    pub fn base(&self, name: &str) -> Option<&DefnBase> {
        self.bases.iter().find(|b| b.name == name)
    }
}

// ============================================================================
// Reflection
// ============================================================================

/// Classify the parameters of `signature` and resolve inheritance from its
/// bases.
pub fn reflect(signature: &Signature) -> Result<Schema, DefnError> {
    debug!(defn = %signature.name, params = signature.params.len(), "reflecting signature");

    let mut seen: HashSet<&str> = HashSet::new();
    for param in &signature.params {
        if !seen.insert(param.name.as_str()) {
            return Err(DefnError::DuplicateParameter {
                defn: signature.name.clone(),
                param: param.name.clone(),
            });
        }
    }

    let mut attributes: Vec<DefnAttribute> = signature
        .params
        .iter()
        .filter(|p| p.kind == ParamKind::KeywordOnly)
        .map(define_attribute)
        .collect();

    let mut bases: Vec<DefnBase> = Vec::new();
    let mut inputs: Vec<DefnInput> = Vec::new();

    for param in signature
        .params
        .iter()
        .filter(|p| p.kind == ParamKind::Positional)
    {
        match &param.annotation {
            None => {
                return Err(DefnError::MissingTypeAnnotation {
                    param: param.name.clone(),
                })
            }
            Some(Annotation::Defn(defn)) => bases.push(DefnBase {
                name: param.name.clone(),
                defn: defn.clone(),
            }),
            Some(Annotation::Type(dtype @ DType::Defn(_))) => {
                return Err(DefnError::InvalidBaseReference {
                    param: param.name.clone(),
                    type_name: dtype.to_string(),
                })
            }
            Some(Annotation::Type(dtype)) => {
                inputs.push(DefnInput::direct(param.name.clone(), dtype.clone()))
            }
        }
    }

    // Bases are immutable once built, so no public path reaches a cycle here.
    // This only guards against a future constructor that allows one.
    check_acyclic(&bases)?;

    for base in &bases {
        inherit_attributes(&base.defn, &mut attributes);
        inherit_inputs(&signature.name, &base.defn, &mut inputs)?;
    }

    Ok(Schema {
        inputs,
        attributes,
        bases,
        produces: signature.returns.clone().unwrap_or(DType::Any),
    })
}

fn define_attribute(param: &Param) -> DefnAttribute {
    let dtype = match &param.annotation {
        None => None,
        Some(Annotation::Type(dtype)) => Some(dtype.clone()),
        Some(Annotation::Defn(defn)) => Some(defn.signature()),
    };

    DefnAttribute {
        name: param.name.clone(),
        default: param.default.clone(),
        inherited: false,
        dtype,
    }
}

fn inherit_attributes(base: &DefnType, attributes: &mut Vec<DefnAttribute>) {
    for attrib in base.attributes(true) {
        // First occurrence wins: every definition in the tree sharing this
        // name will be handed the same value.
        if attributes.iter().any(|a| a.name == attrib.name) {
            debug!(attribute = %attrib.name, base = %base.name(), "attribute already defined, skipping");
            continue;
        }

        attributes.push(DefnAttribute {
            inherited: true,
            ..attrib.clone()
        });
    }
}

fn inherit_inputs(
    current: &str,
    base: &DefnType,
    inputs: &mut Vec<DefnInput>,
) -> Result<(), DefnError> {
    debug!(base = %base.name(), "inheriting inputs");

    for inpt in base.inputs(true) {
        let Some(existing) = inputs.iter_mut().find(|i| i.name == inpt.name) else {
            debug!(input = %inpt.name, "inherited input, new");
            inputs.push(DefnInput::inherited(
                inpt.name.clone(),
                inpt.dtype.clone(),
                provenance(base, inpt, &[]),
            ));
            continue;
        };

        if existing.dtype != inpt.dtype {
            let existing_sources = if existing.inherited {
                existing.sources.iter().map(|d| d.name().to_string()).collect()
            } else {
                vec![current.to_string()]
            };

            return Err(DefnError::InputTypeConflict {
                input: inpt.name.clone(),
                incoming_type: inpt.dtype.to_string(),
                incoming_source: base.name().to_string(),
                existing_type: existing.dtype.to_string(),
                existing_sources,
                existing_inherited: existing.inherited,
            });
        }

        if existing.inherited {
            let extra = provenance(base, inpt, &existing.sources);
            existing.sources.extend(extra);
            debug!(input = %inpt.name, "inherited input, updated");
            continue;
        }

        debug!(input = %inpt.name, "already defined");
    }

    Ok(())
}

/// `base` followed by the sources `base` itself recorded, minus anything
/// already in `known`.
fn provenance(base: &DefnType, inpt: &DefnInput, known: &[DefnType]) -> Vec<DefnType> {
    let mut out: Vec<DefnType> = Vec::new();
    for defn in std::iter::once(base).chain(inpt.sources.iter()) {
        if !known.contains(defn) && !out.contains(defn) {
            out.push(defn.clone());
        }
    }
    out
}

fn check_acyclic(bases: &[DefnBase]) -> Result<(), DefnError> {
    let roots: Vec<DefnType> = bases.iter().map(|b| b.defn.clone()).collect();
    let cycle = find_cycle(
        &roots,
        &|d: &DefnType| d.id(),
        &|d: &DefnType| d.bases().iter().map(|b| b.defn.clone()).collect(),
        &|d: &DefnType| d.name().to_string(),
    );

    match cycle {
        Some(path) => Err(DefnError::CyclicBaseReference { path }),
        None => Ok(()),
    }
}

/// Depth-first search for a cycle reachable from `roots`.
///
/// Returns the labels along the cycle, starting and ending at the repeated
/// node.
pub(crate) fn find_cycle<N, K>(
    roots: &[N],
    key: &dyn Fn(&N) -> K,
    children: &dyn Fn(&N) -> Vec<N>,
    label: &dyn Fn(&N) -> String,
) -> Option<Vec<String>>
where
    K: Eq + Hash + Copy,
{
    struct Walk<'a, N, K> {
        key: &'a dyn Fn(&N) -> K,
        children: &'a dyn Fn(&N) -> Vec<N>,
        label: &'a dyn Fn(&N) -> String,
        visiting: Vec<(K, String)>,
        done: HashSet<K>,
    }

    impl<N, K: Eq + Hash + Copy> Walk<'_, N, K> {
        fn visit(&mut self, node: &N) -> Option<Vec<String>> {
            let k = (self.key)(node);
            if let Some(pos) = self.visiting.iter().position(|(v, _)| *v == k) {
                let mut path: Vec<String> =
                    self.visiting[pos..].iter().map(|(_, l)| l.clone()).collect();
                path.push((self.label)(node));
                return Some(path);
            }
            if self.done.contains(&k) {
                return None;
            }

            self.visiting.push((k, (self.label)(node)));
            for child in (self.children)(node) {
                if let Some(path) = self.visit(&child) {
                    return Some(path);
                }
            }
            self.visiting.pop();
            self.done.insert(k);
            None
        }
    }

    let mut walk = Walk {
        key,
        children,
        label,
        visiting: Vec::new(),
        done: HashSet::new(),
    };

    roots.iter().find_map(|root| walk.visit(root))
}
