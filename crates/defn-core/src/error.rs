//! Errors raised while building, registering and evaluating definitions.
//!
//! Every error is reported at the point it is detected with a message that is
//! meant to be shown to the end user verbatim. Nothing in this crate catches
//! and re-wraps its own errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefnError {
    // ------------------------------------------------------------------------
    // Build time
    // ------------------------------------------------------------------------
    #[error("Missing type annotation for parameter '{param}'")]
    MissingTypeAnnotation { param: String },

    #[error("Invalid input '{param}', type '{type_name}' is not a definition")]
    InvalidBaseReference { param: String, type_name: String },

    #[error(
        "Input '{input}' ({incoming_type}) inherited from '{incoming_source}' conflicts with existing input '{input}' ({existing_type}) {}",
        provenance(.existing_inherited, .existing_sources)
    )]
    InputTypeConflict {
        input: String,
        incoming_type: String,
        incoming_source: String,
        existing_type: String,
        existing_sources: Vec<String>,
        existing_inherited: bool,
    },

    #[error("Parameter '{param}' is declared more than once on '{defn}'")]
    DuplicateParameter { defn: String, param: String },

    #[error("Cyclic base reference: {}", .path.join(" -> "))]
    CyclicBaseReference { path: Vec<String> },

    // ------------------------------------------------------------------------
    // Instantiation
    // ------------------------------------------------------------------------
    #[error("Definition '{defn}' is missing a value for attribute '{attribute}'")]
    MissingAttribute { defn: String, attribute: String },

    #[error("Definition '{defn}' has no attribute '{attribute}'")]
    UnknownAttribute { defn: String, attribute: String },

    #[error("Attribute '{attribute}' of '{defn}' expects {expected}, got {found}")]
    AttributeTypeMismatch {
        defn: String,
        attribute: String,
        expected: String,
        found: String,
    },

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------
    #[error("Definition inputs must be passed as keyword arguments")]
    PositionalArgsRejected,

    #[error(
        "Unable to evaluate definition '{defn}', missing inputs: {}",
        quoted(.missing, ", ")
    )]
    MissingRequiredInputs { defn: String, missing: Vec<String> },

    #[error("Definition '{defn}' was not given argument '{name}'")]
    MissingArgument { defn: String, name: String },

    #[error("Argument '{name}' of '{defn}' expects {expected}, got {found}")]
    ArgumentType {
        defn: String,
        name: String,
        expected: String,
        found: String,
    },

    #[error("Definition '{defn}' failed: {message}")]
    Body { defn: String, message: String },

    // ------------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------------
    #[error("{phrase} is not supported between {left} and {right}")]
    UnsupportedOperator {
        phrase: String,
        left: String,
        right: String,
    },

    #[error("A {operation} operator between {left} and {right} has already been defined")]
    DuplicateOperatorRegistration {
        operation: String,
        left: String,
        right: String,
    },

    #[error("Operator '{defn}' is malformed: {reason}")]
    MalformedOperatorDefinition { defn: String, reason: String },

    // ------------------------------------------------------------------------
    // Catalogs
    // ------------------------------------------------------------------------
    #[error("A definition named '{name}' is already registered in this catalog")]
    DuplicateDefinition { name: String },
}

impl DefnError {
    /// Failure reported by a definition body.
    pub fn body(defn: impl Into<String>, message: impl Into<String>) -> Self {
        DefnError::Body {
            defn: defn.into(),
            message: message.into(),
        }
    }
}

fn provenance(inherited: &bool, sources: &[String]) -> String {
    let verb = if *inherited { "inherited from" } else { "declared on" };
    format!("{verb} {}", quoted(sources, ","))
}

fn quoted(names: &[String], sep: &str) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(sep)
}
