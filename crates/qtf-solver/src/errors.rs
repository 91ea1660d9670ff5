//! Error taxonomy of the qualifier engine.
//!
//! Everything except [`QualError::Inference`] describes a broken checker
//! definition or a caller bug and must abort the checking session.
//! Inference failures are findings about one call site of the checked
//! program; sessions turn them into diagnostics and keep going.

use qtf_common::SourceLocation;
use qtf_model::{ElementId, TreeId, TypeSyntaxId};
use thiserror::Error;

/// Invalid or incomplete qualifier lattice.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LatticeError {
    #[error("qualifier lattice declares no qualifiers")]
    Empty,
    #[error("qualifier {0} is declared more than once")]
    DuplicateQualifier(String),
    #[error("qualifier {0} is not part of the lattice")]
    UnknownQualifier(String),
    #[error("qualifiers {0} and {1} are declared subtypes of each other")]
    Cycle(String, String),
    #[error("conflicting top qualifiers {0} and {1}")]
    ConflictingTop(String, String),
    #[error("conflicting bottom qualifiers {0} and {1}")]
    ConflictingBottom(String, String),
    #[error("lattice has no unique top: {}", .0.join(", "))]
    MultipleTops(Vec<String>),
    #[error("lattice has no unique bottom: {}", .0.join(", "))]
    MultipleBottoms(Vec<String>),
    #[error("{top} is declared top but {other} is not below it")]
    NotTop { top: String, other: String },
    #[error("{bottom} is declared bottom but {other} is not above it")]
    NotBottom { bottom: String, other: String },
    #[error("no least upper bound for {0} and {1}")]
    NoLeastUpperBound(String, String),
    #[error("no greatest lower bound for {0} and {1}")]
    NoGreatestLowerBound(String, String),
}

/// Call-site inference found no consistent qualifier for a type parameter.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error(
        "cannot infer a qualifier for type parameter {param}: {} have no least upper bound",
        .qualifiers.join(", ")
    )]
    NoLeastUpperBound {
        param: String,
        qualifiers: Vec<String>,
    },
    #[error("inferred qualifier {inferred} for type parameter {param} is not below its bound {bound}")]
    BoundViolation {
        param: String,
        inferred: String,
        bound: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum QualError {
    #[error(transparent)]
    Lattice(#[from] LatticeError),

    #[error("shape mismatch in {context}: {left} vs {right}")]
    ShapeMismatch {
        context: &'static str,
        left: String,
        right: String,
    },

    #[error("postDirectSupertypes for {subtype} broke the supertype list: {detail}")]
    SupertypeArity { subtype: String, detail: String },

    #[error("typeVariablesFromUse for {ty} returned {found} variables, expected {expected}")]
    TypeVariableArity {
        ty: String,
        expected: usize,
        found: usize,
    },

    #[error("{hook} changed the shape of {expected} to {found}")]
    HookShape {
        hook: &'static str,
        expected: String,
        found: String,
    },

    #[error("{location}: {source}")]
    Inference {
        location: SourceLocation,
        #[source]
        source: InferenceError,
    },

    #[error("unknown element {0:?}")]
    UnknownElement(ElementId),

    #[error("unknown tree {0:?}")]
    UnknownTree(TreeId),

    #[error("unknown type syntax {0:?}")]
    UnknownTypeSyntax(TypeSyntaxId),

    #[error("{what} is not a {expected}")]
    NotA { what: String, expected: &'static str },

    #[error("invalid engine options: {0}")]
    InvalidOptions(String),
}

impl QualError {
    /// Whether the error must terminate the checking session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, QualError::Inference { .. })
    }
}
