//! Qualifier Type Computation Engine
//!
//! Computes and compares *qualified types*: base types of the host language
//! with one checker-defined qualifier attached to every structural position.
//! It uses:
//!
//! - **Bitset closure**: the qualifier lattice is closed once at setup and
//!   answers subtype, join and meet queries by table lookup
//! - **Structural recursion**: qualified types are a sum type over shapes;
//!   subtyping, substitution and validation are exhaustive matches
//! - **Ena**: Union-Find over type parameters for call-site inference
//!
//! Checkers plug in through three seams: [`QualifierDefaults`] for
//! unannotated positions, [`CheckerHooks`] for propagation along
//! inheritance, member access, generic uses and calls, and [`TypeRefiner`]
//! for expression refinement. Every hook result is validated before use.
mod bounds;
mod call;
pub mod defaults;
pub mod errors;
mod expression;
pub mod factory;
pub mod hooks;
pub mod infer;
pub mod instantiate;
pub mod lattice;
mod members;
pub mod options;
pub mod refine;
mod supertypes;
pub mod type_hierarchy;
pub mod types;
pub mod variance;

pub use bounds::TypeArgumentViolation;
pub use defaults::{DefaultTable, QualifierDefaults, TypeUseLocation};
pub use errors::{InferenceError, LatticeError, QualError};
pub use factory::{DefaultQualifiedTypeFactory, QualifiedTypeFactory};
pub use hooks::{CheckerHooks, ExecutableUse, NoHooks};
pub use infer::{InferenceContext, InferenceVar};
pub use instantiate::QualifiedSubstitution;
pub use lattice::{LatticeBuilder, Qualifier, QualifierHierarchy};
pub use options::{EngineOptions, SupertypePolicy, UninferredPolicy, VariancePolicy};
pub use refine::{NoRefinement, TypeRefiner};
pub use type_hierarchy::{CallCompatibility, SubtypeEnv, TypeHierarchy};
pub use types::{
    QualifiedArrayType, QualifiedDeclaredType, QualifiedExecutableType, QualifiedLeafType,
    QualifiedType, QualifiedTypeParameterBounds, QualifiedTypeVariable,
};

#[cfg(test)]
pub(crate) mod test_support;
