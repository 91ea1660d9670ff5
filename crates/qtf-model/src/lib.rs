//! Inbound collaborators of the qualifier engine.
//!
//! The engine never parses or infers base types itself. It consumes:
//!
//! - **`BaseTypeOracle`**: the host language's type system, queried for
//!   shapes, supertypes, type arguments and base subtyping
//! - **`Program<Q>`**: the declarations and expression trees under check,
//!   with the qualifier annotations written at declaration sites
//!
//! `BaseTypeStore` and `ProgramBuilder` are the in-memory implementations used
//! by hosts that lower their own AST into this model, and by tests.

pub mod base;
pub mod builder;
pub mod program;
pub mod store;

pub use base::{
    BaseTypeData, BaseTypeId, BaseTypeOracle, ClassDecl, ClassId, PrimitiveKind, Shape,
    TypeParamDecl, TypeParamId, Variance,
};
pub use builder::ProgramBuilder;
pub use program::{
    ClassElement, Element, ElementId, ElementKind, ExecutableElement, Program, Tree, TreeId,
    TreeKind, TypeArgument, TypeParameterElement, TypeSyntax, TypeSyntaxId, VariableElement,
};
pub use store::BaseTypeStore;
