//! Variance of type parameters for qualifier comparison.
//!
//! Type arguments of two declared types are compared according to the
//! variance of the corresponding type parameter:
//!
//! - **Covariant**: `Box<@A T> <: Box<@B T>` if `A <: B`
//! - **Contravariant**: `Sink<@A T> <: Sink<@B T>` if `B <: A`
//! - **Invariant**: both directions must hold
//! - **Bivariant**: the argument is not compared
//!
//! Parameters without a declared variance use the configured default,
//! invariant unless the checker opts out. Naive covariant recursion would
//! accept `List<@Tainted String>` where `List<@Untainted String>` is
//! expected through an alias.

use qtf_model::{BaseTypeOracle, ClassId, TypeParamId, Variance};
use smallvec::SmallVec;

/// Variance of one type parameter.
pub fn variance_of(oracle: &dyn BaseTypeOracle, param: TypeParamId, fallback: Variance) -> Variance {
    oracle
        .type_param(param)
        .and_then(|decl| decl.variance)
        .unwrap_or(fallback)
}

/// Variances of a class's type parameters, in declaration order.
pub fn class_variances(
    oracle: &dyn BaseTypeOracle,
    class: ClassId,
    fallback: Variance,
) -> SmallVec<[Variance; 2]> {
    oracle
        .class(class)
        .map(|decl| {
            decl.type_params
                .iter()
                .map(|&p| variance_of(oracle, p, fallback))
                .collect()
        })
        .unwrap_or_default()
}
