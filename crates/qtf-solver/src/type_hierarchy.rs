//! Qualified subtyping.
//!
//! `TypeHierarchy` combines the qualifier lattice with base subtyping by
//! structural recursion over two qualified types:
//!
//! - **Declared**: the subtype is first viewed as an instance of the
//!   supertype's class (through the hooked supertypes), then the root
//!   qualifiers are compared and the type arguments according to variance
//! - **Array**: root qualifiers, then components (covariant by default)
//! - **Type variable**: a variable is below anything its upper bound is
//!   below, and above anything below its lower bound
//! - **Executable**: override compatibility (covariant return, parameters
//!   equivalent or contravariant, contravariant receiver)
//!
//! Comparing types of unrelated shape is a caller bug and reported as
//! `QualError::ShapeMismatch`. Unrelated base types of the same shape are
//! simply not subtypes.

use crate::errors::QualError;
use crate::lattice::{Qualifier, QualifierHierarchy};
use crate::options::EngineOptions;
use crate::types::{
    QualifiedArrayType, QualifiedDeclaredType, QualifiedExecutableType, QualifiedLeafType,
    QualifiedType, QualifiedTypeParameterBounds, QualifiedTypeVariable,
};
use crate::variance::class_variances;
use qtf_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use qtf_model::{BaseTypeData, BaseTypeId, BaseTypeOracle, ClassId, TypeParamId, Variance};
use tracing::{trace, warn};

/// What the hierarchy needs from its surroundings beyond the lattice.
///
/// Implemented by the factory, so that supertypes and bounds seen during
/// subtyping are the same ones (hooks and defaulting included) that the
/// rest of the checker sees.
pub trait SubtypeEnv<Q: Qualifier> {
    fn oracle(&self) -> &dyn BaseTypeOracle;

    /// View `ty` as an instance of `class`, or `None` if `class` is not
    /// among its supertypes.
    fn as_super(
        &self,
        ty: &QualifiedType<Q>,
        class: ClassId,
    ) -> Result<Option<QualifiedType<Q>>, QualError>;

    fn type_variable_bounds(
        &self,
        param: TypeParamId,
    ) -> Result<QualifiedTypeParameterBounds<Q>, QualError>;
}

/// Result of checking a call site against an executable's signature.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallCompatibility {
    pub receiver_ok: bool,
    /// Indices of arguments not compatible with their parameter.
    pub incompatible_arguments: Vec<usize>,
}

impl CallCompatibility {
    pub fn is_ok(&self) -> bool {
        self.receiver_ok && self.incompatible_arguments.is_empty()
    }
}

pub struct TypeHierarchy<'a, Q: Qualifier> {
    lattice: &'a QualifierHierarchy<Q>,
    env: &'a dyn SubtypeEnv<Q>,
    options: &'a EngineOptions,
}

impl<'a, Q: Qualifier> TypeHierarchy<'a, Q> {
    pub fn new(
        lattice: &'a QualifierHierarchy<Q>,
        env: &'a dyn SubtypeEnv<Q>,
        options: &'a EngineOptions,
    ) -> Self {
        TypeHierarchy {
            lattice,
            env,
            options,
        }
    }

    pub fn lattice(&self) -> &'a QualifierHierarchy<Q> {
        self.lattice
    }

    pub fn is_subtype(&self, sub: &QualifiedType<Q>, sup: &QualifiedType<Q>) -> Result<bool, QualError> {
        let result = self.subtype(sub, sup, 0)?;
        trace!(
            sub = %sub.display(self.env.oracle()),
            sup = %sup.display(self.env.oracle()),
            result,
            "is_subtype"
        );
        Ok(result)
    }

    /// Mutual subtyping.
    pub fn is_equivalent(&self, a: &QualifiedType<Q>, b: &QualifiedType<Q>) -> Result<bool, QualError> {
        Ok(self.subtype(a, b, 0)? && self.subtype(b, a, 0)?)
    }

    /// Override compatibility of `overrider` against `overridden`.
    pub fn is_override_compatible(
        &self,
        overrider: &QualifiedExecutableType<Q>,
        overridden: &QualifiedExecutableType<Q>,
    ) -> Result<bool, QualError> {
        self.executable_subtype(overrider, overridden, 0)
    }

    /// Call compatibility: the receiver and every argument must flow into
    /// the corresponding formal type.
    pub fn are_arguments_compatible(
        &self,
        executable: &QualifiedExecutableType<Q>,
        receiver: Option<&QualifiedType<Q>>,
        arguments: &[QualifiedType<Q>],
    ) -> Result<CallCompatibility, QualError> {
        if arguments.len() != executable.parameter_types.len() {
            return Err(QualError::ShapeMismatch {
                context: "call arguments",
                left: format!("{} arguments", arguments.len()),
                right: format!("{} parameters", executable.parameter_types.len()),
            });
        }
        let receiver_ok = match (receiver, executable.receiver_type.as_deref()) {
            (Some(actual), Some(formal)) => self.subtype(actual, formal, 0)?,
            _ => true,
        };
        let mut incompatible_arguments = Vec::new();
        for (i, (arg, param)) in arguments.iter().zip(&executable.parameter_types).enumerate() {
            if !self.subtype(arg, param, 0)? {
                incompatible_arguments.push(i);
            }
        }
        Ok(CallCompatibility {
            receiver_ok,
            incompatible_arguments,
        })
    }

    /// Node-wise join of two types of the same shape.
    pub fn least_upper_bound(
        &self,
        a: &QualifiedType<Q>,
        b: &QualifiedType<Q>,
    ) -> Result<QualifiedType<Q>, QualError> {
        if !a.same_shape(b) {
            return Err(self.mismatch("least upper bound", a, b));
        }
        let join = |x: &Q, y: &Q| self.lattice.join(x, y).map_err(QualError::from);
        Ok(match (a, b) {
            (QualifiedType::Declared(x), QualifiedType::Declared(y)) => {
                let type_arguments = x
                    .type_arguments
                    .iter()
                    .zip(&y.type_arguments)
                    .map(|(p, q)| self.least_upper_bound(p, q))
                    .collect::<Result<_, _>>()?;
                QualifiedType::Declared(QualifiedDeclaredType {
                    base: x.base,
                    qualifier: join(&x.qualifier, &y.qualifier)?,
                    type_arguments,
                })
            }
            (QualifiedType::Array(x), QualifiedType::Array(y)) => {
                QualifiedType::Array(QualifiedArrayType {
                    base: x.base,
                    qualifier: join(&x.qualifier, &y.qualifier)?,
                    component: Box::new(self.least_upper_bound(&x.component, &y.component)?),
                })
            }
            (QualifiedType::TypeVariable(x), QualifiedType::TypeVariable(y)) => {
                QualifiedType::TypeVariable(QualifiedTypeVariable {
                    base: x.base,
                    qualifier: join(&x.qualifier, &y.qualifier)?,
                    param: x.param,
                    explicit: x.explicit || y.explicit,
                })
            }
            (QualifiedType::Primitive(x), QualifiedType::Primitive(y)) => {
                QualifiedType::Primitive(QualifiedLeafType {
                    base: x.base,
                    qualifier: join(&x.qualifier, &y.qualifier)?,
                })
            }
            (QualifiedType::Other(x), QualifiedType::Other(y)) => {
                QualifiedType::Other(QualifiedLeafType {
                    base: x.base,
                    qualifier: join(&x.qualifier, &y.qualifier)?,
                })
            }
            _ => return Err(self.mismatch("least upper bound", a, b)),
        })
    }

    // =========================================================================
    // Recursion
    // =========================================================================

    fn subtype(
        &self,
        sub: &QualifiedType<Q>,
        sup: &QualifiedType<Q>,
        depth: u32,
    ) -> Result<bool, QualError> {
        if depth >= self.options.max_subtype_depth {
            warn!(
                depth,
                sub = %sub.display(self.env.oracle()),
                sup = %sup.display(self.env.oracle()),
                "subtype depth limit reached"
            );
            return Ok(false);
        }
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            self.subtype_inner(sub, sup, depth)
        })
    }

    fn subtype_inner(
        &self,
        sub: &QualifiedType<Q>,
        sup: &QualifiedType<Q>,
        depth: u32,
    ) -> Result<bool, QualError> {
        use QualifiedType as T;
        let oracle = self.env.oracle();
        match (sub, sup) {
            (T::Executable(a), T::Executable(b)) => self.executable_subtype(a, b, depth),
            (T::Executable(_), _) | (_, T::Executable(_)) => Err(self.mismatch("subtype", sub, sup)),

            (T::TypeVariable(s), T::TypeVariable(t)) if s.param == t.param => {
                // Uses agreeing on the qualifier denote the same type whether
                // or not it was written.
                if s.qualifier == t.qualifier || (!s.explicit && !t.explicit) {
                    return Ok(self.qualifier_subtype(&s.qualifier, &t.qualifier));
                }
                let upper = self.effective_upper(s)?;
                let lower = self.effective_lower(t)?;
                Ok(match (upper.qualifier(), lower.qualifier()) {
                    (Some(u), Some(l)) => self.qualifier_subtype(u, l),
                    _ => false,
                })
            }
            (T::TypeVariable(s), _) => {
                let upper = self.effective_upper(s)?;
                self.subtype(&upper, sup, depth + 1)
            }
            (_, T::TypeVariable(t)) => {
                let lower = self.effective_lower(t)?;
                self.subtype(sub, &lower, depth + 1)
            }

            (T::Other(a), T::Other(b)) => Ok(oracle.is_subtype(a.base, b.base)
                && self.qualifier_subtype(&a.qualifier, &b.qualifier)),
            (T::Other(_), T::Primitive(_)) | (T::Primitive(_), T::Other(_)) => {
                Err(self.mismatch("subtype", sub, sup))
            }
            (T::Other(a), T::Declared(_) | T::Array(_)) => {
                if !self.is_null_or_error(a.base) {
                    return Err(self.mismatch("subtype", sub, sup));
                }
                Ok(sup
                    .qualifier()
                    .is_some_and(|q| self.qualifier_subtype(&a.qualifier, q)))
            }
            (T::Declared(_) | T::Array(_), T::Other(b)) => {
                if matches!(oracle.lookup(b.base), Some(BaseTypeData::Error)) {
                    return Ok(sub
                        .qualifier()
                        .is_some_and(|q| self.qualifier_subtype(q, &b.qualifier)));
                }
                // A reference type is never below `null`.
                Ok(false)
            }

            (T::Primitive(a), T::Primitive(b)) => Ok(oracle.is_subtype(a.base, b.base)
                && self.qualifier_subtype(&a.qualifier, &b.qualifier)),
            (T::Primitive(_), _) | (_, T::Primitive(_)) => Err(self.mismatch("subtype", sub, sup)),

            (T::Array(a), T::Array(b)) => {
                if !oracle.is_subtype(a.base, b.base)
                    || !self.qualifier_subtype(&a.qualifier, &b.qualifier)
                {
                    return Ok(false);
                }
                if self.options.array_covariance {
                    self.subtype(&a.component, &b.component, depth + 1)
                } else {
                    Ok(self.subtype(&a.component, &b.component, depth + 1)?
                        && self.subtype(&b.component, &a.component, depth + 1)?)
                }
            }
            (T::Declared(_), T::Array(_)) => Err(self.mismatch("subtype", sub, sup)),
            (T::Declared(_) | T::Array(_), T::Declared(b)) => self.declared_subtype(sub, b, depth),
        }
    }

    fn declared_subtype(
        &self,
        sub: &QualifiedType<Q>,
        sup: &QualifiedDeclaredType<Q>,
        depth: u32,
    ) -> Result<bool, QualError> {
        let oracle = self.env.oracle();
        let Some(class) = oracle.class_of(sup.base) else {
            return Err(self.mismatch("subtype", sub, &QualifiedType::Declared(sup.clone())));
        };
        let Some(view) = self.env.as_super(sub, class)? else {
            return Ok(false);
        };
        let QualifiedType::Declared(view) = view else {
            return Err(self.mismatch("supertype view", sub, &QualifiedType::Declared(sup.clone())));
        };
        if !self.qualifier_subtype(&view.qualifier, &sup.qualifier) {
            return Ok(false);
        }
        // Raw uses on either side leave the arguments unchecked.
        if view.type_arguments.is_empty() || sup.type_arguments.is_empty() {
            return Ok(true);
        }
        if view.type_arguments.len() != sup.type_arguments.len() {
            return Err(self.mismatch(
                "type arguments",
                &QualifiedType::Declared(view),
                &QualifiedType::Declared(sup.clone()),
            ));
        }
        let fallback = self.options.default_variance.flags();
        let variances = class_variances(oracle, class, fallback);
        for (i, (x, y)) in view.type_arguments.iter().zip(&sup.type_arguments).enumerate() {
            let variance = variances.get(i).copied().unwrap_or(fallback);
            if variance.contains(Variance::COVARIANT) && !self.subtype(x, y, depth + 1)? {
                return Ok(false);
            }
            if variance.contains(Variance::CONTRAVARIANT) && !self.subtype(y, x, depth + 1)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn executable_subtype(
        &self,
        sub: &QualifiedExecutableType<Q>,
        sup: &QualifiedExecutableType<Q>,
        depth: u32,
    ) -> Result<bool, QualError> {
        if sub.parameter_types.len() != sup.parameter_types.len() {
            return Err(QualError::ShapeMismatch {
                context: "override",
                left: format!("{} parameters", sub.parameter_types.len()),
                right: format!("{} parameters", sup.parameter_types.len()),
            });
        }
        if !self.subtype(&sub.return_type, &sup.return_type, depth + 1)? {
            trace!("override return type is not covariant");
            return Ok(false);
        }
        for (p_sub, p_sup) in sub.parameter_types.iter().zip(&sup.parameter_types) {
            let ok = if self.options.parameter_contravariance {
                self.subtype(p_sup, p_sub, depth + 1)?
            } else {
                self.subtype(p_sup, p_sub, depth + 1)? && self.subtype(p_sub, p_sup, depth + 1)?
            };
            if !ok {
                trace!("override parameter types are incompatible");
                return Ok(false);
            }
        }
        match (sub.receiver_type.as_deref(), sup.receiver_type.as_deref()) {
            (Some(r_sub), Some(r_sup)) if r_sub.base() == r_sup.base() => {
                self.subtype(r_sup, r_sub, depth + 1)
            }
            // Receivers of an override and its overridden method are declared
            // in different classes; only their primary qualifiers compare.
            (Some(r_sub), Some(r_sup)) => Ok(match (r_sub.qualifier(), r_sup.qualifier()) {
                (Some(a), Some(b)) => self.qualifier_subtype(b, a),
                _ => true,
            }),
            _ => Ok(true),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn qualifier_subtype(&self, a: &Q, b: &Q) -> bool {
        self.lattice.is_subtype(a, b)
    }

    fn is_null_or_error(&self, base: BaseTypeId) -> bool {
        matches!(
            self.env.oracle().lookup(base),
            Some(BaseTypeData::Null | BaseTypeData::Error)
        )
    }

    /// Upper bound of a variable use; an explicit qualifier on the use
    /// replaces the bound's primary qualifier.
    fn effective_upper(&self, v: &QualifiedTypeVariable<Q>) -> Result<QualifiedType<Q>, QualError> {
        let bounds = self.env.type_variable_bounds(v.param)?;
        Ok(if v.explicit {
            bounds.upper.with_qualifier(v.qualifier.clone())
        } else {
            bounds.upper
        })
    }

    fn effective_lower(&self, v: &QualifiedTypeVariable<Q>) -> Result<QualifiedType<Q>, QualError> {
        let bounds = self.env.type_variable_bounds(v.param)?;
        Ok(if v.explicit {
            bounds.lower.with_qualifier(v.qualifier.clone())
        } else {
            bounds.lower
        })
    }

    fn mismatch(
        &self,
        context: &'static str,
        a: &QualifiedType<Q>,
        b: &QualifiedType<Q>,
    ) -> QualError {
        let oracle = self.env.oracle();
        QualError::ShapeMismatch {
            context,
            left: a.display(oracle).to_string(),
            right: b.display(oracle).to_string(),
        }
    }
}

#[cfg(test)]
#[path = "../tests/type_hierarchy_tests.rs"]
mod tests;
