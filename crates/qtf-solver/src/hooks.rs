//! Checker customization points.
//!
//! Each hook receives the result the engine computed by default together
//! with the context it was computed in, and returns the adjusted result.
//! The defaults return their input unchanged. The factory validates every
//! result before using it:
//!
//! | Hook | Must preserve |
//! |------|---------------|
//! | `post_direct_supertypes` | length, and the base type at every index |
//! | `post_as_member_of` | the member's shape |
//! | `type_variables_from_use` | one variable per type parameter, in order |
//! | `method_from_use` / `constructor_from_use` | the executable's shape and one type argument per type parameter |

use crate::factory::DefaultQualifiedTypeFactory;
use crate::lattice::Qualifier;
use crate::types::{QualifiedDeclaredType, QualifiedExecutableType, QualifiedType, QualifiedTypeVariable};
use qtf_model::{ElementId, TreeId};

/// A fully instantiated executable at a call site, with the type used to
/// instantiate each of its type parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutableUse<Q> {
    pub executable: QualifiedExecutableType<Q>,
    pub type_arguments: Vec<QualifiedType<Q>>,
}

impl<Q: Clone> ExecutableUse<Q> {
    pub(crate) fn same_shape(&self, other: &Self) -> bool {
        self.executable.same_shape(&other.executable)
            && self.type_arguments.len() == other.type_arguments.len()
            && self
                .type_arguments
                .iter()
                .zip(&other.type_arguments)
                .all(|(a, b)| a.same_shape(b))
    }
}

#[allow(unused_variables)]
pub trait CheckerHooks<Q: Qualifier>: Send + Sync {
    /// Adjust the direct supertypes of `subtype`.
    ///
    /// `supertypes` carries the qualifiers the engine propagated along each
    /// inheritance edge (see `EngineOptions::supertype_qualifiers`).
    fn post_direct_supertypes(
        &self,
        factory: &DefaultQualifiedTypeFactory<Q>,
        subtype: &QualifiedType<Q>,
        supertypes: Vec<QualifiedType<Q>>,
    ) -> Vec<QualifiedType<Q>> {
        supertypes
    }

    /// Adjust the type of `member` seen through `receiver`.
    fn post_as_member_of(
        &self,
        factory: &DefaultQualifiedTypeFactory<Q>,
        member_type: QualifiedType<Q>,
        receiver: &QualifiedType<Q>,
        member: ElementId,
    ) -> QualifiedType<Q> {
        member_type
    }

    /// Adjust the type variables instantiated by a parameterized use.
    ///
    /// `variables[i]` carries the primary qualifier of the use's `i`-th type
    /// argument. A variable whose qualifier the hook changes imposes the new
    /// qualifier on that argument wherever the use is substituted.
    fn type_variables_from_use(
        &self,
        factory: &DefaultQualifiedTypeFactory<Q>,
        ty: &QualifiedDeclaredType<Q>,
        class: ElementId,
        variables: Vec<QualifiedTypeVariable<Q>>,
    ) -> Vec<QualifiedTypeVariable<Q>> {
        variables
    }

    fn method_from_use(
        &self,
        factory: &DefaultQualifiedTypeFactory<Q>,
        tree: TreeId,
        result: ExecutableUse<Q>,
    ) -> ExecutableUse<Q> {
        result
    }

    fn constructor_from_use(
        &self,
        factory: &DefaultQualifiedTypeFactory<Q>,
        tree: TreeId,
        result: ExecutableUse<Q>,
    ) -> ExecutableUse<Q> {
        result
    }

    /// Qualifier for a method type parameter that no argument constrains.
    ///
    /// `None` falls back to `EngineOptions::uninferred_qualifier`.
    fn uninferred_type_argument(
        &self,
        factory: &DefaultQualifiedTypeFactory<Q>,
        tree: TreeId,
        type_param: ElementId,
    ) -> Option<Q> {
        None
    }
}

/// The engine defaults, unchanged.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHooks;

impl<Q: Qualifier> CheckerHooks<Q> for NoHooks {}
