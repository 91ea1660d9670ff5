//! Refinement seam for expression types.

use crate::factory::DefaultQualifiedTypeFactory;
use crate::lattice::Qualifier;
use crate::types::QualifiedType;
use qtf_model::TreeId;

/// Adjusts the type computed for an expression, e.g. with flow facts.
///
/// Runs after the factory typed `tree` from declarations. The result must
/// keep the shape of `ty`; the factory rejects anything else.
pub trait TypeRefiner<Q: Qualifier>: Send + Sync {
    fn refine(
        &self,
        factory: &DefaultQualifiedTypeFactory<Q>,
        tree: TreeId,
        ty: QualifiedType<Q>,
    ) -> QualifiedType<Q>;
}

/// No refinement: declared types are final.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoRefinement;

impl<Q: Qualifier> TypeRefiner<Q> for NoRefinement {
    fn refine(
        &self,
        _factory: &DefaultQualifiedTypeFactory<Q>,
        _tree: TreeId,
        ty: QualifiedType<Q>,
    ) -> QualifiedType<Q> {
        ty
    }
}
