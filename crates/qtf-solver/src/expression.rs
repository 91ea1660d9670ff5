//! Qualified types of expression trees.
//!
//! Trees are typed from the declarations they reference, then handed to
//! the checker's [`TypeRefiner`](crate::refine::TypeRefiner). The refined
//! type must keep the shape of the declared one.

use crate::defaults::TypeUseLocation;
use crate::errors::QualError;
use crate::factory::{DefaultQualifiedTypeFactory, QualifiedTypeFactory};
use crate::lattice::Qualifier;
use crate::types::QualifiedType;
use qtf_common::limits::{STACK_GROWTH, STACK_RED_ZONE};
use qtf_model::{BaseTypeId, TreeId, TreeKind, TypeSyntaxId};
use tracing::trace;

impl<Q: Qualifier> DefaultQualifiedTypeFactory<Q> {
    pub(crate) fn tree_type(&self, id: TreeId) -> Result<QualifiedType<Q>, QualError> {
        let ty = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.declared_tree_type(id))?;
        let refined = self.refiner.refine(self, id, ty.clone());
        let oracle = self.oracle();
        if !refined.same_shape(&ty) {
            return Err(QualError::HookShape {
                hook: "refine",
                expected: ty.display(oracle).to_string(),
                found: refined.display(oracle).to_string(),
            });
        }
        self.check_qualifiers(&refined)?;
        trace!(
            tree = %self.program.location(id),
            ty = %refined.display(oracle),
            "tree type"
        );
        Ok(refined)
    }

    fn declared_tree_type(&self, id: TreeId) -> Result<QualifiedType<Q>, QualError> {
        let tree = self.program.tree(id).ok_or(QualError::UnknownTree(id))?;
        match &tree.kind {
            TreeKind::Literal => self.default_type(tree.base, TypeUseLocation::Literal),
            TreeKind::Ident(element) => self.qualified_type_of_element(*element),
            TreeKind::This(class) => self.implicit_receiver(*class),
            TreeKind::FieldAccess { receiver, field } => {
                let receiver = self.tree_type(*receiver)?;
                self.as_member_of(*field, &receiver)
            }
            TreeKind::MethodInvocation { .. } => self.method_use(id).map(|u| *u.executable.return_type),
            TreeKind::NewClass { class_type, .. } => {
                if self.is_annotated(*class_type) {
                    self.qualified_type_from_type_syntax(*class_type)
                } else {
                    self.constructor_use(id).map(|u| *u.executable.return_type)
                }
            }
            TreeKind::Cast { ty, expr } => {
                let written = self.qualified_type_from_type_syntax(*ty)?;
                if self.is_annotated(*ty) {
                    return Ok(written);
                }
                // An unannotated cast keeps the operand's qualifier.
                let operand = self.tree_type(*expr)?;
                Ok(match operand.qualifier() {
                    Some(q) => written.with_qualifier(q.clone()),
                    None => written,
                })
            }
            TreeKind::ArrayAccess { array, .. } => match self.tree_type(*array)? {
                QualifiedType::Array(a) => Ok(*a.component),
                other => Err(QualError::NotA {
                    what: other.display(self.oracle()).to_string(),
                    expected: "array type",
                }),
            },
            TreeKind::NewArray { ty, .. } => self.qualified_type_from_type_syntax(*ty),
            TreeKind::Assign { lhs, .. } => self.tree_type(*lhs),
            TreeKind::Conditional { then, otherwise, .. } => {
                let a = self.tree_type(*then)?;
                let b = self.tree_type(*otherwise)?;
                if a.same_shape(&b) {
                    self.type_hierarchy().least_upper_bound(&a, &b)
                } else {
                    self.joined_expression(tree.base, &a, &b)
                }
            }
            TreeKind::Binary { lhs, rhs } => {
                let a = self.tree_type(*lhs)?;
                let b = self.tree_type(*rhs)?;
                self.joined_expression(tree.base, &a, &b)
            }
        }
    }

    /// `base` qualified with the join of the operands' primary qualifiers.
    fn joined_expression(
        &self,
        base: BaseTypeId,
        a: &QualifiedType<Q>,
        b: &QualifiedType<Q>,
    ) -> Result<QualifiedType<Q>, QualError> {
        let ty = self.default_type(base, TypeUseLocation::Expression)?;
        Ok(match (a.qualifier(), b.qualifier()) {
            (Some(x), Some(y)) => ty.with_qualifier(self.lattice.join(x, y)?),
            _ => ty,
        })
    }

    pub(crate) fn is_annotated(&self, syntax: TypeSyntaxId) -> bool {
        self.program
            .type_syntax(syntax)
            .is_some_and(|s| s.annotation.is_some())
    }
}
