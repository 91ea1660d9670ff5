//! Member types seen through a receiver.

use crate::errors::QualError;
use crate::factory::{DefaultQualifiedTypeFactory, QualifiedTypeFactory};
use crate::instantiate::QualifiedSubstitution;
use crate::lattice::Qualifier;
use crate::types::QualifiedType;
use qtf_model::{Element, ElementId};
use tracing::trace;

impl<Q: Qualifier> DefaultQualifiedTypeFactory<Q> {
    /// Type of `member` accessed through `receiver`, after the
    /// `post_as_member_of` hook.
    ///
    /// The declaring class's type parameters are replaced by the receiver's
    /// type arguments (viewed at the declaring class). Static members see
    /// no substitution but still go through the hook.
    pub fn as_member_of(
        &self,
        member: ElementId,
        receiver: &QualifiedType<Q>,
    ) -> Result<QualifiedType<Q>, QualError> {
        let element = self.element(member)?;
        let declared = self.qualified_type_of_element(member)?;
        let adapted = if element.is_static() {
            declared
        } else {
            let owner = match element {
                Element::Field(v) => v.enclosing,
                Element::Method(e) | Element::Constructor(e) => e.owner,
                _ => {
                    return Err(QualError::NotA {
                        what: self.program.element_location(member).to_string(),
                        expected: "field or method",
                    });
                }
            };
            let class = self.class_element(owner)?.class;
            let subst = match self.as_super(receiver, class)? {
                Some(QualifiedType::Declared(view)) => self.use_substitution(&view, class)?,
                _ => QualifiedSubstitution::new(),
            };
            subst.apply(self.oracle(), &declared)
        };
        self.hooked_member_type(adapted, receiver, member)
    }

    pub(crate) fn hooked_member_type(
        &self,
        member_type: QualifiedType<Q>,
        receiver: &QualifiedType<Q>,
        member: ElementId,
    ) -> Result<QualifiedType<Q>, QualError> {
        let oracle = self.oracle();
        let adjusted = self
            .hooks
            .post_as_member_of(self, member_type.clone(), receiver, member);
        if !adjusted.same_shape(&member_type) {
            return Err(QualError::HookShape {
                hook: "post_as_member_of",
                expected: member_type.display(oracle).to_string(),
                found: adjusted.display(oracle).to_string(),
            });
        }
        self.check_qualifiers(&adjusted)?;
        trace!(
            member = %self.program.element_location(member),
            receiver = %receiver.display(oracle),
            ty = %adjusted.display(oracle),
            "as member of"
        );
        Ok(adjusted)
    }
}
