//! Type parameter bounds and use-site type argument checks.

use crate::defaults::TypeUseLocation;
use crate::errors::QualError;
use crate::factory::{DefaultQualifiedTypeFactory, QualifiedTypeFactory};
use crate::lattice::Qualifier;
use crate::types::{QualifiedLeafType, QualifiedType, QualifiedTypeParameterBounds};
use qtf_model::{ClassId, ElementId, TypeParamId};

/// A type argument outside the bounds of its type parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeArgumentViolation<Q> {
    pub class: ClassId,
    /// Position of the argument in the use.
    pub index: usize,
    pub argument: QualifiedType<Q>,
    /// The parameter's bounds, instantiated for this use.
    pub bounds: QualifiedTypeParameterBounds<Q>,
}

impl<Q: Qualifier> DefaultQualifiedTypeFactory<Q> {
    /// Declared bounds of a type parameter element.
    ///
    /// The lower bound is the `null` type, qualified by the parameter's
    /// explicit lower qualifier or the default for lower bounds.
    pub(crate) fn declared_bounds(
        &self,
        type_param: ElementId,
    ) -> Result<QualifiedTypeParameterBounds<Q>, QualError> {
        let tp = self
            .element(type_param)?
            .as_type_parameter()
            .ok_or_else(|| QualError::NotA {
                what: self.program.element_location(type_param).to_string(),
                expected: "type parameter",
            })?;
        let upper = self.syntax_type(tp.upper_bound, TypeUseLocation::UpperBound, None)?;
        Ok(QualifiedTypeParameterBounds {
            upper,
            lower: self.lower_bound(tp.lower_qualifier.clone())?,
        })
    }

    /// Bounds of `param`, also for parameters known only to the base type
    /// system.
    pub(crate) fn bounds_of_param(
        &self,
        param: TypeParamId,
    ) -> Result<QualifiedTypeParameterBounds<Q>, QualError> {
        if let Some(element) = self.program.type_param_element(param) {
            return self.declared_bounds(element);
        }
        let oracle = self.oracle();
        let bound = oracle
            .type_param(param)
            .map_or_else(|| oracle.object(), |d| d.upper_bound);
        Ok(QualifiedTypeParameterBounds {
            upper: self.default_type(bound, TypeUseLocation::UpperBound)?,
            lower: self.lower_bound(None)?,
        })
    }

    fn lower_bound(&self, qualifier: Option<Q>) -> Result<QualifiedType<Q>, QualError> {
        let null = self.oracle().null();
        let qualifier = match qualifier {
            Some(q) => self.in_lattice(q)?,
            None => self.defaulted(TypeUseLocation::LowerBound, null)?,
        };
        Ok(QualifiedType::Other(QualifiedLeafType {
            base: null,
            qualifier,
        }))
    }

    /// Every type argument in `ty` (at any depth) that lies outside the
    /// bounds of its parameter.
    pub fn check_type_arguments(
        &self,
        ty: &QualifiedType<Q>,
    ) -> Result<Vec<TypeArgumentViolation<Q>>, QualError> {
        let mut violations = Vec::new();
        self.collect_violations(ty, &mut violations)?;
        Ok(violations)
    }

    fn collect_violations(
        &self,
        ty: &QualifiedType<Q>,
        out: &mut Vec<TypeArgumentViolation<Q>>,
    ) -> Result<(), QualError> {
        match ty {
            QualifiedType::Declared(d) => {
                for arg in &d.type_arguments {
                    self.collect_violations(arg, out)?;
                }
                if d.type_arguments.is_empty() {
                    return Ok(());
                }
                let oracle = self.oracle();
                let Some(class) = oracle.class_of(d.base) else {
                    return Ok(());
                };
                let params = oracle
                    .class(class)
                    .map(|c| c.type_params.clone())
                    .unwrap_or_default();
                let subst = self.use_substitution(d, class)?;
                let hierarchy = self.type_hierarchy();
                for (index, (&param, written)) in params.iter().zip(&d.type_arguments).enumerate() {
                    let argument = subst.get(param).unwrap_or(written).clone();
                    let declared = self.bounds_of_param(param)?;
                    let bounds = QualifiedTypeParameterBounds {
                        upper: subst.apply(oracle, &declared.upper),
                        lower: declared.lower,
                    };
                    let within = hierarchy.is_subtype(&argument, &bounds.upper)?
                        && hierarchy.is_subtype(&bounds.lower, &argument)?;
                    if !within {
                        out.push(TypeArgumentViolation {
                            class,
                            index,
                            argument,
                            bounds,
                        });
                    }
                }
            }
            QualifiedType::Array(a) => self.collect_violations(&a.component, out)?,
            QualifiedType::Executable(e) => {
                self.collect_violations(&e.return_type, out)?;
                for p in &e.parameter_types {
                    self.collect_violations(p, out)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/bounds_tests.rs"]
mod tests;
