//! Supertypes of qualified types.
//!
//! Direct supertypes are derived from the written `extends` clauses of the
//! class, with the use's type arguments substituted for the class's type
//! parameters. An unannotated supertype gets its primary qualifier from
//! [`SupertypePolicy`]; the checker's `post_direct_supertypes` hook then sees
//! the full list and may adjust any qualifier, but never the list itself.

use crate::defaults::TypeUseLocation;
use crate::errors::QualError;
use crate::factory::DefaultQualifiedTypeFactory;
use crate::instantiate::QualifiedSubstitution;
use crate::lattice::Qualifier;
use crate::options::SupertypePolicy;
use crate::types::{QualifiedDeclaredType, QualifiedType, QualifiedTypeVariable};
use qtf_common::limits::MAX_SUPERTYPE_SEARCH;
use qtf_model::{BaseTypeData, ClassId, ElementId, TypeParamId};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::{trace, warn};

impl<Q: Qualifier> DefaultQualifiedTypeFactory<Q> {
    /// Direct supertypes of `ty`, after the `post_direct_supertypes` hook.
    pub fn direct_supertypes(&self, ty: &QualifiedType<Q>) -> Result<Vec<QualifiedType<Q>>, QualError> {
        let supertypes = match ty {
            QualifiedType::Declared(d) => self.declared_supertypes(d)?,
            QualifiedType::Array(a) => {
                let object = self.oracle().object();
                vec![self
                    .default_type(object, TypeUseLocation::Supertype)?
                    .with_qualifier(self.propagated_qualifier(&a.qualifier))]
            }
            QualifiedType::TypeVariable(v) => {
                let upper = self.bounds_of_param(v.param)?.upper;
                vec![if v.explicit {
                    upper.with_qualifier(v.qualifier.clone())
                } else {
                    upper
                }]
            }
            _ => Vec::new(),
        };
        self.hooked_direct_supertypes(ty, supertypes)
    }

    /// View `ty` as an instance of `class`, searching the hooked supertype
    /// graph breadth-first.
    pub fn as_super(
        &self,
        ty: &QualifiedType<Q>,
        class: ClassId,
    ) -> Result<Option<QualifiedType<Q>>, QualError> {
        let oracle = self.oracle();
        let mut queue = VecDeque::from([ty.clone()]);
        let mut seen = FxHashSet::default();
        let mut steps = 0usize;
        while let Some(current) = queue.pop_front() {
            steps += 1;
            if steps > MAX_SUPERTYPE_SEARCH {
                warn!(
                    ty = %ty.display(oracle),
                    class = class.0,
                    "supertype search limit reached"
                );
                return Ok(None);
            }
            if let QualifiedType::Declared(d) = &current
                && oracle.class_of(d.base) == Some(class)
            {
                return Ok(Some(current));
            }
            if let Some(base) = current.base()
                && !seen.insert(base)
            {
                continue;
            }
            queue.extend(self.direct_supertypes(&current)?);
        }
        Ok(None)
    }

    fn propagated_qualifier(&self, subtype_qualifier: &Q) -> Q {
        match self.options.supertype_qualifiers {
            SupertypePolicy::SameAsSubtype => subtype_qualifier.clone(),
            SupertypePolicy::Top => self.lattice.top().clone(),
        }
    }

    fn declared_supertypes(&self, d: &QualifiedDeclaredType<Q>) -> Result<Vec<QualifiedType<Q>>, QualError> {
        let oracle = self.oracle();
        let class = oracle.class_of(d.base).ok_or_else(|| QualError::NotA {
            what: oracle.display(d.base),
            expected: "class type",
        })?;
        let primary = self.propagated_qualifier(&d.qualifier);
        let subst = self.use_substitution(d, class)?;

        let Some(class_el) = self.program.class_element(class) else {
            // Declared only in the base type system: nothing is written, so
            // every supertype is unannotated.
            return oracle
                .direct_supertypes(d.base)
                .into_iter()
                .map(|b| {
                    Ok(self
                        .default_type(b, TypeUseLocation::Supertype)?
                        .with_qualifier(primary.clone()))
                })
                .collect();
        };
        let written = self.class_element(class_el)?.supertypes.clone();
        if written.is_empty() {
            if class == oracle.object_class() {
                return Ok(Vec::new());
            }
            let object = self.default_type(oracle.object(), TypeUseLocation::Supertype)?;
            return Ok(vec![object.with_qualifier(primary)]);
        }

        let mut supertypes = Vec::with_capacity(written.len());
        for syntax in written {
            let annotated = self.is_annotated(syntax);
            let declared = self.syntax_type(syntax, TypeUseLocation::Supertype, None)?;
            let sup = subst.apply(oracle, &declared);
            supertypes.push(if annotated {
                sup
            } else {
                sup.with_qualifier(primary.clone())
            });
        }
        Ok(supertypes)
    }

    pub(crate) fn hooked_direct_supertypes(
        &self,
        subtype: &QualifiedType<Q>,
        supertypes: Vec<QualifiedType<Q>>,
    ) -> Result<Vec<QualifiedType<Q>>, QualError> {
        let oracle = self.oracle();
        let expected = supertypes.clone();
        let adjusted = self.hooks.post_direct_supertypes(self, subtype, supertypes);
        if adjusted.len() != expected.len() {
            return Err(QualError::SupertypeArity {
                subtype: subtype.display(oracle).to_string(),
                detail: format!("expected {} supertypes, found {}", expected.len(), adjusted.len()),
            });
        }
        for (i, (got, want)) in adjusted.iter().zip(&expected).enumerate() {
            self.check_qualifiers(got)?;
            if !got.same_shape(want) {
                return Err(QualError::SupertypeArity {
                    subtype: subtype.display(oracle).to_string(),
                    detail: format!(
                        "supertype {i} changed from {} to {}",
                        want.display(oracle),
                        got.display(oracle)
                    ),
                });
            }
        }
        trace!(
            subtype = %subtype.display(oracle),
            count = adjusted.len(),
            "direct supertypes"
        );
        Ok(adjusted)
    }

    /// Substitution of a generic class's type parameters for one of its
    /// parameterized uses, after the `type_variables_from_use` hook.
    ///
    /// Raw uses substitute nothing.
    pub(crate) fn use_substitution(
        &self,
        ty: &QualifiedDeclaredType<Q>,
        class: ClassId,
    ) -> Result<QualifiedSubstitution<Q>, QualError> {
        let oracle = self.oracle();
        let params = oracle
            .class(class)
            .map(|c| c.type_params.clone())
            .unwrap_or_default();
        if params.is_empty() || ty.type_arguments.is_empty() {
            return Ok(QualifiedSubstitution::new());
        }
        if params.len() != ty.type_arguments.len() {
            return Err(QualError::ShapeMismatch {
                context: "type arguments",
                left: QualifiedType::Declared(ty.clone()).display(oracle).to_string(),
                right: format!("{} type parameters", params.len()),
            });
        }
        let variables = match self.program.class_element(class) {
            Some(class_el) => self.hooked_use_variables(ty, class_el)?,
            None => self.use_variables(ty, &params)?,
        };
        let mut subst = QualifiedSubstitution::new();
        for ((param, arg), var) in params.into_iter().zip(&ty.type_arguments).zip(variables) {
            let arg = match arg.qualifier() {
                Some(q) if *q != var.qualifier => arg.clone().with_qualifier(var.qualifier),
                _ => arg.clone(),
            };
            subst.insert(param, arg);
        }
        Ok(subst)
    }

    /// One variable per type parameter, carrying the matching argument's
    /// primary qualifier (or the bound's, for raw uses).
    fn use_variables(
        &self,
        ty: &QualifiedDeclaredType<Q>,
        params: &[TypeParamId],
    ) -> Result<Vec<QualifiedTypeVariable<Q>>, QualError> {
        let oracle = self.oracle();
        params
            .iter()
            .enumerate()
            .map(|(i, &param)| {
                let base = oracle.intern(BaseTypeData::TypeVariable(param));
                let from_arg = ty
                    .type_arguments
                    .get(i)
                    .and_then(|a| a.qualifier())
                    .cloned();
                match from_arg {
                    Some(qualifier) => Ok(QualifiedTypeVariable {
                        base,
                        qualifier,
                        param,
                        explicit: false,
                    }),
                    None => self.type_variable_use(param, base, None),
                }
            })
            .collect()
    }

    pub(crate) fn hooked_use_variables(
        &self,
        ty: &QualifiedDeclaredType<Q>,
        class: ElementId,
    ) -> Result<Vec<QualifiedTypeVariable<Q>>, QualError> {
        let oracle = self.oracle();
        let class_id = self.class_element(class)?.class;
        let params = oracle
            .class(class_id)
            .map(|c| c.type_params.clone())
            .unwrap_or_default();
        let variables = self.use_variables(ty, &params)?;
        let adjusted = self.hooks.type_variables_from_use(self, ty, class, variables);
        if adjusted.len() != params.len() {
            return Err(QualError::TypeVariableArity {
                ty: QualifiedType::Declared(ty.clone()).display(oracle).to_string(),
                expected: params.len(),
                found: adjusted.len(),
            });
        }
        if let Some((got, &want)) = adjusted.iter().zip(&params).find(|(v, p)| v.param != **p) {
            return Err(QualError::HookShape {
                hook: "type_variables_from_use",
                expected: oracle.display(oracle.intern(BaseTypeData::TypeVariable(want))),
                found: oracle.display(got.base),
            });
        }
        for v in &adjusted {
            self.in_lattice(v.qualifier.clone())?;
        }
        Ok(adjusted)
    }
}

#[cfg(test)]
#[path = "../tests/supertypes_tests.rs"]
mod tests;
