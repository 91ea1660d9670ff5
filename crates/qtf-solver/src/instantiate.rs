//! Substitution of qualified types for type variables.

use crate::lattice::Qualifier;
use crate::types::{
    QualifiedArrayType, QualifiedDeclaredType, QualifiedExecutableType, QualifiedType,
    QualifiedTypeVariable, rebuild_base,
};
use qtf_model::{BaseTypeOracle, TypeParamId};
use rustc_hash::FxHashMap;

/// Mapping from type parameters to the qualified types replacing them.
///
/// A variable use written with its own qualifier (`@A T`) keeps that
/// qualifier: the replacement is inserted with its primary qualifier
/// overwritten. Parent base types are re-interned through the oracle so the
/// result never drifts from the base type it describes.
#[derive(Clone, Debug)]
pub struct QualifiedSubstitution<Q> {
    map: FxHashMap<TypeParamId, QualifiedType<Q>>,
}

impl<Q> Default for QualifiedSubstitution<Q> {
    fn default() -> Self {
        QualifiedSubstitution {
            map: FxHashMap::default(),
        }
    }
}

impl<Q: Qualifier> QualifiedSubstitution<Q> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (TypeParamId, QualifiedType<Q>)>) -> Self {
        QualifiedSubstitution {
            map: pairs.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, param: TypeParamId, ty: QualifiedType<Q>) {
        self.map.insert(param, ty);
    }

    pub fn get(&self, param: TypeParamId) -> Option<&QualifiedType<Q>> {
        self.map.get(&param)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn apply(&self, oracle: &dyn BaseTypeOracle, ty: &QualifiedType<Q>) -> QualifiedType<Q> {
        if self.map.is_empty() {
            return ty.clone();
        }
        match ty {
            QualifiedType::TypeVariable(v) => match self.map.get(&v.param) {
                Some(replacement) if v.explicit => impose(replacement.clone(), &v.qualifier),
                Some(replacement) => replacement.clone(),
                None => ty.clone(),
            },
            QualifiedType::Declared(d) => {
                let rebuilt = QualifiedType::Declared(QualifiedDeclaredType {
                    base: d.base,
                    qualifier: d.qualifier.clone(),
                    type_arguments: d.type_arguments.iter().map(|a| self.apply(oracle, a)).collect(),
                });
                rebase(oracle, rebuilt)
            }
            QualifiedType::Array(a) => {
                let rebuilt = QualifiedType::Array(QualifiedArrayType {
                    base: a.base,
                    qualifier: a.qualifier.clone(),
                    component: Box::new(self.apply(oracle, &a.component)),
                });
                rebase(oracle, rebuilt)
            }
            QualifiedType::Executable(e) => QualifiedType::Executable(self.apply_executable(oracle, e)),
            QualifiedType::Primitive(_) | QualifiedType::Other(_) => ty.clone(),
        }
    }

    /// Substitute into a signature. Type variables of the executable that
    /// this substitution replaces are no longer free and are dropped.
    pub fn apply_executable(
        &self,
        oracle: &dyn BaseTypeOracle,
        exe: &QualifiedExecutableType<Q>,
    ) -> QualifiedExecutableType<Q> {
        QualifiedExecutableType {
            element: exe.element,
            return_type: Box::new(self.apply(oracle, &exe.return_type)),
            parameter_types: exe.parameter_types.iter().map(|p| self.apply(oracle, p)).collect(),
            receiver_type: exe
                .receiver_type
                .as_ref()
                .map(|r| Box::new(self.apply(oracle, r))),
            type_variables: exe
                .type_variables
                .iter()
                .filter(|v| !self.map.contains_key(&v.param))
                .cloned()
                .collect(),
        }
    }
}

fn impose<Q: Qualifier>(replacement: QualifiedType<Q>, qualifier: &Q) -> QualifiedType<Q> {
    match replacement {
        QualifiedType::TypeVariable(v) => QualifiedType::TypeVariable(QualifiedTypeVariable {
            qualifier: qualifier.clone(),
            explicit: true,
            ..v
        }),
        other => other.with_qualifier(qualifier.clone()),
    }
}

fn rebase<Q: Qualifier>(oracle: &dyn BaseTypeOracle, ty: QualifiedType<Q>) -> QualifiedType<Q> {
    let Some(base) = rebuild_base(oracle, &ty) else {
        return ty;
    };
    match ty {
        QualifiedType::Declared(d) => QualifiedType::Declared(QualifiedDeclaredType { base, ..d }),
        QualifiedType::Array(a) => QualifiedType::Array(QualifiedArrayType { base, ..a }),
        other => other,
    }
}
