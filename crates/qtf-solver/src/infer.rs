//! Call-site qualifier inference using Union-Find.
//!
//! Each free type parameter of the called executable gets an inference
//! variable in an `ena` unification table. Walking every parameter type
//! against its argument type records, per variable:
//!
//! - **lower bounds**: qualifiers flowing into an unannotated use of the
//!   parameter (`T x` called with a `@MID` argument gives `MID <: T`)
//! - **candidates**: the argument types themselves, used to build the
//!   instantiated type argument
//!
//! A variable resolves to the least upper bound of its lower bounds. A set
//! without a join is a finding against the call site
//! ([`InferenceError::NoLeastUpperBound`]), never a silent fallback.
//! Parameters bounded by another parameter of the same executable
//! (`<S, T extends S>`) share one variable.

use crate::errors::{InferenceError, LatticeError, QualError};
use crate::lattice::{Qualifier, QualifierHierarchy, render};
use crate::type_hierarchy::SubtypeEnv;
use crate::types::QualifiedType;
use ena::unify::{InPlaceUnificationTable, NoError, UnifyKey, UnifyValue};
use qtf_common::SourceLocation;
use qtf_model::TypeParamId;
use tracing::{debug, trace};

/// An inference variable standing for the qualifier of one type parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InferenceVar(pub u32);

/// Resolved qualifier of a variable, as an index into the lattice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct InferenceValue(pub Option<u32>);

impl UnifyKey for InferenceVar {
    type Value = InferenceValue;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        InferenceVar(u)
    }

    fn tag() -> &'static str {
        "InferenceVar"
    }
}

impl UnifyValue for InferenceValue {
    type Error = NoError;

    fn unify_values(a: &Self, b: &Self) -> Result<Self, Self::Error> {
        match (a.0, b.0) {
            (None, None) => Ok(InferenceValue(None)),
            (Some(q), None) | (None, Some(q)) => Ok(InferenceValue(Some(q))),
            // Variables are only unified before resolution.
            (Some(q), Some(_)) => Ok(InferenceValue(Some(q))),
        }
    }
}

/// Constraints recorded for one inference variable.
#[derive(Clone, Debug)]
pub struct ConstraintSet<Q> {
    pub lower_bounds: Vec<Q>,
    pub candidates: Vec<QualifiedType<Q>>,
}

impl<Q> Default for ConstraintSet<Q> {
    fn default() -> Self {
        ConstraintSet {
            lower_bounds: Vec::new(),
            candidates: Vec::new(),
        }
    }
}

impl<Q: Qualifier> ConstraintSet<Q> {
    pub fn add_lower_bound(&mut self, q: Q) {
        if !self.lower_bounds.contains(&q) {
            self.lower_bounds.push(q);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lower_bounds.is_empty() && self.candidates.is_empty()
    }

    pub fn merge_from(&mut self, other: ConstraintSet<Q>) {
        for q in other.lower_bounds {
            self.add_lower_bound(q);
        }
        self.candidates.extend(other.candidates);
    }
}

/// Inference state for a single call site.
pub struct InferenceContext<'a, Q: Qualifier> {
    lattice: &'a QualifierHierarchy<Q>,
    location: SourceLocation,
    table: InPlaceUnificationTable<InferenceVar>,
    type_params: Vec<(TypeParamId, InferenceVar)>,
    constraints: Vec<ConstraintSet<Q>>,
}

impl<'a, Q: Qualifier> InferenceContext<'a, Q> {
    pub fn new(lattice: &'a QualifierHierarchy<Q>, location: SourceLocation) -> Self {
        InferenceContext {
            lattice,
            location,
            table: InPlaceUnificationTable::new(),
            type_params: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn fresh_type_param(&mut self, param: TypeParamId) -> InferenceVar {
        let var = self.table.new_key(InferenceValue(None));
        debug_assert_eq!(var.0 as usize, self.constraints.len());
        self.constraints.push(ConstraintSet::default());
        self.type_params.push((param, var));
        var
    }

    pub fn find_type_param(&self, param: TypeParamId) -> Option<InferenceVar> {
        self.type_params
            .iter()
            .find(|(p, _)| *p == param)
            .map(|(_, v)| *v)
    }

    pub fn unify_vars(&mut self, a: InferenceVar, b: InferenceVar) {
        let root_a = self.table.find(a);
        let root_b = self.table.find(b);
        if root_a == root_b {
            return;
        }
        // `InferenceValue` unification cannot fail.
        let _ = self.table.unify_var_var(root_a, root_b);
        let new_root = self.table.find(root_a);
        let mut merged = std::mem::take(&mut self.constraints[root_a.0 as usize]);
        merged.merge_from(std::mem::take(&mut self.constraints[root_b.0 as usize]));
        self.constraints[new_root.0 as usize] = merged;
    }

    pub fn add_lower_bound(&mut self, var: InferenceVar, q: Q) {
        let root = self.table.find(var);
        self.constraints[root.0 as usize].add_lower_bound(q);
    }

    pub fn add_candidate(&mut self, var: InferenceVar, ty: QualifiedType<Q>) {
        let root = self.table.find(var);
        self.constraints[root.0 as usize].candidates.push(ty);
    }

    pub fn constraints(&mut self, var: InferenceVar) -> &ConstraintSet<Q> {
        let root = self.table.find(var);
        &self.constraints[root.0 as usize]
    }

    pub fn probe(&mut self, var: InferenceVar) -> Option<Q> {
        self.table
            .probe_value(var)
            .0
            .and_then(|i| self.lattice.qualifier_at(i as usize).cloned())
    }

    /// Record the constraints implied by passing `actual` where `formal` is
    /// expected.
    pub fn collect(
        &mut self,
        env: &dyn SubtypeEnv<Q>,
        formal: &QualifiedType<Q>,
        actual: &QualifiedType<Q>,
    ) -> Result<(), QualError> {
        match formal {
            QualifiedType::TypeVariable(v) => {
                let Some(var) = self.find_type_param(v.param) else {
                    return Ok(());
                };
                // `@A T` fixes the qualifier at this position; only the
                // argument's structure says anything about `T`.
                if !v.explicit
                    && let Some(q) = actual.qualifier()
                {
                    trace!(var = var.0, qualifier = ?q, "lower bound");
                    self.add_lower_bound(var, q.clone());
                }
                self.add_candidate(var, actual.clone());
            }
            QualifiedType::Declared(f) if !f.type_arguments.is_empty() => {
                let Some(class) = env.oracle().class_of(f.base) else {
                    return Ok(());
                };
                if !matches!(
                    actual,
                    QualifiedType::Declared(_) | QualifiedType::Array(_) | QualifiedType::TypeVariable(_)
                ) {
                    return Ok(());
                }
                if let Some(QualifiedType::Declared(view)) = env.as_super(actual, class)?
                    && view.type_arguments.len() == f.type_arguments.len()
                {
                    for (fa, aa) in f.type_arguments.iter().zip(&view.type_arguments) {
                        self.collect(env, fa, aa)?;
                    }
                }
            }
            QualifiedType::Array(f) => {
                if let QualifiedType::Array(a) = actual {
                    self.collect(env, &f.component, &a.component)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Resolve `var` to the join of its lower bounds; `None` if nothing
    /// constrains it.
    pub fn resolve(&mut self, var: InferenceVar, param: &str) -> Result<Option<Q>, QualError> {
        let root = self.table.find(var);
        if let Some(q) = self.probe(root) {
            return Ok(Some(q));
        }
        let lower = &self.constraints[root.0 as usize].lower_bounds;
        if lower.is_empty() {
            return Ok(None);
        }
        let q = match self.lattice.least_upper_bound(lower.iter()) {
            Ok(q) => q,
            Err(LatticeError::NoLeastUpperBound(..)) => {
                return Err(self.failure(InferenceError::NoLeastUpperBound {
                    param: param.to_string(),
                    qualifiers: lower.iter().map(render).collect(),
                }));
            }
            Err(other) => return Err(other.into()),
        };
        debug!(param, qualifier = ?q, "resolved type parameter");
        if let Some(index) = self.lattice.index_of(&q) {
            self.table.union_value(root, InferenceValue(Some(index as u32)));
        }
        Ok(Some(q))
    }

    /// Wrap a finding with the call site it was made at.
    pub fn failure(&self, source: InferenceError) -> QualError {
        QualError::Inference {
            location: self.location.clone(),
            source,
        }
    }
}

#[cfg(test)]
#[path = "../tests/infer_tests.rs"]
mod tests;
