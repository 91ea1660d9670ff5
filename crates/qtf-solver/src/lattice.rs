//! Qualifier lattice.
//!
//! A checker declares its qualifiers and the direct `sub < sup` edges between
//! them. [`LatticeBuilder::build`] closes the edges reflexively and
//! transitively (one bitset row per qualifier), validates the result as a
//! bounded partial order and tabulates joins and meets. After construction
//! the hierarchy is immutable and freely shareable between threads.
//!
//! ```text
//!        TOP
//!       /   \
//!      A     B        join(A, B) = TOP
//!       \   /         meet(A, B) = BOTTOM
//!       BOTTOM
//! ```

use crate::errors::LatticeError;
use fixedbitset::FixedBitSet;
use indexmap::IndexSet;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{debug, trace};

/// Value type usable as a qualifier.
///
/// Any plain enum deriving the usual traits qualifies.
pub trait Qualifier: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> Qualifier for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

pub(crate) fn render<Q: Debug>(q: &Q) -> String {
    format!("{q:?}")
}

/// Declarative description of a qualifier lattice.
#[derive(Clone, Debug)]
pub struct LatticeBuilder<Q> {
    qualifiers: Vec<Q>,
    edges: Vec<(Q, Q)>,
    tops: Vec<Q>,
    bottoms: Vec<Q>,
    require_complete: bool,
}

impl<Q: Qualifier> Default for LatticeBuilder<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q: Qualifier> LatticeBuilder<Q> {
    pub fn new() -> Self {
        LatticeBuilder {
            qualifiers: Vec::new(),
            edges: Vec::new(),
            tops: Vec::new(),
            bottoms: Vec::new(),
            require_complete: false,
        }
    }

    /// A totally ordered lattice, listed from bottom to top.
    pub fn chain(qualifiers: impl IntoIterator<Item = Q>) -> Self {
        let qualifiers: Vec<Q> = qualifiers.into_iter().collect();
        let mut builder = Self::new().qualifiers(qualifiers.iter().cloned());
        for pair in qualifiers.windows(2) {
            builder = builder.edge(pair[0].clone(), pair[1].clone());
        }
        builder
    }

    pub fn qualifier(mut self, q: Q) -> Self {
        self.qualifiers.push(q);
        self
    }

    pub fn qualifiers(mut self, qs: impl IntoIterator<Item = Q>) -> Self {
        self.qualifiers.extend(qs);
        self
    }

    /// Declare `sub` a direct subtype of `sup`.
    pub fn edge(mut self, sub: Q, sup: Q) -> Self {
        self.edges.push((sub, sup));
        self
    }

    /// Declare the top qualifier instead of deriving it from the edges.
    pub fn top(mut self, q: Q) -> Self {
        self.tops.push(q);
        self
    }

    pub fn bottom(mut self, q: Q) -> Self {
        self.bottoms.push(q);
        self
    }

    /// Reject the lattice at construction if any pair lacks a join or meet.
    ///
    /// Without this, such pairs are only reported when a join or meet is
    /// actually requested.
    pub fn require_complete(mut self, yes: bool) -> Self {
        self.require_complete = yes;
        self
    }

    pub fn build(self) -> Result<QualifierHierarchy<Q>, LatticeError> {
        if self.qualifiers.is_empty() {
            return Err(LatticeError::Empty);
        }
        let mut qualifiers = IndexSet::with_capacity(self.qualifiers.len());
        for q in self.qualifiers {
            let rendered = render(&q);
            if !qualifiers.insert(q) {
                return Err(LatticeError::DuplicateQualifier(rendered));
            }
        }
        let n = qualifiers.len();
        let index = |q: &Q| {
            qualifiers
                .get_index_of(q)
                .ok_or_else(|| LatticeError::UnknownQualifier(render(q)))
        };

        // above[i] = { j | i <: j }
        let mut above: Vec<FixedBitSet> = (0..n)
            .map(|i| {
                let mut row = FixedBitSet::with_capacity(n);
                row.insert(i);
                row
            })
            .collect();
        for (sub, sup) in &self.edges {
            let (i, j) = (index(sub)?, index(sup)?);
            above[i].insert(j);
        }
        for k in 0..n {
            let row_k = above[k].clone();
            for row in above.iter_mut() {
                if row.contains(k) {
                    row.union_with(&row_k);
                }
            }
        }
        for i in 0..n {
            for j in above[i].ones() {
                if j != i && above[j].contains(i) {
                    return Err(LatticeError::Cycle(
                        render(&qualifiers[i]),
                        render(&qualifiers[j]),
                    ));
                }
            }
        }

        let mut below: Vec<FixedBitSet> = (0..n).map(|_| FixedBitSet::with_capacity(n)).collect();
        for (i, row) in above.iter().enumerate() {
            for j in row.ones() {
                below[j].insert(i);
            }
        }

        let top = Self::extreme(&qualifiers, &above, &self.tops, true)?;
        let bottom = Self::extreme(&qualifiers, &below, &self.bottoms, false)?;

        let mut hierarchy = QualifierHierarchy {
            qualifiers,
            above,
            below,
            joins: Vec::new(),
            meets: Vec::new(),
            top,
            bottom,
        };
        hierarchy.tabulate();

        if self.require_complete {
            for i in 0..n {
                for j in i + 1..n {
                    if hierarchy.joins[i * n + j].is_none() {
                        return Err(LatticeError::NoLeastUpperBound(
                            render(&hierarchy.qualifiers[i]),
                            render(&hierarchy.qualifiers[j]),
                        ));
                    }
                    if hierarchy.meets[i * n + j].is_none() {
                        return Err(LatticeError::NoGreatestLowerBound(
                            render(&hierarchy.qualifiers[i]),
                            render(&hierarchy.qualifiers[j]),
                        ));
                    }
                }
            }
        }

        debug!(
            qualifiers = n,
            top = ?hierarchy.top(),
            bottom = ?hierarchy.bottom(),
            "built qualifier lattice"
        );
        Ok(hierarchy)
    }

    /// Find the top (`upward`) or bottom element.
    ///
    /// `reach[i]` is the set of elements on the `upward` side of `i`; the
    /// extreme element is the one every element reaches.
    fn extreme(
        qualifiers: &IndexSet<Q>,
        reach: &[FixedBitSet],
        declared: &[Q],
        upward: bool,
    ) -> Result<usize, LatticeError> {
        let n = qualifiers.len();
        let mut declared_index = None;
        for q in declared {
            let i = qualifiers
                .get_index_of(q)
                .ok_or_else(|| LatticeError::UnknownQualifier(render(q)))?;
            match declared_index {
                Some(prev) if prev != i => {
                    let (a, b) = (render(&qualifiers[prev]), render(q));
                    return Err(if upward {
                        LatticeError::ConflictingTop(a, b)
                    } else {
                        LatticeError::ConflictingBottom(a, b)
                    });
                }
                _ => declared_index = Some(i),
            }
        }

        if let Some(i) = declared_index {
            if let Some(other) = (0..n).find(|&j| !reach[j].contains(i)) {
                let (extreme, other) = (render(&qualifiers[i]), render(&qualifiers[other]));
                return Err(if upward {
                    LatticeError::NotTop { top: extreme, other }
                } else {
                    LatticeError::NotBottom {
                        bottom: extreme,
                        other,
                    }
                });
            }
            return Ok(i);
        }

        // Maximal (or minimal) elements reach nothing but themselves.
        let extremes: Vec<usize> = (0..n).filter(|&i| reach[i].count_ones(..) == 1).collect();
        match extremes.as_slice() {
            [only] => Ok(*only),
            _ => {
                let names = extremes.iter().map(|&i| render(&qualifiers[i])).collect();
                Err(if upward {
                    LatticeError::MultipleTops(names)
                } else {
                    LatticeError::MultipleBottoms(names)
                })
            }
        }
    }
}

/// An immutable bounded partial order over `Q`.
#[derive(Clone, Debug)]
pub struct QualifierHierarchy<Q> {
    qualifiers: IndexSet<Q>,
    above: Vec<FixedBitSet>,
    below: Vec<FixedBitSet>,
    joins: Vec<Option<u32>>,
    meets: Vec<Option<u32>>,
    top: usize,
    bottom: usize,
}

impl<Q: Qualifier> QualifierHierarchy<Q> {
    fn tabulate(&mut self) {
        let n = self.qualifiers.len();
        self.joins = vec![None; n * n];
        self.meets = vec![None; n * n];
        for i in 0..n {
            for j in i..n {
                let join = Self::least(&self.above, &self.below, i, j);
                let meet = Self::least(&self.below, &self.above, i, j);
                self.joins[i * n + j] = join;
                self.joins[j * n + i] = join;
                self.meets[i * n + j] = meet;
                self.meets[j * n + i] = meet;
            }
        }
    }

    /// The element of `up[i] ∩ up[j]` that is below every other element of
    /// the intersection, if there is one.
    fn least(up: &[FixedBitSet], down: &[FixedBitSet], i: usize, j: usize) -> Option<u32> {
        let mut common = up[i].clone();
        common.intersect_with(&up[j]);
        common
            .ones()
            .find(|&u| common.is_subset(&up[u]))
            .map(|u| {
                debug_assert!(down[u].contains(i) && down[u].contains(j));
                u as u32
            })
    }

    pub fn top(&self) -> &Q {
        &self.qualifiers[self.top]
    }

    pub fn bottom(&self) -> &Q {
        &self.qualifiers[self.bottom]
    }

    pub fn len(&self) -> usize {
        self.qualifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qualifiers.is_empty()
    }

    pub fn contains(&self, q: &Q) -> bool {
        self.qualifiers.contains(q)
    }

    /// Qualifiers in declaration order.
    pub fn qualifiers(&self) -> impl Iterator<Item = &Q> {
        self.qualifiers.iter()
    }

    pub fn index_of(&self, q: &Q) -> Option<usize> {
        self.qualifiers.get_index_of(q)
    }

    pub fn qualifier_at(&self, index: usize) -> Option<&Q> {
        self.qualifiers.get_index(index)
    }

    fn require(&self, q: &Q) -> Result<usize, LatticeError> {
        self.index_of(q)
            .ok_or_else(|| LatticeError::UnknownQualifier(render(q)))
    }

    /// Lattice subtyping. Qualifiers outside the lattice are unrelated to
    /// everything, including themselves.
    pub fn is_subtype(&self, sub: &Q, sup: &Q) -> bool {
        match (self.index_of(sub), self.index_of(sup)) {
            (Some(i), Some(j)) => self.above[i].contains(j),
            _ => {
                trace!(?sub, ?sup, "qualifier outside the lattice");
                false
            }
        }
    }

    pub fn join(&self, a: &Q, b: &Q) -> Result<Q, LatticeError> {
        let (i, j) = (self.require(a)?, self.require(b)?);
        self.joins[i * self.len() + j]
            .map(|k| self.qualifiers[k as usize].clone())
            .ok_or_else(|| LatticeError::NoLeastUpperBound(render(a), render(b)))
    }

    pub fn meet(&self, a: &Q, b: &Q) -> Result<Q, LatticeError> {
        let (i, j) = (self.require(a)?, self.require(b)?);
        self.meets[i * self.len() + j]
            .map(|k| self.qualifiers[k as usize].clone())
            .ok_or_else(|| LatticeError::NoGreatestLowerBound(render(a), render(b)))
    }

    /// Join of a set of qualifiers; the bottom for an empty set.
    ///
    /// Computed over the whole set at once, so `{A, B, TOP}` has a join even
    /// when `{A, B}` does not.
    pub fn least_upper_bound<'q>(
        &self,
        qualifiers: impl IntoIterator<Item = &'q Q>,
    ) -> Result<Q, LatticeError> {
        self.bound_of_set(qualifiers, true)
    }

    /// Meet of a set of qualifiers; the top for an empty set.
    pub fn greatest_lower_bound<'q>(
        &self,
        qualifiers: impl IntoIterator<Item = &'q Q>,
    ) -> Result<Q, LatticeError> {
        self.bound_of_set(qualifiers, false)
    }

    fn bound_of_set<'q>(
        &self,
        qualifiers: impl IntoIterator<Item = &'q Q>,
        upward: bool,
    ) -> Result<Q, LatticeError> {
        let (up, extreme) = if upward {
            (&self.above, self.bottom)
        } else {
            (&self.below, self.top)
        };
        let mut members = Vec::new();
        let mut common: Option<FixedBitSet> = None;
        for q in qualifiers {
            let i = self.require(q)?;
            members.push(i);
            match common.as_mut() {
                Some(set) => set.intersect_with(&up[i]),
                None => common = Some(up[i].clone()),
            }
        }
        let Some(common) = common else {
            return Ok(self.qualifiers[extreme].clone());
        };
        if let Some(u) = common.ones().find(|&u| common.is_subset(&up[u])) {
            return Ok(self.qualifiers[u].clone());
        }
        let first = render(&self.qualifiers[members[0]]);
        let rest = members[1..]
            .iter()
            .map(|&i| render(&self.qualifiers[i]))
            .collect::<Vec<_>>()
            .join(", ");
        Err(if upward {
            LatticeError::NoLeastUpperBound(first, rest)
        } else {
            LatticeError::NoGreatestLowerBound(first, rest)
        })
    }
}

#[cfg(test)]
#[path = "../tests/lattice_tests.rs"]
mod tests;
