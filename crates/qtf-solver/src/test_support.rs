//! Fixtures shared by the unit tests.

use crate::defaults::{DefaultTable, TypeUseLocation};
use crate::factory::DefaultQualifiedTypeFactory;
use crate::lattice::{LatticeBuilder, QualifierHierarchy};
use qtf_model::Program;
use std::sync::Arc;

/// `Bottom < Mid < Top`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Level {
    Bottom,
    Mid,
    Top,
}

pub(crate) const LEVELS: [Level; 3] = [Level::Bottom, Level::Mid, Level::Top];

pub(crate) fn levels() -> QualifierHierarchy<Level> {
    LatticeBuilder::chain(LEVELS).build().unwrap()
}

/// `Bottom < A, B < C, D < Top`: `{A, B}` has two minimal upper bounds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Poset {
    Bottom,
    A,
    B,
    C,
    D,
    Top,
}

pub(crate) const POSET: [Poset; 6] = [Poset::Bottom, Poset::A, Poset::B, Poset::C, Poset::D, Poset::Top];

pub(crate) fn poset() -> QualifierHierarchy<Poset> {
    use Poset::*;
    LatticeBuilder::new()
        .qualifiers(POSET)
        .edge(Bottom, A)
        .edge(Bottom, B)
        .edge(A, C)
        .edge(A, D)
        .edge(B, C)
        .edge(B, D)
        .edge(C, Top)
        .edge(D, Top)
        .build()
        .unwrap()
}

/// Top everywhere except literals and lower bounds.
pub(crate) fn level_defaults() -> DefaultTable<Level> {
    DefaultTable::new(Level::Top)
        .with(TypeUseLocation::Literal, Level::Bottom)
        .with(TypeUseLocation::LowerBound, Level::Bottom)
}

pub(crate) fn level_factory(program: Program<Level>) -> DefaultQualifiedTypeFactory<Level> {
    DefaultQualifiedTypeFactory::new(Arc::new(program), Arc::new(levels()), level_defaults())
}

pub(crate) fn poset_factory(program: Program<Poset>) -> DefaultQualifiedTypeFactory<Poset> {
    let defaults = DefaultTable::new(Poset::Top)
        .with(TypeUseLocation::Literal, Poset::Bottom)
        .with(TypeUseLocation::LowerBound, Poset::Bottom);
    DefaultQualifiedTypeFactory::new(Arc::new(program), Arc::new(poset()), defaults)
}
