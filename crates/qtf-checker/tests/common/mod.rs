//! A tainting checker: `Untainted <: PolyTainted <: Tainted`.
#![allow(dead_code)]

use qtf_model::Program;
use qtf_solver::{
    DefaultQualifiedTypeFactory, DefaultTable, LatticeBuilder, QualifierHierarchy, TypeUseLocation,
};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Taint {
    Untainted,
    PolyTainted,
    Tainted,
}

pub fn taint_lattice() -> QualifierHierarchy<Taint> {
    LatticeBuilder::chain([Taint::Untainted, Taint::PolyTainted, Taint::Tainted])
        .build()
        .expect("taint lattice")
}

/// Everything is tainted except literals.
pub fn taint_defaults() -> DefaultTable<Taint> {
    DefaultTable::new(Taint::Tainted)
        .with(TypeUseLocation::Literal, Taint::Untainted)
        .with(TypeUseLocation::LowerBound, Taint::Untainted)
}

pub fn taint_factory(program: Program<Taint>) -> DefaultQualifiedTypeFactory<Taint> {
    DefaultQualifiedTypeFactory::new(
        Arc::new(program),
        Arc::new(taint_lattice()),
        taint_defaults(),
    )
}
