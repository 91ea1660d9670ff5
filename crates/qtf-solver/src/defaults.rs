//! Qualifiers for unannotated positions.
//!
//! The factory resolves every unannotated position in this order:
//!
//! 1. an explicit annotation on the written type
//! 2. the member default of the enclosing class (not for type variable uses
//!    or bounds)
//! 3. the declared qualifier of the class a declared type names
//! 4. [`QualifierDefaults::default_qualifier`] for the position's location
//!
//! Only step 4 is checker-supplied; [`DefaultTable`] is the usual choice.

use qtf_model::BaseTypeId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Syntactic position of a type use, as seen by defaulting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeUseLocation {
    Field,
    Parameter,
    Local,
    Return,
    Receiver,
    TypeArgument,
    ArrayComponent,
    UpperBound,
    LowerBound,
    Literal,
    Expression,
    ClassDeclaration,
    Supertype,
    Other,
}

pub trait QualifierDefaults<Q>: Send + Sync {
    /// Qualifier for an unannotated type use of `base` at `location`.
    fn default_qualifier(&self, location: TypeUseLocation, base: BaseTypeId) -> Q;
}

/// Per-location defaults with a fallback.
#[derive(Clone, Debug)]
pub struct DefaultTable<Q> {
    table: FxHashMap<TypeUseLocation, Q>,
    fallback: Q,
}

impl<Q: Clone> DefaultTable<Q> {
    pub fn new(fallback: Q) -> Self {
        DefaultTable {
            table: FxHashMap::default(),
            fallback,
        }
    }

    pub fn with(mut self, location: TypeUseLocation, qualifier: Q) -> Self {
        self.table.insert(location, qualifier);
        self
    }

    pub fn get(&self, location: TypeUseLocation) -> &Q {
        self.table.get(&location).unwrap_or(&self.fallback)
    }
}

impl<Q: Clone + Send + Sync> QualifierDefaults<Q> for DefaultTable<Q> {
    fn default_qualifier(&self, location: TypeUseLocation, _base: BaseTypeId) -> Q {
        self.get(location).clone()
    }
}
