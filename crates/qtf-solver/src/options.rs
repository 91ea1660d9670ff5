//! Engine configuration.
//!
//! The policies the core leaves to the checker: how type arguments are
//! compared, how qualifiers travel along inheritance edges and what an
//! unconstrained type parameter defaults to.
//!
//! ```json
//! {
//!   "default_variance": "invariant",
//!   "parameter_contravariance": false,
//!   "array_covariance": true,
//!   "supertype_qualifiers": "same_as_subtype",
//!   "uninferred_qualifier": "top",
//!   "max_subtype_depth": 256
//! }
//! ```
//!
//! Every field is optional in JSON; missing fields take the defaults above.

use crate::errors::QualError;
use qtf_common::limits::MAX_SUBTYPE_DEPTH;
use qtf_model::Variance;
use serde::{Deserialize, Serialize};

/// Variance used for type parameters that declare none.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariancePolicy {
    Covariant,
    Contravariant,
    #[default]
    Invariant,
    Bivariant,
}

impl VariancePolicy {
    pub fn flags(self) -> Variance {
        match self {
            VariancePolicy::Covariant => Variance::COVARIANT,
            VariancePolicy::Contravariant => Variance::CONTRAVARIANT,
            VariancePolicy::Invariant => Variance::INVARIANT,
            VariancePolicy::Bivariant => Variance::BIVARIANT,
        }
    }
}

/// Primary qualifier given to an unannotated supertype.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupertypePolicy {
    /// The supertype keeps the subtype's qualifier.
    #[default]
    SameAsSubtype,
    /// The supertype is qualified with the lattice top.
    Top,
}

/// Qualifier of a type parameter no argument constrains.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UninferredPolicy {
    #[default]
    Top,
    Bottom,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineOptions {
    pub default_variance: VariancePolicy,
    /// Compare overriding parameter types contravariantly instead of
    /// requiring equivalence.
    pub parameter_contravariance: bool,
    /// Compare array components covariantly, as the base language does.
    ///
    /// This admits the classic unsound store through a covariant array
    /// alias; the engine accepts that as a known limitation.
    pub array_covariance: bool,
    pub supertype_qualifiers: SupertypePolicy,
    pub uninferred_qualifier: UninferredPolicy,
    /// Nesting depth at which a subtype query gives up and answers `false`.
    pub max_subtype_depth: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            default_variance: VariancePolicy::Invariant,
            parameter_contravariance: false,
            array_covariance: true,
            supertype_qualifiers: SupertypePolicy::SameAsSubtype,
            uninferred_qualifier: UninferredPolicy::Top,
            max_subtype_depth: MAX_SUBTYPE_DEPTH,
        }
    }
}

impl EngineOptions {
    pub fn from_json(text: &str) -> Result<Self, QualError> {
        serde_json::from_str(text).map_err(|e| QualError::InvalidOptions(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, QualError> {
        serde_json::to_string_pretty(self).map_err(|e| QualError::InvalidOptions(e.to_string()))
    }
}
