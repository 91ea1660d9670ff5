//! Message templates for checker diagnostics.
//!
//! Placeholders are filled by [`qtf_common::diagnostics::format_message`].

pub const ASSIGNMENT_INCOMPATIBLE: &str =
    "incompatible types in assignment to {0}: found {1}, required {2}";
pub const ARGUMENT_INCOMPATIBLE: &str =
    "incompatible types in argument {0} of {1}: found {2}, required {3}";
pub const RECEIVER_INCOMPATIBLE: &str = "incompatible receiver of {0}: found {1}, required {2}";
pub const RETURN_INCOMPATIBLE: &str =
    "incompatible types in return from {0}: found {1}, required {2}";
pub const OVERRIDE_INVALID: &str = "{0} cannot override {1}: found {2}, required {3}";
pub const TYPE_ARGUMENT_INCOMPATIBLE: &str =
    "type argument {0} of {1} is not within its bounds: found {2}, required {3} <: _ <: {4}";
pub const INFERENCE_FAILED: &str = "cannot infer type arguments: {0}";

pub const OVERRIDDEN_HERE: &str = "overridden method declared here";
pub const DECLARED_HERE: &str = "target declared here";
