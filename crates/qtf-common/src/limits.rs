//! Centralized limits and thresholds for the qualifier engine.
//!
//! Structural recursion over qualified types is bounded by the depth of the
//! base type, which is finite for every well-formed program. The limits here
//! only guard the cases where the recursion goes through type-variable
//! bounds, which can be self-referential (`T extends Comparable<T>`).

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum nesting depth for a single subtype query.
///
/// Each step into a type argument, array component, executable parameter or
/// type-variable bound adds one level. When the limit is hit the query answers
/// "not a subtype" and logs a warning; it never loops.
///
/// ```text
/// // F-bounded variables re-enter their own bound on every comparison:
/// <T extends Comparable<T>> ... T <: Comparable<T> <: ...
/// ```
pub const MAX_SUBTYPE_DEPTH: u32 = 256;

/// Maximum number of supertypes visited while searching for a view of a
/// declared type as one of its ancestors (`as_super`).
pub const MAX_SUPERTYPE_SEARCH: usize = 4096;

/// Maximum length of a chain of type variables bounded by type variables
/// (`T extends S`, `S extends U`, ...) followed when defaulting a qualifier.
pub const MAX_BOUND_CHAIN: u32 = 64;

// =============================================================================
// Stack growth
// =============================================================================

/// Remaining stack below which recursive engine code grows the stack.
pub const STACK_RED_ZONE: usize = 32 * 1024;

/// Size of each newly allocated stack segment.
pub const STACK_GROWTH: usize = 2 * 1024 * 1024;
