//! Qualifier checking on top of the qualified type factory.
//!
//! [`CheckSession`] is the piece a checker's traversal drives: one call per
//! assignment, call, return, override or generic type use. Incompatible
//! flows are collected as [`qtf_common::Diagnostic`]s under the stable codes
//! in [`qtf_common::diagnostics::codes`].
//!
//! ```text
//! let factory = Arc::new(DefaultQualifiedTypeFactory::new(program, lattice, defaults));
//! let mut session = CheckSession::new(factory);
//! session.check_assignment(local, value)?;
//! for d in session.take_diagnostics() { eprintln!("{d}"); }
//! ```

pub mod messages;
pub mod session;

pub use session::CheckSession;
