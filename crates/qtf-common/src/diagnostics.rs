//! Diagnostics reported against the program being checked.
//!
//! Only findings about the checked program end up here (incompatible
//! assignments, failed call-site inference, ...). Broken checker definitions
//! are errors of the engine itself and never become diagnostics.

use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Message,
}

/// Stable diagnostic keys emitted by checking sessions.
pub mod codes {
    pub const ASSIGNMENT_INCOMPATIBLE: &str = "assignment.type.incompatible";
    pub const ARGUMENT_INCOMPATIBLE: &str = "argument.type.incompatible";
    pub const RECEIVER_INCOMPATIBLE: &str = "receiver.type.incompatible";
    pub const RETURN_INCOMPATIBLE: &str = "return.type.incompatible";
    pub const OVERRIDE_INVALID: &str = "override.invalid";
    pub const TYPE_ARGUMENT_INCOMPATIBLE: &str = "type.argument.type.incompatible";
    pub const INFERENCE_FAILED: &str = "type.argument.inference.failed";
}

/// Where in the checked program a diagnostic points.
///
/// The engine does not own source text, so a location is the description the
/// host gave the node (usually a path plus the node's index).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub node: String,
}

impl SourceLocation {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.node)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRelatedInformation {
    pub location: SourceLocation,
    pub message_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: &'static str,
    pub location: SourceLocation,
    pub message_text: String,
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    pub fn error(location: SourceLocation, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            code,
            location,
            message_text: message.into(),
            related_information: Vec::new(),
        }
    }

    pub fn warning(
        location: SourceLocation,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category: DiagnosticCategory::Warning,
            ..Self::error(location, code, message)
        }
    }

    pub fn with_related(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            location,
            message_text: message.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let category = match self.category {
            DiagnosticCategory::Warning => "warning",
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Message => "message",
        };
        write!(
            f,
            "{}: {category}: ({}) {}",
            self.location, self.code, self.message_text
        )
    }
}

/// Substitute `{0}`, `{1}`, ... placeholders in a message template.
pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

/// Accumulates diagnostics for one checking session.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Get the collected diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take the collected diagnostics.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

#[cfg(test)]
#[path = "../tests/diagnostics_tests.rs"]
mod tests;
