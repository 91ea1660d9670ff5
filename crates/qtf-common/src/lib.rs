//! Common types and utilities for the qtf qualifier engine.
//!
//! This crate provides foundational pieces used across all qtf crates:
//! - Engine limits and thresholds
//! - Diagnostic records and the collector used by checking sessions
//! - Tracing subscriber configuration

// Centralized limits and thresholds
pub mod limits;

// Diagnostics reported against the checked program
pub mod diagnostics;
pub use diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticCollector, DiagnosticRelatedInformation,
    SourceLocation,
};

// Tracing subscriber setup (QTF_LOG / QTF_LOG_TREE)
pub mod tracing_config;
pub use tracing_config::init_tracing;
