//! Common types and utilities for the esdown down-leveling compiler.
//!
//! This crate provides foundational types used across all esdown crates:
//! - Source spans (`Span`) attached to syntax nodes for diagnostics
//! - Diagnostics (`Diagnostic`, `DiagnosticCategory`, message catalog)
//! - Common enums (`NewLineKind`)
//! - Compiler limits and thresholds

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::Span;

// Diagnostics reported while lowering a unit
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory};

// Common types - Shared constants used by the printer and options
pub mod common;
pub use common::NewLineKind;

// Centralized limits and thresholds
pub mod limits;
