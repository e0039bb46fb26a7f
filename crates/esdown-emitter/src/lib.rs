//! ES5 lowering and emission for the esdown compiler.
//!
//! This crate takes an `esdown_ast::SourceUnit` and produces ES5 source text:
//! - Helper Library Registry (`transforms::helpers`)
//! - Lowering Context (`transform_context`)
//! - Lowering rules for classes, namespaces, spread, arrows, async functions
//!   and generators (`transforms`)
//! - Statement-to-state-machine lowering (`transforms::state_machine`)
//! - The lowered IR and its printer (`transforms::ir`, `transforms::ir_printer`)
//! - The emission driver (`lowering_pass`, `emit`)

// Error types for lowering rules and the driver
pub mod error;
pub use error::{ErrorKind, HelperError, InvariantViolation, LowerError, LowerResult};

// Emission options (JSON-loadable)
pub mod options;
pub use options::{EmitOptions, HelperImportStyle};

// Per-unit lowering state
pub mod transform_context;
pub use transform_context::{Checkpoint, ClassFrame, FunctionScope, LoweringContext};

// Lowering rules, IR and printer
pub mod transforms;
pub use transforms::ir_printer::{IRPrinter, PrinterOptions};
pub use transforms::state_machine::{Case, Exit, StateMachine, TryRegion};

// Top-level declaration walk
pub mod lowering_pass;
pub use lowering_pass::LoweringPass;

// Emission driver
pub mod emit;
pub use emit::{EmitOutput, emit, emit_with_options};
