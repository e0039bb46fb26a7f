//! esdown: down-levels modern JavaScript/TypeScript syntax trees to ES5.
//!
//! The work happens in the member crates:
//! - `esdown-common`: spans, diagnostics, limits
//! - `esdown-ast`: the input syntax tree and its JSON form
//! - `esdown-emitter`: lowering rules, state-machine lowering and printing
//!
//! This crate is the facade: it compiles one unit or a batch of independent
//! units, reads units from JSON and configures tracing output.

pub mod tracing_config;

pub use esdown_ast as ast;
pub use esdown_common::{Diagnostic, DiagnosticCategory, Span};
pub use esdown_emitter::{
    EmitOptions, EmitOutput, ErrorKind, HelperImportStyle, LowerError, LowerResult,
    PrinterOptions,
};

use esdown_ast::SourceUnit;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info_span, warn};

/// Failure to compile a unit given as JSON.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid syntax tree JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Lower(#[from] LowerError),
}

/// Lower and print one unit.
///
/// Unsupported top-level declarations are skipped and reported in
/// `EmitOutput::diagnostics`; only internal and helper errors fail the unit.
pub fn compile_unit(unit: &SourceUnit, options: &EmitOptions) -> LowerResult<EmitOutput> {
    let _span = info_span!("compile_unit", file = %unit.file_name).entered();
    esdown_emitter::emit_with_options(unit, options.clone())
}

/// Compile independent units in parallel. Results keep the input order and a
/// failing unit does not stop the others.
pub fn compile_batch(units: &[SourceUnit], options: &EmitOptions) -> Vec<LowerResult<EmitOutput>> {
    debug!(units = units.len(), "compiling batch");
    units
        .par_iter()
        .map(|unit| {
            let result = compile_unit(unit, options);
            if let Err(err) = &result {
                warn!(file = %unit.file_name, kind = ?err.kind(), %err, "unit failed");
            }
            result
        })
        .collect()
}

/// Read a `SourceUnit` from its JSON form.
pub fn parse_unit_json(text: &str) -> Result<SourceUnit, serde_json::Error> {
    serde_json::from_str(text)
}

/// Read a JSON array of units.
pub fn parse_units_json(text: &str) -> Result<Vec<SourceUnit>, serde_json::Error> {
    serde_json::from_str(text)
}

/// `parse_unit_json` followed by `compile_unit`.
pub fn compile_json(text: &str, options: &EmitOptions) -> Result<EmitOutput, CompileError> {
    let unit = parse_unit_json(text)?;
    Ok(compile_unit(&unit, options)?)
}
