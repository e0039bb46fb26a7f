//! Emission driver: lowering pass plus printing for one unit.

use crate::error::LowerResult;
use crate::lowering_pass::LoweringPass;
use crate::options::EmitOptions;
use crate::transform_context::LoweringContext;
use crate::transforms::ir_printer::IRPrinter;
use esdown_ast::SourceUnit;
use esdown_common::Diagnostic;
use serde::Serialize;
use tracing::{debug, instrument};

/// Result of emitting one unit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmitOutput {
    /// ES5 source text.
    pub code: String,
    /// Helpers the code imports, in first-use order.
    pub helpers: Vec<String>,
    /// One entry per skipped top-level declaration.
    pub diagnostics: Vec<Diagnostic>,
}

/// Lower and print `unit` with an existing context.
///
/// Output order is helper imports, then the unit-level prologue (captures
/// and hoisted temporaries), then the declarations in source order.
#[instrument(level = "debug", skip_all, fields(file = %unit.file_name, statements = unit.statements.len()))]
pub fn emit(unit: &SourceUnit, ctx: &mut LoweringContext) -> LowerResult<EmitOutput> {
    let nodes = LoweringPass::new(ctx).run(unit)?;

    let mut printer = IRPrinter::with_options(ctx.options.printer.clone());
    printer.emit_statements(&nodes);
    let code = printer.finish();

    let helpers: Vec<String> = ctx
        .helpers
        .required_helpers()
        .into_iter()
        .map(str::to_string)
        .collect();
    let diagnostics = ctx.take_diagnostics();
    debug!(
        bytes = code.len(),
        helpers = helpers.len(),
        diagnostics = diagnostics.len(),
        "unit emitted"
    );
    Ok(EmitOutput {
        code,
        helpers,
        diagnostics,
    })
}

/// Lower and print `unit` in a fresh context.
pub fn emit_with_options(unit: &SourceUnit, options: EmitOptions) -> LowerResult<EmitOutput> {
    let mut ctx = LoweringContext::new(unit, options);
    emit(unit, &mut ctx)
}
