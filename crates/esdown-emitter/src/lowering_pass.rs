//! Lowering Pass - walks a unit's top-level declarations
//!
//! Each top-level statement is lowered independently against the shared
//! [`LoweringContext`]. When a rule reports an unsupported construct, the
//! context is rolled back to the state before that statement, a diagnostic is
//! recorded, and the statement is dropped from the output:
//!
//! ```typescript
//! class A {}
//! with (obj) { f(); }   // skipped, diagnostic 9001
//! namespace N { ... }
//! ```
//!
//! Internal invariant violations and helper resolution failures are bugs in a
//! rule, so they abort the whole unit instead.

use crate::error::{ErrorKind, LowerError, LowerResult};
use crate::transform_context::LoweringContext;
use crate::transforms::ast_to_ir::{AstToIr, push_flat, stmt_span};
use crate::transforms::ir::IRNode;
use esdown_ast::{SourceUnit, Stmt};
use tracing::debug;

/// Lowers one unit into printable IR.
pub struct LoweringPass<'a> {
    ctx: &'a mut LoweringContext,
}

impl<'a> LoweringPass<'a> {
    pub fn new(ctx: &'a mut LoweringContext) -> Self {
        LoweringPass { ctx }
    }

    /// Lower every top-level statement, in source order, then prepend helper
    /// imports and the unit-level prologue.
    pub fn run(&mut self, unit: &SourceUnit) -> LowerResult<Vec<IRNode>> {
        let mut body = Vec::with_capacity(unit.statements.len());
        for stmt in &unit.statements {
            if let Some(node) = self.lower_top_level(stmt)? {
                push_flat(&mut body, node);
            }
        }

        let mut out = self.ctx.helpers.import_statements(&self.ctx.options);
        let unit_scope = self.ctx.unit_scope().clone();
        out.extend(self.ctx.capture_prologue(&unit_scope));
        if !unit_scope.hoisted.is_empty() {
            out.push(IRNode::var_names(unit_scope.hoisted.iter().cloned()));
        }
        out.extend(body);
        Ok(out)
    }

    fn lower_top_level(&mut self, stmt: &Stmt) -> LowerResult<Option<IRNode>> {
        let checkpoint = self.ctx.checkpoint();
        let result = AstToIr::new(self.ctx).lower_stmt(stmt);
        match result {
            Ok(node) => Ok(Some(node)),
            Err(err) if err.kind() == ErrorKind::Unsupported => {
                self.ctx.rollback(checkpoint);
                self.skip(stmt, &err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn skip(&mut self, stmt: &Stmt, err: &LowerError) {
        let span = stmt_span(stmt);
        debug!(
            file = %self.ctx.file_name,
            pos = span.pos,
            error = %err,
            "skipping top-level declaration"
        );
        if let Some(diagnostic) = err.to_diagnostic(&self.ctx.file_name) {
            self.ctx.add_diagnostic(diagnostic);
        }
    }
}
