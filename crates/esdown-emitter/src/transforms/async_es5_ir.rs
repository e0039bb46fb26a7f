//! ES5 Async Function Transform (IR-based)
//!
//! Async functions and generators are compiled to a state machine driven by
//! `_ts_generator`. An async function additionally wraps the driver in
//! `_async_to_generator`, which resumes the machine as awaited promises
//! settle:
//!
//! ```typescript
//! async function foo() {
//!     const x = await bar();
//!     return x;
//! }
//! ```
//!
//! Becomes:
//!
//! ```javascript
//! function foo() {
//!     return _async_to_generator(function() {
//!         var x;
//!         return _ts_generator(this, function(_state) {
//!             switch(_state.label){
//!                 case 0:
//!                     return [4, bar()];
//!                 case 1:
//!                     x = _state.sent();
//!                     return [2, x];
//!             }
//!         });
//!     }).call(this);
//! }
//! ```
//!
//! A generator function returns the `_ts_generator(...)` object directly.
//! Async arrows invoke the wrapper with `()` since their `this` is already
//! resolved to the enclosing capture.

use super::ast_to_ir::AstToIr;
use super::ir::IRNode;
use crate::error::LowerResult;
use esdown_ast::{Param, Stmt};
use tracing::debug;

impl AstToIr<'_> {
    /// Body of an async function or generator, lowered inside its own
    /// function scope.
    pub(crate) fn lower_suspending_body(
        &mut self,
        params: &[Param],
        body: &[Stmt],
        is_async: bool,
    ) -> LowerResult<Vec<IRNode>> {
        let async_helper = if is_async {
            Some(self.ctx.require_helper("async_to_generator")?)
        } else {
            None
        };
        let generator = self.ctx.require_helper("ts_generator")?;

        let before = self.ctx.current_scope().hoisted.len();
        let machine = self.lower_to_state_machine(body, is_async)?;
        // Temporaries made while building the machine live next to its variables.
        let temps = self.ctx.current_scope_mut().hoisted.split_off(before);

        let mut vars: Vec<String> = Vec::with_capacity(machine.hoisted_vars.len() + temps.len());
        for name in machine.hoisted_vars.iter().chain(temps.iter()) {
            if params.iter().any(|p| &p.name == name) || vars.contains(name) {
                continue;
            }
            vars.push(name.clone());
        }
        debug!(
            cases = machine.cases.len(),
            vars = vars.len(),
            is_async,
            "lowered suspending body"
        );

        let mut inner = Vec::with_capacity(vars.len() + machine.hoisted_functions.len() + 1);
        if !vars.is_empty() {
            inner.push(IRNode::var_names(vars));
        }
        inner.extend(machine.hoisted_functions.iter().cloned());
        inner.push(IRNode::ret(Some(
            generator.call(vec![IRNode::this(), machine.render()])?,
        )));

        let Some(async_helper) = async_helper else {
            return Ok(inner);
        };
        let wrapped = async_helper.call(vec![IRNode::func_expr(None, Vec::new(), inner)])?;
        let invoked = if self.ctx.current_scope().is_arrow {
            IRNode::call(wrapped, Vec::new())
        } else {
            IRNode::method_call(wrapped, "call", vec![IRNode::this()])
        };
        Ok(vec![IRNode::ret(Some(invoked))])
    }
}

#[cfg(test)]
#[path = "../../tests/async_es5_ir.rs"]
mod tests;
