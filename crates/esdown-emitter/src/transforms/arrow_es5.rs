//! ES5 Arrow Function Transform
//!
//! Arrow functions become function expressions:
//!
//! ```typescript
//! const add = (a, b) => a + b;
//! const obj = {
//!     method() {
//!         const arrow = () => this.x;
//!     }
//! };
//! ```
//!
//! Becomes:
//!
//! ```javascript
//! var add = function(a, b) { return a + b; };
//! var obj = {
//!     method: function method() {
//!         var _this = this;
//!         var arrow = function() { return _this.x; };
//!     }
//! };
//! ```
//!
//! The arrow's scope is marked lexical, so `this` and `arguments` inside it
//! resolve to captures declared by the nearest enclosing non-arrow function.
//! An async arrow lowers to a state machine like any async function.

use super::ast_to_ir::AstToIr;
use super::ir::IRNode;
use crate::error::LowerResult;
use crate::transform_context::FunctionScope;
use esdown_ast::{Arrow, ArrowBody, FunctionFlags, Stmt};

impl AstToIr<'_> {
    pub(crate) fn lower_arrow(&mut self, arrow: &Arrow) -> LowerResult<IRNode> {
        let synthesized;
        let body: &[Stmt] = match &arrow.body {
            ArrowBody::Block { body } => body,
            ArrowBody::Expr { expr } => {
                synthesized = [Stmt::Return {
                    arg: Some(expr.as_ref().clone()),
                }];
                &synthesized
            }
        };
        let flags = if arrow.is_async {
            FunctionFlags::ASYNC
        } else {
            FunctionFlags::empty()
        };
        let (params, body) =
            self.lower_callable(&arrow.params, body, flags, arrow.span, FunctionScope::arrow())?;
        Ok(IRNode::func_expr(None, params, body))
    }
}

#[cfg(test)]
mod tests {
    use crate::options::EmitOptions;
    use crate::transform_context::LoweringContext;
    use crate::transforms::ast_to_ir::AstToIr;
    use crate::transforms::ir_printer::IRPrinter;
    use esdown_ast::builders::*;
    use esdown_ast::{BinaryOp, Expr, SourceUnit, Stmt};

    fn lower_in_method(body: Vec<Stmt>) -> String {
        let unit = SourceUnit::new("test.ts", body.clone());
        let mut ctx = LoweringContext::new(&unit, EmitOptions::default());
        let function = Expr::Function(function(Some("m"), &[], body, Default::default()));
        let node = AstToIr::new(&mut ctx).lower_expr(&function).unwrap();
        IRPrinter::emit_to_string(&node)
    }

    #[test]
    fn test_expression_body_becomes_return() {
        let unit = SourceUnit::new("test.ts", vec![]);
        let mut ctx = LoweringContext::new(&unit, EmitOptions::default());
        let arrow = arrow_expr(&["a", "b"], binary(BinaryOp::Add, ident("a"), ident("b")));
        let node = AstToIr::new(&mut ctx).lower_expr(&arrow).unwrap();
        assert_eq!(
            IRPrinter::emit_to_string(&node),
            "function(a, b) {\n    return a + b;\n}"
        );
    }

    #[test]
    fn test_this_in_arrow_is_captured_by_enclosing_function() {
        let arrow = arrow_expr(&[], member(this(), "x"));
        let output = lower_in_method(vec![ret(Some(arrow))]);
        assert!(output.contains("var _this = this;"), "{output}");
        assert!(output.contains("return _this.x;"), "{output}");
    }

    #[test]
    fn test_arrow_without_this_needs_no_capture() {
        let arrow = arrow_expr(&["a"], ident("a"));
        let output = lower_in_method(vec![ret(Some(arrow))]);
        assert!(!output.contains("_this"), "{output}");
    }

    #[test]
    fn test_nested_arrows_share_one_capture() {
        let inner = arrow_expr(&[], this());
        let outer = arrow_block(&[], vec![ret(Some(inner))]);
        let output = lower_in_method(vec![ret(Some(outer))]);
        assert_eq!(output.matches("var _this = this;").count(), 1, "{output}");
    }

    #[test]
    fn test_arguments_in_arrow_reads_enclosing_arguments() {
        let arrow = arrow_expr(&[], ident("arguments"));
        let output = lower_in_method(vec![ret(Some(arrow))]);
        assert!(output.contains("var _arguments = arguments;"), "{output}");
        assert!(output.contains("return _arguments;"), "{output}");
    }
}
