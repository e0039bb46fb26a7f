//! ES5 Namespace Transform (IR-based)
//!
//! Namespaces become IIFEs that fill in a shared object:
//!
//! ```typescript
//! namespace foo {
//!     export const x = 1;
//!     export function f() {}
//! }
//! ```
//!
//! Becomes:
//!
//! ```javascript
//! var foo;
//! (function(foo) {
//!     var x = foo.x = 1;
//!     function f() {}
//!     foo.f = f;
//! })(foo || (foo = {}));
//! ```
//!
//! A qualified name (`A.B.C`) nests one IIFE per segment, each inner one
//! applied to `(B = A.B || (A.B = {}))`. Declaring the same namespace again
//! emits another IIFE over the same object; `var foo;` is only emitted the
//! first time the name is declared in its block.

use super::ast_to_ir::{AstToIr, push_flat, stmt_span};
use super::ir::IRNode;
use crate::error::{LowerError, LowerResult};
use esdown_ast::{Namespace, Stmt};
use esdown_common::limits::MAX_QUALIFIED_NAME_DEPTH;

impl AstToIr<'_> {
    pub(crate) fn lower_namespace_declaration(&mut self, ns: &Namespace, exported: bool) -> LowerResult<IRNode> {
        self.lower_namespace(ns, None, exported)
    }

    /// `parent` is the enclosing namespace parameter when `ns` is exported
    /// from another namespace.
    fn lower_namespace(&mut self, ns: &Namespace, parent: Option<&str>, exported: bool) -> LowerResult<IRNode> {
        if ns.name.is_empty() {
            return Err(LowerError::unsupported("namespace without a name", ns.span));
        }
        if ns.name.len() > MAX_QUALIFIED_NAME_DEPTH {
            return Err(LowerError::unsupported("namespace name nested too deeply", ns.span));
        }

        // A parameter that would be shadowed by its own body gets a fresh name.
        let mut params = Vec::with_capacity(ns.name.len());
        for (i, segment) in ns.name.iter().enumerate() {
            let clashes = match ns.name.get(i + 1) {
                Some(next) => next == segment,
                None => declares_name(&ns.body, segment),
            };
            params.push(if clashes {
                self.ctx.fresh_name(segment)
            } else {
                segment.clone()
            });
        }

        let last = ns.name.len() - 1;
        self.ctx.push_function_names();
        let body = self.lower_namespace_body(&params[last], &ns.body);
        self.ctx.pop_block_names();
        let body = body?;
        if body.is_empty() {
            return Ok(IRNode::Sequence(Vec::new()));
        }

        let parent_of = |i: usize| -> Option<String> {
            if i == 0 {
                parent.map(str::to_string)
            } else {
                Some(params[i - 1].clone())
            }
        };
        let mut iife = IRNode::NamespaceIIFE {
            name: ns.name[last].clone(),
            param_name: params[last].clone(),
            parent_name: parent_of(last),
            body,
        };
        for i in (0..last).rev() {
            iife = IRNode::NamespaceIIFE {
                name: ns.name[i].clone(),
                param_name: params[i].clone(),
                parent_name: parent_of(i),
                body: vec![IRNode::var_decl(&ns.name[i + 1], None), iife],
            };
        }

        let mut out = Vec::with_capacity(2);
        let first = &ns.name[0];
        if self.ctx.declare_name(first) {
            let decl = IRNode::var_decl(first, None);
            out.push(if exported && parent.is_none() {
                IRNode::Export(Box::new(decl))
            } else {
                decl
            });
        }
        out.push(iife);
        Ok(IRNode::Sequence(out))
    }

    fn lower_namespace_body(&mut self, param: &str, body: &[Stmt]) -> LowerResult<Vec<IRNode>> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            match stmt {
                Stmt::Export { decl } => self.lower_namespace_export(param, decl, &mut out)?,
                other => push_flat(&mut out, self.lower_stmt(other)?),
            }
        }
        Ok(out)
    }

    fn lower_namespace_export(&mut self, param: &str, decl: &Stmt, out: &mut Vec<IRNode>) -> LowerResult<()> {
        match decl {
            Stmt::Var(var) => {
                for declarator in &var.declarators {
                    self.ctx.declare_name(&declarator.name);
                    let name = self.binding_name(&declarator.name);
                    let member = IRNode::prop(IRNode::id(param), &declarator.name);
                    match &declarator.init {
                        // var a = X.a = 1;
                        Some(init) => {
                            let value = self.lower_expr(init)?;
                            out.push(IRNode::var_decl(name, Some(IRNode::assign(member, value))));
                        }
                        None => {
                            out.push(IRNode::var_decl(&name, None));
                            out.push(IRNode::expr_stmt(IRNode::assign(member, IRNode::id(name))));
                        }
                    }
                }
            }
            Stmt::Function(function) => {
                let name = function.name.clone().ok_or_else(|| {
                    LowerError::unsupported("anonymous exported function", function.span)
                })?;
                push_flat(out, self.lower_stmt(decl)?);
                out.push(export_member(param, &name));
            }
            Stmt::Class(class) => {
                let name = class
                    .name
                    .clone()
                    .ok_or_else(|| LowerError::unsupported("anonymous exported class", class.span))?;
                push_flat(out, self.lower_stmt(decl)?);
                out.push(export_member(param, &name));
            }
            Stmt::Namespace(inner) => push_flat(out, self.lower_namespace(inner, Some(param), true)?),
            other => {
                return Err(LowerError::unsupported(
                    "export of a non-declaration",
                    stmt_span(other),
                ));
            }
        }
        Ok(())
    }
}

/// `X.name = name;`
fn export_member(param: &str, name: &str) -> IRNode {
    IRNode::expr_stmt(IRNode::assign(
        IRNode::prop(IRNode::id(param), name),
        IRNode::id(name),
    ))
}

/// Whether `body` declares `name` at its top level.
fn declares_name(body: &[Stmt], name: &str) -> bool {
    body.iter().any(|stmt| {
        let stmt = match stmt {
            Stmt::Export { decl } => decl.as_ref(),
            other => other,
        };
        match stmt {
            Stmt::Var(var) => var.declarators.iter().any(|d| d.name == name),
            Stmt::Function(f) => f.name.as_deref() == Some(name),
            Stmt::Class(c) => c.name.as_deref() == Some(name),
            Stmt::Namespace(ns) => ns.name.first().is_some_and(|n| n == name),
            _ => false,
        }
    })
}

#[cfg(test)]
#[path = "../../tests/namespace_es5_ir.rs"]
mod tests;
