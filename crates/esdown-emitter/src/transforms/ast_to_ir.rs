//! AST to IR lowering
//!
//! `AstToIr` turns syntax nodes into ES5 `IRNode` trees. This file holds the
//! statement and expression dispatch plus the function-body plumbing shared by
//! every rule; the construct-specific rules live in sibling files as further
//! `impl AstToIr` blocks:
//!
//! - `class_es5_ir.rs`: classes
//! - `namespace_es5_ir.rs`: namespaces
//! - `spread_es5.rs`: array/call/new spread
//! - `arrow_es5.rs`: arrow functions
//! - `async_es5_ir.rs`: async functions and generators (state machines)

use super::ir::*;
use super::ir_printer::format_number;
use crate::error::{LowerError, LowerResult};
use crate::transform_context::{FunctionScope, LoweringContext};
use esdown_ast::*;
use esdown_common::Span;

/// Lowers syntax nodes to IR against one unit's context.
pub struct AstToIr<'a> {
    pub(crate) ctx: &'a mut LoweringContext,
}

/// Lowered parameter list: the IR parameters plus the statements a rest
/// parameter needs at the top of the body.
pub(crate) struct LoweredParams {
    pub params: Vec<IRParam>,
    pub prologue: Vec<IRNode>,
}

impl<'a> AstToIr<'a> {
    pub fn new(ctx: &'a mut LoweringContext) -> Self {
        AstToIr { ctx }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn lower_stmts(&mut self, stmts: &[Stmt]) -> LowerResult<Vec<IRNode>> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            push_flat(&mut out, self.lower_stmt(stmt)?);
        }
        Ok(out)
    }

    pub fn lower_stmt(&mut self, stmt: &Stmt) -> LowerResult<IRNode> {
        self.ctx.enter(stmt_span(stmt))?;
        let result = self.lower_stmt_inner(stmt);
        self.ctx.exit();
        result
    }

    fn lower_stmt_inner(&mut self, stmt: &Stmt) -> LowerResult<IRNode> {
        match stmt {
            Stmt::Expr { expr } => Ok(IRNode::expr_stmt(self.lower_expr(expr)?)),
            Stmt::Var(decl) => self.lower_var_decl(decl),
            Stmt::Function(function) => {
                let name = function.name.as_deref().ok_or_else(|| {
                    LowerError::unsupported("anonymous function declaration", function.span)
                })?;
                self.ctx.declare_name(name);
                let (params, body) = self.lower_function(function)?;
                Ok(IRNode::func_decl(name, params, body))
            }
            Stmt::Class(class) => self.lower_class_declaration(class),
            Stmt::Namespace(ns) => self.lower_namespace_declaration(ns, false),
            Stmt::Export { decl } => self.lower_export(decl),
            Stmt::Return { arg } => {
                let value = arg.as_ref().map(|e| self.lower_expr(e)).transpose()?;
                Ok(IRNode::ret(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                let condition = self.lower_expr(test)?;
                let then_branch = self.lower_stmt(consequent)?;
                let else_branch = match alternate {
                    Some(alt) => Some(Box::new(self.lower_stmt(alt)?)),
                    None => None,
                };
                Ok(IRNode::IfStatement {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch,
                })
            }
            Stmt::Block { body } => Ok(IRNode::Block(self.in_block(|this| this.lower_stmts(body))?)),
            Stmt::While { test, body } => Ok(IRNode::WhileStatement {
                condition: Box::new(self.lower_expr(test)?),
                body: Box::new(self.lower_stmt(body)?),
            }),
            Stmt::DoWhile { body, test } => {
                let body = self.lower_stmt(body)?;
                Ok(IRNode::DoWhileStatement {
                    body: Box::new(body),
                    condition: Box::new(self.lower_expr(test)?),
                })
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.in_block(|this| {
                let initializer = match init {
                    Some(ForInit::Var(decl)) => Some(Box::new(this.lower_var_decl(decl)?)),
                    Some(ForInit::Expr { expr }) => Some(Box::new(this.lower_expr(expr)?)),
                    None => None,
                };
                let condition = test.as_ref().map(|t| this.lower_expr(t)).transpose()?;
                let incrementor = update.as_ref().map(|u| this.lower_expr(u)).transpose()?;
                Ok(IRNode::ForStatement {
                    initializer,
                    condition: condition.map(Box::new),
                    incrementor: incrementor.map(Box::new),
                    body: Box::new(this.lower_stmt(body)?),
                })
            }),
            Stmt::ForOf {
                kind,
                binding,
                iterable,
                body,
            } => self.in_block(|this| this.lower_for_of(*kind, binding, iterable, body)),
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                let expression = self.lower_expr(discriminant)?;
                let ir_cases = self.in_block(|this| {
                    let mut ir_cases = Vec::with_capacity(cases.len());
                    for case in cases {
                        let test = case.test.as_ref().map(|t| this.lower_expr(t)).transpose()?;
                        ir_cases.push(IRSwitchCase {
                            test,
                            statements: this.lower_stmts(&case.body)?,
                        });
                    }
                    Ok(ir_cases)
                })?;
                Ok(IRNode::SwitchStatement {
                    expression: Box::new(expression),
                    cases: ir_cases,
                })
            }
            Stmt::Try(try_stmt) => self.lower_try(try_stmt),
            Stmt::Throw { arg } => Ok(IRNode::ThrowStatement(Box::new(self.lower_expr(arg)?))),
            Stmt::Break { label } => Ok(IRNode::BreakStatement(label.clone())),
            Stmt::Continue { label } => Ok(IRNode::ContinueStatement(label.clone())),
            Stmt::Labeled { label, body } => Ok(IRNode::LabeledStatement {
                label: label.clone(),
                statement: Box::new(self.lower_stmt(body)?),
            }),
            Stmt::With { span, .. } => Err(LowerError::unsupported("with statement", *span)),
            Stmt::Empty => Ok(IRNode::EmptyStatement),
        }
    }

    /// Run `f` with a block scope open for `let`/`const` declarations.
    pub(crate) fn in_block<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> LowerResult<T>,
    ) -> LowerResult<T> {
        self.ctx.push_block_names();
        let result = f(self);
        self.ctx.pop_block_names();
        result
    }

    /// Declare a binding of `kind` and return the name it is emitted under.
    pub(crate) fn declare_binding(&mut self, kind: VarKind, name: &str) -> String {
        match kind {
            VarKind::Var => {
                self.ctx.declare_name(name);
                self.binding_name(name)
            }
            VarKind::Let | VarKind::Const => self.ctx.declare_lexical(name),
        }
    }

    pub(crate) fn lower_var_decl(&mut self, decl: &VarDecl) -> LowerResult<IRNode> {
        let mut decls = Vec::with_capacity(decl.declarators.len());
        for declarator in &decl.declarators {
            let name = self.declare_binding(decl.kind, &declarator.name);
            let init = declarator
                .init
                .as_ref()
                .map(|e| self.lower_expr(e))
                .transpose()?;
            decls.push(IRNode::var_decl(name, init));
        }
        Ok(match decls.pop() {
            Some(only) if decls.is_empty() => only,
            Some(last) => {
                decls.push(last);
                IRNode::VarDeclList(decls)
            }
            None => IRNode::Sequence(Vec::new()),
        })
    }

    fn lower_export(&mut self, decl: &Stmt) -> LowerResult<IRNode> {
        match decl {
            Stmt::Namespace(ns) => self.lower_namespace_declaration(ns, true),
            Stmt::Var(_) | Stmt::Function(_) | Stmt::Class(_) => {
                let lowered = self.lower_stmt(decl)?;
                Ok(export_declaration(lowered))
            }
            _ => Err(LowerError::unsupported(
                "export of a non-declaration",
                stmt_span(decl),
            )),
        }
    }

    /// `for (x of xs)` over an array-like:
    /// `for(var _i = 0, _iter = xs; _i < _iter.length; _i++){ var x = _iter[_i]; ... }`
    fn lower_for_of(
        &mut self,
        kind: VarKind,
        binding: &str,
        iterable: &Expr,
        body: &Stmt,
    ) -> LowerResult<IRNode> {
        let index = self.ctx.fresh_name("i");
        let iter = self.ctx.fresh_name("iter");
        let iterable = self.lower_expr(iterable)?;
        let name = self.declare_binding(kind, binding);

        let mut statements = vec![IRNode::var_decl(
            name,
            Some(IRNode::elem(IRNode::id(&iter), IRNode::id(&index))),
        )];
        match body {
            Stmt::Block { body } => statements.extend(self.lower_stmts(body)?),
            other => push_flat(&mut statements, self.lower_stmt(other)?),
        }

        Ok(IRNode::ForStatement {
            initializer: Some(Box::new(IRNode::VarDeclList(vec![
                IRNode::var_decl(&index, Some(IRNode::int(0))),
                IRNode::var_decl(&iter, Some(iterable)),
            ]))),
            condition: Some(Box::new(IRNode::binary(
                IRNode::id(&index),
                "<",
                IRNode::prop(IRNode::id(&iter), "length"),
            ))),
            incrementor: Some(Box::new(IRNode::PostfixUnaryExpr {
                operand: Box::new(IRNode::id(&index)),
                operator: "++".to_string(),
            })),
            body: Box::new(IRNode::Block(statements)),
        })
    }

    fn lower_try(&mut self, try_stmt: &TryStmt) -> LowerResult<IRNode> {
        let try_block = IRNode::Block(self.in_block(|this| this.lower_stmts(&try_stmt.block))?);
        let catch_clause = match &try_stmt.handler {
            Some(handler) => {
                // ES5 has no optional catch binding
                let param = match &handler.param {
                    Some(p) => p.clone(),
                    None => self.ctx.fresh_name("e"),
                };
                let body = self.in_block(|this| {
                    this.ctx.shadow_rename(&param);
                    this.ctx.declare_name(&param);
                    this.lower_stmts(&handler.body)
                })?;
                Some(IRCatchClause {
                    param: Some(param),
                    body,
                })
            }
            None => None,
        };
        let finally_block = match &try_stmt.finalizer {
            Some(f) => Some(Box::new(IRNode::Block(self.in_block(|this| this.lower_stmts(f))?))),
            None => None,
        };
        Ok(IRNode::TryStatement {
            try_block: Box::new(try_block),
            catch_clause,
            finally_block,
        })
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn lower_expr(&mut self, expr: &Expr) -> LowerResult<IRNode> {
        self.ctx.enter(expr_span(expr))?;
        let result = self.lower_expr_inner(expr);
        self.ctx.exit();
        result
    }

    fn lower_expr_inner(&mut self, expr: &Expr) -> LowerResult<IRNode> {
        match expr {
            Expr::Ident { name } => Ok(self.lower_ident(name)),
            Expr::Lit { value } => Ok(lower_lit(value)),
            Expr::Template { quasis, exprs } => {
                let mut values = Vec::with_capacity(exprs.len());
                for e in exprs {
                    values.push(self.lower_expr(e)?);
                }
                Ok(build_template(quasis, values))
            }
            Expr::This => Ok(self.ctx.resolve_this()),
            Expr::Array { elements } => {
                let has_spread = elements.iter().flatten().any(|e| e.spread);
                let mut pieces = Vec::with_capacity(elements.len());
                for element in elements {
                    pieces.push(match element {
                        Some(e) => (e.spread, self.lower_expr(&e.expr)?),
                        None => (false, IRNode::OmittedExpression),
                    });
                }
                if has_spread {
                    self.spread_array(pieces)
                } else {
                    Ok(IRNode::ArrayLiteral(pieces.into_iter().map(|(_, e)| e).collect()))
                }
            }
            Expr::Object { props } => self.lower_object(props),
            Expr::Function(function) => {
                let (params, body) = self.lower_function(function)?;
                Ok(IRNode::func_expr(function.name.clone(), params, body))
            }
            Expr::Arrow(arrow) => self.lower_arrow(arrow),
            Expr::Class(class) => self.lower_class_expression(class),
            Expr::Unary { op, arg } => Ok(IRNode::prefix(op.as_str(), self.lower_expr(arg)?)),
            Expr::Update { op, prefix, arg } => {
                self.check_assignment_target(arg, expr_span(expr))?;
                let operand = Box::new(self.lower_expr(arg)?);
                let operator = op.as_str().to_string();
                Ok(if *prefix {
                    IRNode::PrefixUnaryExpr { operator, operand }
                } else {
                    IRNode::PostfixUnaryExpr { operand, operator }
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.lower_expr(left)?;
                let right = self.lower_expr(right)?;
                self.lower_binary(*op, left, right)
            }
            Expr::Logical { op, left, right } => match op {
                LogicalOp::And => Ok(IRNode::logical_and(
                    self.lower_expr(left)?,
                    self.lower_expr(right)?,
                )),
                LogicalOp::Or => Ok(IRNode::logical_or(
                    self.lower_expr(left)?,
                    self.lower_expr(right)?,
                )),
                LogicalOp::Nullish => {
                    let left = self.lower_expr(left)?;
                    let right = self.lower_expr(right)?;
                    Ok(self.build_nullish(left, right))
                }
            },
            Expr::Assign {
                op,
                target,
                value,
                span,
            } => {
                self.check_assignment_target(target, *span)?;
                let target = self.lower_expr(target)?;
                let value = self.lower_expr(value)?;
                Ok(IRNode::binary(target, op.as_str(), value))
            }
            Expr::Cond {
                test,
                consequent,
                alternate,
            } => Ok(IRNode::conditional(
                self.lower_expr(test)?,
                self.lower_expr(consequent)?,
                self.lower_expr(alternate)?,
            )),
            Expr::Call { callee, args } => self.lower_call(callee, args),
            Expr::New { callee, args } => {
                let callee = self.lower_expr(callee)?;
                let pieces = self.lower_args(args)?;
                if pieces.iter().any(|(spread, _)| *spread) {
                    self.spread_new(callee, pieces)
                } else {
                    Ok(IRNode::new_expr(callee, strip_spread(pieces)))
                }
            }
            Expr::Member { object, property } => {
                let object = self.lower_expr(object)?;
                self.lower_member(object, property)
            }
            Expr::SuperCall { args, span } => {
                let pieces = self.lower_args(args)?;
                self.lower_super_call(pieces, *span)
            }
            Expr::SuperMember { property, span } => self.lower_super_member(property, *span),
            Expr::Seq { exprs } => {
                let mut out = Vec::with_capacity(exprs.len());
                for e in exprs {
                    out.push(self.lower_expr(e)?);
                }
                Ok(IRNode::CommaExpr(out))
            }
            Expr::Await { span, .. } => Err(LowerError::unsupported(
                "await outside an async function",
                *span,
            )),
            Expr::Yield { span, .. } => Err(LowerError::unsupported(
                "yield outside a generator function",
                *span,
            )),
        }
    }

    pub(crate) fn lower_ident(&mut self, name: &str) -> IRNode {
        if let Some(renamed) = self.ctx.renamed(name) {
            return IRNode::id(renamed);
        }
        if name == "arguments" {
            return self.ctx.resolve_arguments();
        }
        IRNode::id(name)
    }

    /// Name a declaration binds after active renames.
    pub(crate) fn binding_name(&self, name: &str) -> String {
        self.ctx.renamed(name).unwrap_or(name).to_string()
    }

    /// `a instanceof B` becomes `_instanceof(a, B)`.
    pub(crate) fn lower_binary(
        &mut self,
        op: BinaryOp,
        left: IRNode,
        right: IRNode,
    ) -> LowerResult<IRNode> {
        match op {
            BinaryOp::InstanceOf => self.ctx.helper_call("instanceof", vec![left, right]),
            _ => Ok(build_binary(op, left, right)),
        }
    }

    pub(crate) fn check_assignment_target(&self, target: &Expr, span: Span) -> LowerResult<()> {
        match target {
            Expr::Ident { .. } | Expr::Member { .. } => Ok(()),
            Expr::SuperMember { span, .. } => Err(LowerError::unsupported(
                "assignment to a super property",
                *span,
            )),
            _ => Err(LowerError::unsupported(
                "assignment to a non-reference target",
                span,
            )),
        }
    }

    pub(crate) fn lower_member(&mut self, object: IRNode, property: &MemberProp) -> LowerResult<IRNode> {
        Ok(match property {
            MemberProp::Ident { name } => IRNode::prop(object, name),
            MemberProp::Computed { expr } => IRNode::elem(object, self.lower_expr(expr)?),
        })
    }

    pub(crate) fn lower_args(&mut self, args: &[ExprOrSpread]) -> LowerResult<Vec<(bool, IRNode)>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push((arg.spread, self.lower_expr(&arg.expr)?));
        }
        Ok(out)
    }

    fn lower_call(&mut self, callee: &Expr, args: &[ExprOrSpread]) -> LowerResult<IRNode> {
        if let Expr::SuperMember { property, span } = callee {
            let method = self.lower_super_member(property, *span)?;
            let receiver = self.ctx.resolve_this();
            let pieces = self.lower_args(args)?;
            return self.call_with_receiver(method, receiver, pieces);
        }

        let has_spread = args.iter().any(|a| a.spread);
        if !has_spread {
            let callee = self.lower_expr(callee)?;
            let pieces = self.lower_args(args)?;
            return Ok(IRNode::call(callee, strip_spread(pieces)));
        }

        let callee = match callee {
            Expr::Member { object, property } => {
                let object = self.lower_expr(object)?;
                let key = match property {
                    MemberProp::Ident { name } => MemberKey::Named(name.clone()),
                    MemberProp::Computed { expr } => MemberKey::Computed(self.lower_expr(expr)?),
                };
                CalleeShape::Member { object, key }
            }
            other => CalleeShape::Plain(self.lower_expr(other)?),
        };
        let pieces = self.lower_args(args)?;
        self.spread_call(callee, pieces)
    }

    /// `fn.call(receiver, args)`, or `fn.apply(receiver, ...)` with spread.
    pub(crate) fn call_with_receiver(
        &mut self,
        function: IRNode,
        receiver: IRNode,
        pieces: Vec<(bool, IRNode)>,
    ) -> LowerResult<IRNode> {
        if pieces.iter().any(|(spread, _)| *spread) {
            let array = self.spread_array(pieces)?;
            return Ok(IRNode::method_call(function, "apply", vec![receiver, array]));
        }
        let mut args = vec![receiver];
        args.extend(strip_spread(pieces));
        Ok(IRNode::method_call(function, "call", args))
    }

    fn lower_object(&mut self, props: &[Prop]) -> LowerResult<IRNode> {
        if let Some(Prop::Spread { span, .. }) = props.iter().find(|p| matches!(p, Prop::Spread { .. })) {
            return Err(LowerError::unsupported("object spread", *span));
        }

        let split = props
            .iter()
            .position(|p| prop_key(p).is_some_and(PropName::is_computed))
            .unwrap_or(props.len());

        let mut properties: Vec<IRProperty> = Vec::with_capacity(split);
        for prop in &props[..split] {
            self.lower_static_prop(prop, &mut properties)?;
        }
        let mut object = IRNode::object(properties);

        // From the first computed key on, every property is defined in order:
        // _define_property(_define_property({a: 1}, k, v), "b", 2)
        for prop in &props[split..] {
            let (key, value) = match prop {
                Prop::KeyValue { key, value } => (self.lower_key_expr(key)?, self.lower_expr(value)?),
                Prop::Shorthand { name } => (IRNode::string(name), self.lower_ident(name)),
                Prop::Method { key, function } => {
                    let name = method_function_name(key, &function.body);
                    let (params, body) = self.lower_function(function)?;
                    (self.lower_key_expr(key)?, IRNode::func_expr(name, params, body))
                }
                Prop::Getter { function, .. } | Prop::Setter { function, .. } => {
                    return Err(LowerError::unsupported(
                        "accessor after a computed property key",
                        function.span,
                    ));
                }
                Prop::Spread { span, .. } => {
                    return Err(LowerError::unsupported("object spread", *span));
                }
            };
            object = self.ctx.helper_call("define_property", vec![object, key, value])?;
        }
        Ok(object)
    }

    pub(crate) fn lower_static_prop(&mut self, prop: &Prop, out: &mut Vec<IRProperty>) -> LowerResult<()> {
        match prop {
            Prop::KeyValue { key, value } => {
                let value = self.lower_expr(value)?;
                out.push(IRProperty {
                    key: static_property_key(key),
                    value,
                    kind: IRPropertyKind::Init,
                });
            }
            Prop::Shorthand { name } => {
                let value = self.lower_ident(name);
                out.push(IRProperty::init(name, value));
            }
            Prop::Method { key, function } => {
                let name = method_function_name(key, &function.body);
                let (params, body) = self.lower_function(function)?;
                out.push(IRProperty {
                    key: static_property_key(key),
                    value: IRNode::func_expr(name, params, body),
                    kind: IRPropertyKind::Init,
                });
            }
            Prop::Getter { key, function } => {
                let (params, body) = self.lower_function(function)?;
                out.push(IRProperty::getter(
                    static_property_key(key),
                    IRNode::func_expr(None, params, body),
                ));
            }
            Prop::Setter { key, function } => {
                let (params, body) = self.lower_function(function)?;
                out.push(IRProperty::setter(
                    static_property_key(key),
                    IRNode::func_expr(None, params, body),
                ));
            }
            Prop::Spread { span, .. } => {
                return Err(LowerError::unsupported("object spread", *span));
            }
        }
        Ok(())
    }

    /// A property key as a runtime value: `"name"`, `1`, or the computed expression.
    pub(crate) fn lower_key_expr(&mut self, key: &PropName) -> LowerResult<IRNode> {
        Ok(match key {
            PropName::Ident { name } => IRNode::string(name),
            PropName::Str { value } => IRNode::string(value),
            PropName::Num { value } => IRNode::number(format_number(*value)),
            PropName::Computed { expr } => self.lower_expr(expr)?,
        })
    }

    /// `a ?? b` as `a !== null && a !== void 0 ? a : b`, caching a
    /// non-identifier left side in a temporary.
    pub(crate) fn build_nullish(&mut self, left: IRNode, right: IRNode) -> IRNode {
        let (head, reference) = match left {
            IRNode::Identifier(_) => (left.clone(), left),
            other => {
                let temp = self.ctx.declare_temp("ref");
                (IRNode::assign(IRNode::id(&temp), other), IRNode::id(&temp))
            }
        };
        IRNode::conditional(
            IRNode::logical_and(
                IRNode::binary(head, "!==", IRNode::NullLiteral),
                IRNode::binary(reference.clone(), "!==", IRNode::Undefined),
            ),
            reference,
            right,
        )
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Lower a function's parameters and body in a fresh function scope.
    pub(crate) fn lower_function(&mut self, function: &Function) -> LowerResult<(Vec<IRParam>, Vec<IRNode>)> {
        self.lower_callable(
            &function.params,
            &function.body,
            function.flags,
            function.span,
            FunctionScope::function(),
        )
    }

    pub(crate) fn lower_callable(
        &mut self,
        params: &[Param],
        body: &[Stmt],
        flags: FunctionFlags,
        span: Span,
        mut scope: FunctionScope,
    ) -> LowerResult<(Vec<IRParam>, Vec<IRNode>)> {
        if flags.contains(FunctionFlags::ASYNC | FunctionFlags::GENERATOR) {
            return Err(LowerError::unsupported("async generator function", span));
        }
        scope.suspending = flags.intersects(FunctionFlags::ASYNC | FunctionFlags::GENERATOR);

        self.ctx.push_scope(scope);
        let result = self.lower_callable_in_scope(params, body, flags);
        let scope = self.ctx.pop_scope();
        let (lowered, body) = result?;
        let body = self.finish_body(&scope, lowered.prologue, body);
        Ok((lowered.params, body))
    }

    fn lower_callable_in_scope(
        &mut self,
        params: &[Param],
        body: &[Stmt],
        flags: FunctionFlags,
    ) -> LowerResult<(LoweredParams, Vec<IRNode>)> {
        let lowered = self.lower_params(params)?;
        let body = if flags.intersects(FunctionFlags::ASYNC | FunctionFlags::GENERATOR) {
            self.lower_suspending_body(params, body, flags.contains(FunctionFlags::ASYNC))?
        } else {
            self.lower_stmts(body)?
        };
        Ok((lowered, body))
    }

    /// Parameters with defaults keep them on the `IRParam` (printed as an
    /// `if (p === void 0)` prologue); a rest parameter becomes
    /// `var rest = Array.prototype.slice.call(arguments, N);`.
    pub(crate) fn lower_params(&mut self, params: &[Param]) -> LowerResult<LoweredParams> {
        let mut out = Vec::with_capacity(params.len());
        let mut prologue = Vec::new();
        for (index, param) in params.iter().enumerate() {
            self.ctx.shadow_rename(&param.name);
            self.ctx.declare_name(&param.name);
            if param.rest {
                let slice = IRNode::prop(
                    IRNode::prop(IRNode::prop(IRNode::id("Array"), "prototype"), "slice"),
                    "call",
                );
                prologue.push(IRNode::var_decl(
                    &param.name,
                    Some(IRNode::call(
                        slice,
                        vec![IRNode::id("arguments"), IRNode::int(index as u32)],
                    )),
                ));
                continue;
            }
            let mut ir = IRParam::new(&param.name);
            if let Some(default) = &param.default {
                ir = ir.with_default(self.lower_expr(default)?);
            }
            out.push(ir);
        }
        Ok(LoweredParams {
            params: out,
            prologue,
        })
    }

    /// Assemble a function body: captures, rest parameters, hoisted
    /// temporaries, then the lowered statements.
    pub(crate) fn finish_body(
        &mut self,
        scope: &FunctionScope,
        prologue: Vec<IRNode>,
        body: Vec<IRNode>,
    ) -> Vec<IRNode> {
        let mut out = self.ctx.capture_prologue(scope);
        out.extend(prologue);
        if !scope.hoisted.is_empty() {
            out.push(IRNode::var_names(scope.hoisted.iter().cloned()));
        }
        out.extend(body);
        out
    }
}

// =============================================================================
// Free helpers
// =============================================================================

/// Callee of a spread call, split so the receiver can be reused.
pub(crate) enum CalleeShape {
    Plain(IRNode),
    Member { object: IRNode, key: MemberKey },
}

pub(crate) enum MemberKey {
    Named(String),
    Computed(IRNode),
}

impl MemberKey {
    pub(crate) fn access(self, object: IRNode) -> IRNode {
        match self {
            MemberKey::Named(name) => IRNode::prop(object, name),
            MemberKey::Computed(index) => IRNode::elem(object, index),
        }
    }
}

pub(crate) fn strip_spread(pieces: Vec<(bool, IRNode)>) -> Vec<IRNode> {
    pieces.into_iter().map(|(_, node)| node).collect()
}

/// Append a lowered statement, flattening sequences.
pub(crate) fn push_flat(out: &mut Vec<IRNode>, node: IRNode) {
    match node {
        IRNode::Sequence(nodes) => {
            for n in nodes {
                push_flat(out, n);
            }
        }
        other => out.push(other),
    }
}

/// Prefix the declaration part of a lowered statement with `export`.
fn export_declaration(lowered: IRNode) -> IRNode {
    match lowered {
        IRNode::Sequence(mut nodes) if !nodes.is_empty() => {
            let first = nodes.remove(0);
            nodes.insert(0, IRNode::Export(Box::new(first)));
            IRNode::Sequence(nodes)
        }
        other => IRNode::Export(Box::new(other)),
    }
}

pub(crate) fn lower_lit(lit: &Lit) -> IRNode {
    match lit {
        Lit::Num(n) => IRNode::number(format_number(*n)),
        Lit::Str(s) => IRNode::string(s),
        Lit::Bool(b) => IRNode::BooleanLiteral(*b),
        Lit::Null => IRNode::NullLiteral,
        Lit::Undefined => IRNode::Undefined,
        Lit::Regex { pattern, flags } => IRNode::RegexLiteral {
            pattern: pattern.clone(),
            flags: flags.clone(),
        },
    }
}

/// `` `a${x}b${y}` `` as `"a".concat(x, "b").concat(y)`.
pub(crate) fn build_template(quasis: &[String], values: Vec<IRNode>) -> IRNode {
    let mut result = IRNode::string(quasis.first().cloned().unwrap_or_default());
    for (i, value) in values.into_iter().enumerate() {
        let mut args = vec![value];
        if let Some(quasi) = quasis.get(i + 1).filter(|q| !q.is_empty()) {
            args.push(IRNode::string(quasi));
        }
        result = IRNode::method_call(result, "concat", args);
    }
    result
}

pub(crate) fn build_binary(op: BinaryOp, left: IRNode, right: IRNode) -> IRNode {
    match op {
        BinaryOp::Exp => IRNode::method_call(IRNode::id("Math"), "pow", vec![left, right]),
        _ => IRNode::binary(left, op.as_str(), right),
    }
}

fn prop_key(prop: &Prop) -> Option<&PropName> {
    match prop {
        Prop::KeyValue { key, .. }
        | Prop::Method { key, .. }
        | Prop::Getter { key, .. }
        | Prop::Setter { key, .. } => Some(key),
        Prop::Shorthand { .. } | Prop::Spread { .. } => None,
    }
}

/// Object literal key for a non-computed property name.
pub(crate) fn static_property_key(key: &PropName) -> IRPropertyKey {
    match key {
        PropName::Ident { name } => IRPropertyKey::Identifier(name.clone()),
        PropName::Str { value } if is_identifier_name(value) => {
            IRPropertyKey::Identifier(value.clone())
        }
        PropName::Str { value } => IRPropertyKey::StringLiteral(value.clone()),
        PropName::Num { value } => IRPropertyKey::NumericLiteral(format_number(*value)),
        // Callers split computed keys off before building a literal
        PropName::Computed { .. } => IRPropertyKey::StringLiteral(String::new()),
    }
}

/// Name given to a method's function expression, so stack traces keep it.
/// Skipped when the name is not a valid binding or when the body mentions it
/// (naming the function would shadow the outer binding).
pub(crate) fn method_function_name(key: &PropName, body: &[Stmt]) -> Option<String> {
    let name = match key {
        PropName::Ident { name } => name,
        PropName::Str { value } => value,
        PropName::Num { .. } | PropName::Computed { .. } => return None,
    };
    (is_identifier_name(name) && !is_reserved_word(name) && !mentions_name(body, name))
        .then(|| name.clone())
}

pub(crate) fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c == '$' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
}

pub(crate) fn is_reserved_word(name: &str) -> bool {
    matches!(
        name,
        "break"
            | "case"
            | "catch"
            | "class"
            | "const"
            | "continue"
            | "debugger"
            | "default"
            | "delete"
            | "do"
            | "else"
            | "enum"
            | "export"
            | "extends"
            | "false"
            | "finally"
            | "for"
            | "function"
            | "if"
            | "implements"
            | "import"
            | "in"
            | "instanceof"
            | "interface"
            | "let"
            | "new"
            | "null"
            | "package"
            | "private"
            | "protected"
            | "public"
            | "return"
            | "static"
            | "super"
            | "switch"
            | "this"
            | "throw"
            | "true"
            | "try"
            | "typeof"
            | "var"
            | "void"
            | "while"
            | "with"
            | "yield"
            | "arguments"
            | "eval"
    )
}

pub(crate) fn stmt_span(stmt: &Stmt) -> Span {
    match stmt {
        Stmt::Function(f) => f.span,
        Stmt::Class(c) => c.span,
        Stmt::Namespace(ns) => ns.span,
        Stmt::With { span, .. } => *span,
        Stmt::Export { decl } => stmt_span(decl),
        Stmt::Expr { expr } => expr_span(expr),
        _ => Span::DUMMY,
    }
}

pub(crate) fn expr_span(expr: &Expr) -> Span {
    match expr {
        Expr::Function(f) => f.span,
        Expr::Arrow(a) => a.span,
        Expr::Class(c) => c.span,
        Expr::Assign { span, .. }
        | Expr::SuperCall { span, .. }
        | Expr::SuperMember { span, .. }
        | Expr::Await { span, .. }
        | Expr::Yield { span, .. } => *span,
        _ => Span::DUMMY,
    }
}

#[cfg(test)]
#[path = "../../tests/ast_to_ir.rs"]
mod tests;
