//! Syntax tree to state machine.
//!
//! Statements and expressions without a suspension point are lowered by the
//! ordinary rules and appended to the current case after two rewrites:
//! declarations are hoisted out of them, and `return` / `break` / `continue`
//! that leave them become driver instructions. Everything that suspends is
//! taken apart here so each suspension ends a case.

use super::builder::{FrameKind, Label, MachineBuilder};
use super::StateMachine;
use crate::error::{LowerError, LowerResult};
use crate::transforms::ast_to_ir::{
    AstToIr, build_binary, build_template, expr_span, push_flat, static_property_key, stmt_span,
    strip_spread,
};
use crate::transforms::ir::{IRNode, IRProperty, IRPropertyKind, IRSwitchCase};
use esdown_ast::{
    AssignOp, Expr, ExprOrSpread, ForInit, LogicalOp, MemberProp, Prop, Stmt, SwitchCase, TryStmt,
    VarDecl, VarKind, contains_suspension, stmt_contains_suspension,
};
use esdown_common::Span;
use tracing::instrument;

/// Builder plus what the body may contain.
pub(crate) struct Machine {
    pub(crate) builder: MachineBuilder,
    is_async: bool,
}

impl AstToIr<'_> {
    #[instrument(level = "debug", skip_all, fields(statements = body.len(), is_async = is_async))]
    pub(crate) fn lower_to_state_machine(
        &mut self,
        body: &[Stmt],
        is_async: bool,
    ) -> LowerResult<StateMachine> {
        let state = self.ctx.well_known("state");
        let mut m = Machine {
            builder: MachineBuilder::new(state),
            is_async,
        };
        for stmt in body {
            self.machine_stmt(&mut m, stmt)?;
        }
        Ok(m.builder.finish()?)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn machine_stmt(&mut self, m: &mut Machine, stmt: &Stmt) -> LowerResult<()> {
        if !stmt_contains_suspension(stmt) {
            return self.plain_stmt(m, stmt);
        }
        self.ctx.enter(stmt_span(stmt))?;
        let result = self.machine_stmt_inner(m, stmt);
        self.ctx.exit();
        result
    }

    fn plain_stmt(&mut self, m: &mut Machine, stmt: &Stmt) -> LowerResult<()> {
        let node = self.plain_ir(m, stmt)?;
        let mut flat = Vec::new();
        push_flat(&mut flat, node);
        for node in flat {
            m.builder.emit_stmt(node);
        }
        Ok(())
    }

    /// Lower a statement without suspension points for use inside a case.
    fn plain_ir(&mut self, m: &mut Machine, stmt: &Stmt) -> LowerResult<IRNode> {
        let mut node = self.lower_stmt(stmt)?;
        DeclarationHoister {
            builder: &mut m.builder,
        }
        .hoist(&mut node);
        let mut rewriter = JumpRewriter {
            builder: &m.builder,
            loops: 0,
            switches: 0,
            labels: Vec::new(),
            error: None,
        };
        rewriter.rewrite(&mut node);
        match rewriter.error {
            Some(e) => Err(e),
            None => Ok(node),
        }
    }

    fn machine_stmt_inner(&mut self, m: &mut Machine, stmt: &Stmt) -> LowerResult<()> {
        match stmt {
            Stmt::Expr { expr } => {
                let value = self.machine_expr(m, expr)?;
                m.builder.emit_stmt(IRNode::expr_stmt(value));
            }
            Stmt::Var(decl) => self.machine_var_decl(m, decl)?,
            Stmt::Return { arg } => {
                let value = arg.as_ref().map(|e| self.machine_expr(m, e)).transpose()?;
                m.builder.emit_return(value);
            }
            Stmt::Throw { arg } => {
                let value = self.machine_expr(m, arg)?;
                m.builder.emit_throw(value);
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => self.machine_if(m, test, consequent, alternate.as_deref())?,
            Stmt::Block { body } => {
                self.in_block(|this| body.iter().try_for_each(|s| this.machine_stmt(m, s)))?;
            }
            Stmt::While { test, body } => {
                let cond = m.builder.define_label();
                let end = m.builder.define_label();
                m.builder.mark_label(cond);
                m.builder.add_loop_header(cond);
                let condition = self.machine_expr(m, test)?;
                m.builder.emit_jump_if_false(condition, end);
                m.builder.push_frame(FrameKind::Loop, end, Some(cond));
                self.machine_stmt(m, body)?;
                m.builder.pop_frame();
                m.builder.emit_jump(cond);
                m.builder.mark_label(end);
            }
            Stmt::DoWhile { body, test } => {
                let top = m.builder.define_label();
                let cond = m.builder.define_label();
                let end = m.builder.define_label();
                m.builder.mark_label(top);
                m.builder.add_loop_header(top);
                m.builder.push_frame(FrameKind::Loop, end, Some(cond));
                self.machine_stmt(m, body)?;
                m.builder.pop_frame();
                m.builder.mark_label(cond);
                let condition = self.machine_expr(m, test)?;
                m.builder.emit_jump_if_true(condition, top);
                m.builder.mark_label(end);
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.in_block(|this| {
                this.machine_for(m, init.as_ref(), test.as_ref(), update.as_ref(), body)
            })?,
            Stmt::ForOf {
                kind,
                binding,
                iterable,
                body,
            } => self.in_block(|this| this.machine_for_of(m, *kind, binding, iterable, body))?,
            Stmt::Switch {
                discriminant,
                cases,
            } => self.machine_switch(m, discriminant, cases)?,
            Stmt::Try(try_stmt) => self.machine_try(m, try_stmt)?,
            Stmt::Labeled { label, body } => match body.as_ref() {
                Stmt::While { .. }
                | Stmt::DoWhile { .. }
                | Stmt::For { .. }
                | Stmt::ForOf { .. }
                | Stmt::Switch { .. }
                | Stmt::Labeled { .. } => {
                    m.builder.add_pending_label(label);
                    self.machine_stmt(m, body)?;
                }
                other => {
                    let end = m.builder.define_label();
                    m.builder.add_pending_label(label);
                    m.builder.push_frame(FrameKind::Labeled, end, None);
                    self.machine_stmt(m, other)?;
                    m.builder.pop_frame();
                    m.builder.mark_label(end);
                }
            },
            Stmt::Class(class) => {
                return Err(LowerError::unsupported(
                    "suspension point in a class heritage clause",
                    class.span,
                ));
            }
            Stmt::Namespace(ns) => {
                return Err(LowerError::unsupported(
                    "suspension point in a namespace body",
                    ns.span,
                ));
            }
            Stmt::With { span, .. } => return Err(LowerError::unsupported("with statement", *span)),
            // Nothing else can hold a suspension point evaluated by this function.
            Stmt::Function(_)
            | Stmt::Export { .. }
            | Stmt::Break { .. }
            | Stmt::Continue { .. }
            | Stmt::Empty => self.plain_stmt(m, stmt)?,
        }
        Ok(())
    }

    fn machine_for(
        &mut self,
        m: &mut Machine,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> LowerResult<()> {
        match init {
            Some(ForInit::Var(decl)) => self.machine_var_decl(m, decl)?,
            Some(ForInit::Expr { expr }) => {
                let value = self.machine_expr(m, expr)?;
                m.builder.emit_stmt(IRNode::expr_stmt(value));
            }
            None => {}
        }
        let cond = m.builder.define_label();
        let next = m.builder.define_label();
        let end = m.builder.define_label();
        m.builder.mark_label(cond);
        m.builder.add_loop_header(cond);
        if let Some(test) = test {
            let condition = self.machine_expr(m, test)?;
            m.builder.emit_jump_if_false(condition, end);
        }
        m.builder.push_frame(FrameKind::Loop, end, Some(next));
        self.machine_stmt(m, body)?;
        m.builder.pop_frame();
        m.builder.mark_label(next);
        if let Some(update) = update {
            let value = self.machine_expr(m, update)?;
            m.builder.emit_stmt(IRNode::expr_stmt(value));
        }
        m.builder.emit_jump(cond);
        m.builder.mark_label(end);
        Ok(())
    }

    fn machine_var_decl(&mut self, m: &mut Machine, decl: &VarDecl) -> LowerResult<()> {
        for declarator in &decl.declarators {
            let name = self.declare_binding(decl.kind, &declarator.name);
            m.builder.hoist_var(name.clone());
            if let Some(init) = &declarator.init {
                let value = self.machine_expr(m, init)?;
                m.builder
                    .emit_stmt(IRNode::expr_stmt(IRNode::assign(IRNode::id(name), value)));
            }
        }
        Ok(())
    }

    fn machine_if(
        &mut self,
        m: &mut Machine,
        test: &Expr,
        consequent: &Stmt,
        alternate: Option<&Stmt>,
    ) -> LowerResult<()> {
        let condition = self.machine_expr(m, test)?;

        // Only the test suspends: the branches stay a native `if`.
        if !stmt_contains_suspension(consequent) && !alternate.is_some_and(stmt_contains_suspension) {
            let then_branch = self.plain_ir(m, consequent)?;
            let else_branch = alternate.map(|a| self.plain_ir(m, a)).transpose()?;
            m.builder.emit_stmt(IRNode::IfStatement {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: else_branch.map(Box::new),
            });
            return Ok(());
        }

        let end = m.builder.define_label();
        match alternate {
            Some(alternate) => {
                let otherwise = m.builder.define_label();
                m.builder.emit_jump_if_false(condition, otherwise);
                self.machine_stmt(m, consequent)?;
                m.builder.emit_jump(end);
                m.builder.mark_label(otherwise);
                self.machine_stmt(m, alternate)?;
            }
            None => {
                m.builder.emit_jump_if_false(condition, end);
                self.machine_stmt(m, consequent)?;
            }
        }
        m.builder.mark_label(end);
        Ok(())
    }

    fn machine_for_of(
        &mut self,
        m: &mut Machine,
        kind: VarKind,
        binding: &str,
        iterable: &Expr,
        body: &Stmt,
    ) -> LowerResult<()> {
        let index = self.ctx.fresh_name("i");
        let iter = self.ctx.fresh_name("iter");
        m.builder.hoist_var(index.clone());
        m.builder.hoist_var(iter.clone());

        let iterable = self.machine_expr(m, iterable)?;
        m.builder.emit_stmt(IRNode::expr_stmt(IRNode::CommaExpr(vec![
            IRNode::assign(IRNode::id(&index), IRNode::int(0)),
            IRNode::assign(IRNode::id(&iter), iterable),
        ])));

        let cond = m.builder.define_label();
        let next = m.builder.define_label();
        let end = m.builder.define_label();
        m.builder.mark_label(cond);
        m.builder.add_loop_header(cond);
        m.builder.emit_jump_if_false(
            IRNode::binary(
                IRNode::id(&index),
                "<",
                IRNode::prop(IRNode::id(&iter), "length"),
            ),
            end,
        );

        let name = self.declare_binding(kind, binding);
        m.builder.hoist_var(name.clone());
        m.builder.emit_stmt(IRNode::expr_stmt(IRNode::assign(
            IRNode::id(name),
            IRNode::elem(IRNode::id(&iter), IRNode::id(&index)),
        )));

        m.builder.push_frame(FrameKind::Loop, end, Some(next));
        self.machine_stmt(m, body)?;
        m.builder.pop_frame();

        m.builder.mark_label(next);
        m.builder.emit_stmt(IRNode::expr_stmt(IRNode::PostfixUnaryExpr {
            operand: Box::new(IRNode::id(&index)),
            operator: "++".to_string(),
        }));
        m.builder.emit_jump(cond);
        m.builder.mark_label(end);
        Ok(())
    }

    /// Dispatch with a native switch whose cases only jump, then lay the
    /// case bodies out in order so fallthrough is preserved.
    fn machine_switch(
        &mut self,
        m: &mut Machine,
        discriminant: &Expr,
        cases: &[SwitchCase],
    ) -> LowerResult<()> {
        if let Some(test) = cases
            .iter()
            .filter_map(|c| c.test.as_ref())
            .find(|t| contains_suspension(t))
        {
            return Err(LowerError::unsupported(
                "suspension point in a switch case test",
                expr_span(test),
            ));
        }

        let value = self.machine_expr(m, discriminant)?;
        let labels: Vec<_> = cases.iter().map(|_| m.builder.define_label()).collect();
        let end = m.builder.define_label();

        let mut dispatch = Vec::with_capacity(cases.len());
        let mut default = None;
        for (case, label) in cases.iter().zip(&labels) {
            match &case.test {
                Some(test) => dispatch.push(IRSwitchCase {
                    test: Some(self.lower_expr(test)?),
                    statements: vec![IRNode::ret(Some(IRNode::generator_op(
                        3,
                        Some(label.reference()),
                    )))],
                }),
                None => default = Some(*label),
            }
        }
        if !dispatch.is_empty() {
            m.builder.emit_stmt(IRNode::SwitchStatement {
                expression: Box::new(value),
                cases: dispatch,
            });
        } else {
            m.builder.emit_stmt(IRNode::expr_stmt(value));
        }
        m.builder.emit_jump(default.unwrap_or(end));

        m.builder.push_frame(FrameKind::Switch, end, None);
        self.in_block(|this| {
            for (case, label) in cases.iter().zip(labels) {
                m.builder.mark_label(label);
                for s in &case.body {
                    this.machine_stmt(m, s)?;
                }
            }
            Ok(())
        })?;
        m.builder.pop_frame();
        m.builder.mark_label(end);
        Ok(())
    }

    fn machine_try(&mut self, m: &mut Machine, try_stmt: &TryStmt) -> LowerResult<()> {
        m.builder
            .begin_exception_block(try_stmt.handler.is_some(), try_stmt.finalizer.is_some());
        self.in_block(|this| try_stmt.block.iter().try_for_each(|s| this.machine_stmt(m, s)))?;

        if let Some(handler) = &try_stmt.handler {
            // The caught value lives in a function-level variable, so the
            // binding is always renamed: a parameter or an outer variable of
            // the same name must keep its value after the catch block.
            let variable = self
                .ctx
                .fresh_name(handler.param.as_deref().unwrap_or("e"));
            m.builder.hoist_var(variable.clone());
            m.builder.begin_catch(&variable);
            self.in_block(|this| {
                if let Some(param) = &handler.param {
                    this.ctx.push_rename(param, &variable);
                    this.ctx.declare_name(param);
                }
                handler.body.iter().try_for_each(|s| this.machine_stmt(m, s))
            })?;
        }

        if let Some(finalizer) = &try_stmt.finalizer {
            m.builder.begin_finally();
            self.in_block(|this| finalizer.iter().try_for_each(|s| this.machine_stmt(m, s)))?;
        }
        m.builder.end_exception_block();
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Lower an expression inside a machine. Suspension points end the
    /// current case; the returned node is valid in the case that is current
    /// afterwards.
    fn machine_expr(&mut self, m: &mut Machine, expr: &Expr) -> LowerResult<IRNode> {
        if !contains_suspension(expr) {
            return self.lower_expr(expr);
        }
        self.ctx.enter(expr_span(expr))?;
        let result = self.machine_expr_inner(m, expr);
        self.ctx.exit();
        result
    }

    fn machine_expr_inner(&mut self, m: &mut Machine, expr: &Expr) -> LowerResult<IRNode> {
        match expr {
            Expr::Await { arg, span } => {
                if !m.is_async {
                    return Err(LowerError::unsupported(
                        "await outside an async function",
                        *span,
                    ));
                }
                let value = self.machine_expr(m, arg)?;
                m.builder.emit_yield(Some(value));
                Ok(IRNode::GeneratorSent)
            }
            Expr::Yield {
                arg,
                delegate,
                span,
            } => {
                if m.is_async {
                    return Err(LowerError::unsupported(
                        "yield outside a generator function",
                        *span,
                    ));
                }
                let value = arg.as_ref().map(|a| self.machine_expr(m, a)).transpose()?;
                if *delegate {
                    let iterable = value.unwrap_or(IRNode::Undefined);
                    let iterator = self.ctx.helper_call("ts_values", vec![iterable])?;
                    m.builder.emit_yield_star(iterator);
                } else {
                    m.builder.emit_yield(value);
                }
                Ok(IRNode::GeneratorSent)
            }
            Expr::Unary { op, arg } => Ok(IRNode::prefix(op.as_str(), self.machine_expr(m, arg)?)),
            Expr::Update { op, prefix, arg } => {
                self.check_assignment_target(arg, expr_span(expr))?;
                let operand = Box::new(self.machine_expr(m, arg)?);
                let operator = op.as_str().to_string();
                Ok(if *prefix {
                    IRNode::PrefixUnaryExpr { operator, operand }
                } else {
                    IRNode::PostfixUnaryExpr { operand, operator }
                })
            }
            Expr::Binary { op, left, right } => {
                let mut values = self.machine_operands(m, &[&**left, &**right])?;
                let right = values.pop().unwrap_or(IRNode::Undefined);
                let left = values.pop().unwrap_or(IRNode::Undefined);
                self.lower_binary(*op, left, right)
            }
            Expr::Logical { op, left, right } => self.machine_logical(m, *op, left, right),
            Expr::Cond {
                test,
                consequent,
                alternate,
            } => {
                let condition = self.machine_expr(m, test)?;
                if !contains_suspension(consequent) && !contains_suspension(alternate) {
                    return Ok(IRNode::conditional(
                        condition,
                        self.lower_expr(consequent)?,
                        self.lower_expr(alternate)?,
                    ));
                }
                let temp = self.ctx.declare_temp("tmp");
                let otherwise = m.builder.define_label();
                let end = m.builder.define_label();
                m.builder.emit_jump_if_false(condition, otherwise);
                let value = self.machine_expr(m, consequent)?;
                emit_assign(m, &temp, value);
                m.builder.emit_jump(end);
                m.builder.mark_label(otherwise);
                let value = self.machine_expr(m, alternate)?;
                emit_assign(m, &temp, value);
                m.builder.mark_label(end);
                Ok(IRNode::id(temp))
            }
            Expr::Template { quasis, exprs } => {
                let operands: Vec<&Expr> = exprs.iter().collect();
                let values = self.machine_operands(m, &operands)?;
                Ok(build_template(quasis, values))
            }
            Expr::Array { elements } => {
                let operands: Vec<&Expr> = elements.iter().flatten().map(|e| &e.expr).collect();
                let mut values = self.machine_operands(m, &operands)?.into_iter();
                let mut pieces = Vec::with_capacity(elements.len());
                for element in elements {
                    pieces.push(match element {
                        Some(e) => (e.spread, values.next().unwrap_or(IRNode::Undefined)),
                        None => (false, IRNode::OmittedExpression),
                    });
                }
                if pieces.iter().any(|(spread, _)| *spread) {
                    self.spread_array(pieces)
                } else {
                    Ok(IRNode::ArrayLiteral(strip_spread(pieces)))
                }
            }
            Expr::Object { props } => self.machine_object(m, props),
            Expr::Call { callee, args } => self.machine_call(m, callee, args),
            Expr::New { callee, args } => {
                let mut operands: Vec<&Expr> = vec![&**callee];
                operands.extend(args.iter().map(|a| &a.expr));
                let mut values = self.machine_operands(m, &operands)?.into_iter();
                let callee = values.next().unwrap_or(IRNode::Undefined);
                let pieces: Vec<(bool, IRNode)> = args.iter().map(|a| a.spread).zip(values).collect();
                if pieces.iter().any(|(spread, _)| *spread) {
                    self.spread_new(callee, pieces)
                } else {
                    Ok(IRNode::new_expr(callee, strip_spread(pieces)))
                }
            }
            Expr::Member { object, property } => match property {
                MemberProp::Ident { name } => Ok(IRNode::prop(self.machine_expr(m, object)?, name)),
                MemberProp::Computed { expr: key } => {
                    let mut values = self.machine_operands(m, &[&**object, &**key])?;
                    let key = values.pop().unwrap_or(IRNode::Undefined);
                    let object = values.pop().unwrap_or(IRNode::Undefined);
                    Ok(IRNode::elem(object, key))
                }
            },
            Expr::Assign {
                op,
                target,
                value,
                span,
            } => self.machine_assign(m, *op, target, value, *span),
            Expr::SuperCall { args, span } => {
                let pieces = self.machine_args(m, args)?;
                self.lower_super_call(pieces, *span)
            }
            Expr::Seq { exprs } => {
                let Some((last, init)) = exprs.split_last() else {
                    return Ok(IRNode::Undefined);
                };
                for e in init {
                    let value = self.machine_expr(m, e)?;
                    m.builder.emit_stmt(IRNode::expr_stmt(value));
                }
                self.machine_expr(m, last)
            }
            _ => Err(LowerError::unsupported(
                "suspension point in this position",
                expr_span(expr),
            )),
        }
    }

    /// Lower operands left to right. Every operand evaluated before the last
    /// one that suspends is saved in a temporary first, so it keeps the value
    /// it had before the suspension.
    fn machine_operands(&mut self, m: &mut Machine, operands: &[&Expr]) -> LowerResult<Vec<IRNode>> {
        let last = operands.iter().rposition(|e| contains_suspension(e));
        let mut out = Vec::with_capacity(operands.len());
        for (i, operand) in operands.iter().enumerate() {
            let value = self.machine_expr(m, operand)?;
            out.push(match last {
                Some(last) if i < last => self.keep(m, value),
                _ => value,
            });
        }
        Ok(out)
    }

    fn machine_args(&mut self, m: &mut Machine, args: &[ExprOrSpread]) -> LowerResult<Vec<(bool, IRNode)>> {
        let operands: Vec<&Expr> = args.iter().map(|a| &a.expr).collect();
        let values = self.machine_operands(m, &operands)?;
        Ok(args.iter().map(|a| a.spread).zip(values).collect())
    }

    /// Save `value` in a temporary unless re-reading it is unobservable.
    fn keep(&mut self, m: &mut Machine, value: IRNode) -> IRNode {
        if value.is_literal() || matches!(value, IRNode::This { .. }) {
            return value;
        }
        let temp = self.ctx.declare_temp("tmp");
        emit_assign(m, &temp, value);
        IRNode::id(temp)
    }

    fn machine_logical(
        &mut self,
        m: &mut Machine,
        op: LogicalOp,
        left: &Expr,
        right: &Expr,
    ) -> LowerResult<IRNode> {
        let left = self.machine_expr(m, left)?;
        if !contains_suspension(right) {
            let right = self.lower_expr(right)?;
            return Ok(match op {
                LogicalOp::And => IRNode::logical_and(left, right),
                LogicalOp::Or => IRNode::logical_or(left, right),
                LogicalOp::Nullish => self.build_nullish(left, right),
            });
        }

        // The right operand runs only when the left one does not decide.
        let temp = self.ctx.declare_temp("tmp");
        emit_assign(m, &temp, left);
        let end = m.builder.define_label();
        let decided = IRNode::id(&temp);
        match op {
            LogicalOp::And => m.builder.emit_jump_if_false(decided, end),
            LogicalOp::Or => m.builder.emit_jump_if_true(decided, end),
            LogicalOp::Nullish => m.builder.emit_jump_if_true(
                IRNode::logical_and(
                    IRNode::binary(IRNode::id(&temp), "!==", IRNode::NullLiteral),
                    IRNode::binary(IRNode::id(&temp), "!==", IRNode::Undefined),
                ),
                end,
            ),
        }
        let right = self.machine_expr(m, right)?;
        emit_assign(m, &temp, right);
        m.builder.mark_label(end);
        Ok(IRNode::id(temp))
    }

    fn machine_call(&mut self, m: &mut Machine, callee: &Expr, args: &[ExprOrSpread]) -> LowerResult<IRNode> {
        if let Expr::SuperMember { property, span } = callee {
            let method = self.lower_super_member(property, *span)?;
            let receiver = self.ctx.resolve_this();
            let pieces = self.machine_args(m, args)?;
            return self.call_with_receiver(method, receiver, pieces);
        }

        let args_suspend = args.iter().any(|a| contains_suspension(&a.expr));
        let has_spread = args.iter().any(|a| a.spread);
        match callee {
            Expr::Member { object, property } => {
                let computed_suspends =
                    matches!(property, MemberProp::Computed { expr } if contains_suspension(expr));
                let object = self.machine_expr(m, object)?;
                // Spread calls pass the receiver twice.
                let object = if args_suspend || computed_suspends || (has_spread && !object.is_simple()) {
                    self.keep(m, object)
                } else {
                    object
                };
                let function = self.lower_member_with(m, object.clone(), property)?;
                if !args_suspend {
                    let pieces = self.lower_args(args)?;
                    if has_spread {
                        return self.call_with_receiver(function, object, pieces);
                    }
                    return Ok(IRNode::call(function, strip_spread(pieces)));
                }
                // The method is read before the arguments run.
                let function = self.keep(m, function);
                let pieces = self.machine_args(m, args)?;
                self.call_with_receiver(function, object, pieces)
            }
            _ => {
                let function = self.machine_expr(m, callee)?;
                let function = if args_suspend { self.keep(m, function) } else { function };
                let pieces = self.machine_args(m, args)?;
                if has_spread {
                    return self.call_with_receiver(function, IRNode::Undefined, pieces);
                }
                Ok(IRNode::call(function, strip_spread(pieces)))
            }
        }
    }

    fn lower_member_with(&mut self, m: &mut Machine, object: IRNode, property: &MemberProp) -> LowerResult<IRNode> {
        match property {
            MemberProp::Ident { name } => Ok(IRNode::prop(object, name)),
            MemberProp::Computed { expr } => Ok(IRNode::elem(object, self.machine_expr(m, expr)?)),
        }
    }

    fn machine_assign(
        &mut self,
        m: &mut Machine,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        span: Span,
    ) -> LowerResult<IRNode> {
        self.check_assignment_target(target, span)?;
        let value_suspends = contains_suspension(value);

        let place = match target {
            Expr::Ident { name } => self.lower_ident(name),
            Expr::Member { object, property } => {
                let key_suspends =
                    matches!(property, MemberProp::Computed { expr } if contains_suspension(expr));
                let object = self.machine_expr(m, object)?;
                let object = if value_suspends || key_suspends {
                    self.keep(m, object)
                } else {
                    object
                };
                match property {
                    MemberProp::Ident { name } => IRNode::prop(object, name),
                    MemberProp::Computed { expr } => {
                        let key = self.machine_expr(m, expr)?;
                        let key = if value_suspends { self.keep(m, key) } else { key };
                        IRNode::elem(object, key)
                    }
                }
            }
            _ => {
                return Err(LowerError::unsupported(
                    "assignment to a non-reference target",
                    span,
                ));
            }
        };

        match op.binary_op() {
            None => {
                let value = self.machine_expr(m, value)?;
                Ok(IRNode::assign(place, value))
            }
            // `x += await y` reads `x` before suspending.
            Some(binary) if value_suspends => {
                let old = self.keep(m, place.clone());
                let value = self.machine_expr(m, value)?;
                Ok(IRNode::assign(place, build_binary(binary, old, value)))
            }
            Some(_) => {
                let value = self.lower_expr(value)?;
                Ok(IRNode::binary(place, op.as_str(), value))
            }
        }
    }

    fn machine_object(&mut self, m: &mut Machine, props: &[Prop]) -> LowerResult<IRNode> {
        let shorthand: Vec<Expr> = props
            .iter()
            .filter_map(|p| match p {
                Prop::Shorthand { name } => Some(Expr::Ident { name: name.clone() }),
                _ => None,
            })
            .collect();
        let mut shorthand_iter = shorthand.iter();
        let mut operands: Vec<&Expr> = Vec::new();
        for prop in props {
            match prop {
                Prop::KeyValue { key, value } => {
                    if key.is_computed() {
                        return Err(LowerError::unsupported(
                            "suspension point in an object literal with computed keys",
                            expr_span(value),
                        ));
                    }
                    operands.push(value);
                }
                Prop::Shorthand { .. } => {
                    if let Some(ident) = shorthand_iter.next() {
                        operands.push(ident);
                    }
                }
                Prop::Method { key, function }
                | Prop::Getter { key, function }
                | Prop::Setter { key, function } => {
                    if key.is_computed() {
                        return Err(LowerError::unsupported(
                            "suspension point in an object literal with computed keys",
                            function.span,
                        ));
                    }
                }
                Prop::Spread { span, .. } => {
                    return Err(LowerError::unsupported("object spread", *span));
                }
            }
        }

        let mut values = self.machine_operands(m, &operands)?.into_iter();
        let mut properties = Vec::with_capacity(props.len());
        for prop in props {
            match prop {
                Prop::KeyValue { key, .. } => properties.push(IRProperty {
                    key: static_property_key(key),
                    value: values.next().unwrap_or(IRNode::Undefined),
                    kind: IRPropertyKind::Init,
                }),
                Prop::Shorthand { name } => {
                    properties.push(IRProperty::init(name, values.next().unwrap_or(IRNode::Undefined)));
                }
                other => self.lower_static_prop(other, &mut properties)?,
            }
        }
        Ok(IRNode::object(properties))
    }
}

fn emit_assign(m: &mut Machine, temp: &str, value: IRNode) {
    m.builder
        .emit_stmt(IRNode::expr_stmt(IRNode::assign(IRNode::id(temp), value)));
}

// =============================================================================
// Rewrites of statements lowered by the ordinary rules
// =============================================================================

/// Moves `var` declarations and nested function declarations out of a
/// lowered statement into the machine's hoisted lists.
struct DeclarationHoister<'b> {
    builder: &'b mut MachineBuilder,
}

impl DeclarationHoister<'_> {
    fn hoist(&mut self, node: &mut IRNode) {
        match node {
            IRNode::VarDecl { .. } | IRNode::VarDeclList(_) => {
                let decl = std::mem::replace(node, IRNode::Sequence(Vec::new()));
                if let Some(assignments) = self.to_assignments(decl) {
                    *node = IRNode::expr_stmt(assignments);
                }
            }
            IRNode::FunctionDecl { .. } => {
                let decl = std::mem::replace(node, IRNode::Sequence(Vec::new()));
                self.builder.hoist_function(decl);
            }
            IRNode::ForStatement { initializer, .. } => {
                if let Some(init) = initializer.take() {
                    *initializer = match *init {
                        decl @ (IRNode::VarDecl { .. } | IRNode::VarDeclList(_)) => {
                            self.to_assignments(decl).map(Box::new)
                        }
                        other => Some(Box::new(other)),
                    };
                }
                node.for_each_child_mut(&mut |child| self.hoist(child));
            }
            IRNode::FunctionExpr { .. }
            | IRNode::ES5ClassIIFE { .. }
            | IRNode::NamespaceIIFE { .. }
            | IRNode::GeneratorBody { .. } => {}
            _ => node.for_each_child_mut(&mut |child| self.hoist(child)),
        }
    }

    fn to_assignments(&mut self, decl: IRNode) -> Option<IRNode> {
        let decls = match decl {
            IRNode::VarDeclList(decls) => decls,
            single => vec![single],
        };
        let mut assignments = Vec::new();
        for decl in decls {
            if let IRNode::VarDecl { name, initializer } = decl {
                self.builder.hoist_var(name.clone());
                if let Some(init) = initializer {
                    assignments.push(IRNode::assign(IRNode::id(name), *init));
                }
            }
        }
        match assignments.len() {
            0 => None,
            1 => assignments.pop(),
            _ => Some(IRNode::CommaExpr(assignments)),
        }
    }
}

/// Turns `return` and jumps that leave a natively lowered statement into
/// driver instructions.
struct JumpRewriter<'b> {
    builder: &'b MachineBuilder,
    /// Native loops around the current position.
    loops: u32,
    /// Native switches around the current position.
    switches: u32,
    /// Native statement labels around the current position.
    labels: Vec<String>,
    error: Option<LowerError>,
}

impl JumpRewriter<'_> {
    fn rewrite(&mut self, node: &mut IRNode) {
        match node {
            IRNode::ReturnStatement(value) => {
                let value = value.take().map(|v| *v);
                *node = IRNode::ret(Some(IRNode::generator_op(2, value)));
            }
            IRNode::BreakStatement(label) => {
                let native = match label {
                    Some(l) => self.labels.contains(l),
                    None => self.loops + self.switches > 0,
                };
                if !native {
                    let target = self.builder.find_break_target(label.as_deref());
                    self.jump(node, target, "break");
                }
            }
            IRNode::ContinueStatement(label) => {
                let native = match label {
                    Some(l) => self.labels.contains(l),
                    None => self.loops > 0,
                };
                if !native {
                    let target = self.builder.find_continue_target(label.as_deref());
                    self.jump(node, target, "continue");
                }
            }
            IRNode::WhileStatement { .. }
            | IRNode::DoWhileStatement { .. }
            | IRNode::ForStatement { .. } => {
                self.loops += 1;
                node.for_each_child_mut(&mut |child| self.rewrite(child));
                self.loops -= 1;
            }
            IRNode::SwitchStatement { .. } => {
                self.switches += 1;
                node.for_each_child_mut(&mut |child| self.rewrite(child));
                self.switches -= 1;
            }
            IRNode::LabeledStatement { label, statement } => {
                self.labels.push(label.clone());
                self.rewrite(statement);
                self.labels.pop();
            }
            IRNode::FunctionExpr { .. }
            | IRNode::FunctionDecl { .. }
            | IRNode::ES5ClassIIFE { .. }
            | IRNode::NamespaceIIFE { .. }
            | IRNode::GeneratorBody { .. } => {}
            _ => node.for_each_child_mut(&mut |child| self.rewrite(child)),
        }
    }

    fn jump(&mut self, node: &mut IRNode, target: Option<Label>, keyword: &str) {
        match target {
            Some(label) => {
                *node = IRNode::ret(Some(IRNode::generator_op(3, Some(label.reference()))));
            }
            None => {
                self.error.get_or_insert_with(|| {
                    LowerError::unsupported(format!("{keyword} without an enclosing target"), Span::DUMMY)
                });
            }
        }
    }
}
