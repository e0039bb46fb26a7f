//! Direct evaluation of a suspending function's syntax tree. Each `await` or
//! `yield` suspends in place and resumes through [`suspend`].

use super::value::{
    Flow, LoopStep, Outcome, Res, Value, binary, call_host, loop_step, suspend, switch_step,
    unary,
};
use esdown_ast::{
    AssignOp, Expr, ForInit, Lit, LogicalOp, MemberProp, Stmt, UpdateOp, VarDecl, VarKind,
};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

enum Place {
    Var(String),
    Elem(Rc<RefCell<Vec<Value>>>, usize),
}

const GLOBAL: usize = 0;
const FUNCTION: usize = 1;

pub struct AstEvaluator {
    /// Innermost last: unit globals, the function body, then one map per
    /// open block.
    scopes: Vec<FxHashMap<String, Value>>,
    pub log: Vec<String>,
}

/// Run the function declared by `stmt` with `args`.
pub fn run_direct(stmt: &Stmt, args: &[Value]) -> (Outcome, Vec<String>) {
    run_direct_with(stmt, args, &[])
}

/// Like [`run_direct`], with unit-level variables the function can see.
pub fn run_direct_with(
    stmt: &Stmt,
    args: &[Value],
    globals: &[(&str, Value)],
) -> (Outcome, Vec<String>) {
    let Stmt::Function(function) = stmt else {
        panic!("expected a function declaration");
    };
    let globals = globals
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    let mut eval = AstEvaluator {
        scopes: vec![globals, FxHashMap::default()],
        log: Vec::new(),
    };
    for (i, param) in function.params.iter().enumerate() {
        let value = args.get(i).cloned().unwrap_or(Value::Undefined);
        eval.scopes[FUNCTION].insert(param.name.clone(), value);
    }
    let outcome = match eval.exec_stmts(&function.body) {
        Ok(Flow::Return(v)) => Outcome::Return(v),
        Ok(Flow::Normal) => Outcome::Return(Value::Undefined),
        Ok(flow) => panic!("{flow:?} escaped the function body"),
        Err(e) => Outcome::Throw(e),
    };
    (outcome, eval.log)
}

impl AstEvaluator {
    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Res<Flow> {
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt) -> Res<Flow> {
        self.exec_labeled(stmt, &[])
    }

    /// Run `f` in a new block scope.
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Res<T>) -> Res<T> {
        self.scopes.push(FxHashMap::default());
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn bind(&mut self, kind: VarKind, name: &str, value: Option<Value>) {
        let scope = match kind {
            VarKind::Var => FUNCTION,
            VarKind::Let | VarKind::Const => self.scopes.len() - 1,
        };
        let scope = &mut self.scopes[scope];
        match value {
            Some(value) => {
                scope.insert(name.to_string(), value);
            }
            None if kind == VarKind::Var => {
                scope.entry(name.to_string()).or_insert(Value::Undefined);
            }
            None => {
                scope.insert(name.to_string(), Value::Undefined);
            }
        }
    }

    fn declare(&mut self, decl: &VarDecl) -> Res<()> {
        for d in &decl.declarators {
            let value = d.init.as_ref().map(|init| self.eval(init)).transpose()?;
            self.bind(decl.kind, &d.name, value);
        }
        Ok(())
    }

    fn exec_labeled(&mut self, stmt: &Stmt, labels: &[String]) -> Res<Flow> {
        match stmt {
            Stmt::Expr { expr } => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Var(decl) => {
                self.declare(decl)?;
                Ok(Flow::Normal)
            }
            Stmt::Return { arg } => {
                let value = match arg {
                    Some(e) => self.eval(e)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.truthy() {
                    self.exec(consequent)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block { body } => self.scoped(|this| this.exec_stmts(body)),
            Stmt::While { test, body } => {
                while self.eval(test)?.truthy() {
                    match loop_step(self.exec(body)?, labels) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(flow) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::DoWhile { body, test } => {
                loop {
                    match loop_step(self.exec(body)?, labels) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(flow) => return Ok(flow),
                    }
                    if !self.eval(test)?.truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.scoped(|this| {
                match init {
                    Some(ForInit::Var(decl)) => this.declare(decl)?,
                    Some(ForInit::Expr { expr }) => {
                        this.eval(expr)?;
                    }
                    None => {}
                }
                loop {
                    if let Some(test) = test
                        && !this.eval(test)?.truthy()
                    {
                        break;
                    }
                    match loop_step(this.exec(body)?, labels) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(flow) => return Ok(flow),
                    }
                    if let Some(update) = update {
                        this.eval(update)?;
                    }
                }
                Ok(Flow::Normal)
            }),
            Stmt::ForOf {
                kind,
                binding,
                iterable,
                body,
            } => {
                let Value::Array(items) = self.eval(iterable)? else {
                    panic!("for-of over a non-array");
                };
                self.scoped(|this| {
                    let mut index = 0;
                    while index < items.borrow().len() {
                        let item = items.borrow()[index].clone();
                        this.bind(*kind, binding, Some(item));
                        match loop_step(this.exec(body)?, labels) {
                            LoopStep::Next => {}
                            LoopStep::Exit => break,
                            LoopStep::Propagate(flow) => return Ok(flow),
                        }
                        index += 1;
                    }
                    Ok(Flow::Normal)
                })
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                let value = self.eval(discriminant)?;
                let mut start = None;
                for (i, case) in cases.iter().enumerate() {
                    if let Some(test) = &case.test
                        && self.eval(test)?.strict_eq(&value)
                    {
                        start = Some(i);
                        break;
                    }
                }
                let Some(start) = start.or_else(|| cases.iter().position(|c| c.test.is_none()))
                else {
                    return Ok(Flow::Normal);
                };
                self.scoped(|this| {
                    for case in &cases[start..] {
                        for stmt in &case.body {
                            if let Some(flow) = switch_step(this.exec(stmt)?, labels) {
                                return Ok(flow);
                            }
                        }
                    }
                    Ok(Flow::Normal)
                })
            }
            Stmt::Try(t) => {
                let mut result = self.scoped(|this| this.exec_stmts(&t.block));
                if let Some(handler) = &t.handler
                    && let Err(error) = result.clone()
                {
                    // The catch binding lives in the catch block only.
                    result = self.scoped(|this| {
                        if let Some(param) = &handler.param {
                            this.bind(VarKind::Let, param, Some(error));
                        }
                        this.exec_stmts(&handler.body)
                    });
                }
                if let Some(finalizer) = &t.finalizer {
                    match self.scoped(|this| this.exec_stmts(finalizer))? {
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                result
            }
            Stmt::Throw { arg } => Err(self.eval(arg)?),
            Stmt::Break { label } => Ok(Flow::Break(label.clone())),
            Stmt::Continue { label } => Ok(Flow::Continue(label.clone())),
            Stmt::Labeled { label, body } => {
                let mut inner = labels.to_vec();
                inner.push(label.clone());
                match self.exec_labeled(body, &inner)? {
                    Flow::Break(Some(l)) if &l == label => Ok(Flow::Normal),
                    other => Ok(other),
                }
            }
            Stmt::Empty => Ok(Flow::Normal),
            other => panic!("statement not supported by the direct evaluator: {other:?}"),
        }
    }

    fn lookup(&self, name: &str) -> Value {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).cloned())
            .unwrap_or_else(|| Value::lookup_global(name))
    }

    fn resolve(&mut self, target: &Expr) -> Res<Place> {
        match target {
            Expr::Ident { name } => Ok(Place::Var(name.clone())),
            Expr::Member {
                object,
                property: MemberProp::Computed { expr },
            } => {
                let Value::Array(items) = self.eval(object)? else {
                    panic!("element assignment on a non-array");
                };
                let index = self.eval(expr)?.to_number() as usize;
                Ok(Place::Elem(items, index))
            }
            other => panic!("assignment target not supported: {other:?}"),
        }
    }

    fn read(&self, place: &Place) -> Value {
        match place {
            Place::Var(name) => self.lookup(name),
            Place::Elem(items, i) => items.borrow().get(*i).cloned().unwrap_or(Value::Undefined),
        }
    }

    fn write(&mut self, place: &Place, value: Value) {
        match place {
            Place::Var(name) => {
                let scope = self
                    .scopes
                    .iter_mut()
                    .rev()
                    .find(|scope| scope.contains_key(name));
                match scope {
                    Some(scope) => {
                        scope.insert(name.clone(), value);
                    }
                    None => {
                        self.scopes[GLOBAL].insert(name.clone(), value);
                    }
                }
            }
            Place::Elem(items, i) => {
                let mut items = items.borrow_mut();
                if items.len() <= *i {
                    items.resize(*i + 1, Value::Undefined);
                }
                items[*i] = value;
            }
        }
    }

    fn eval_args(&mut self, args: &[esdown_ast::ExprOrSpread]) -> Res<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            let v = self.eval(&a.expr)?;
            if a.spread {
                values.extend(v.array_items());
            } else {
                values.push(v);
            }
        }
        Ok(values)
    }

    fn eval(&mut self, expr: &Expr) -> Res<Value> {
        let value = match expr {
            Expr::Ident { name } => self.lookup(name),
            Expr::Lit { value } => match value {
                Lit::Num(n) => Value::Num(*n),
                Lit::Str(s) => Value::Str(s.clone()),
                Lit::Bool(b) => Value::Bool(*b),
                Lit::Null => Value::Null,
                Lit::Undefined => Value::Undefined,
                Lit::Regex { .. } => panic!("regex literals are not supported"),
            },
            Expr::Template { quasis, exprs } => {
                let mut out = quasis.first().cloned().unwrap_or_default();
                for (i, e) in exprs.iter().enumerate() {
                    out.push_str(&self.eval(e)?.to_js_string());
                    out.push_str(quasis.get(i + 1).map_or("", String::as_str));
                }
                Value::Str(out)
            }
            Expr::Array { elements } => {
                let mut items = Vec::with_capacity(elements.len());
                for el in elements {
                    match el {
                        Some(e) if e.spread => items.extend(self.eval(&e.expr)?.array_items()),
                        Some(e) => items.push(self.eval(&e.expr)?),
                        None => items.push(Value::Undefined),
                    }
                }
                Value::array(items)
            }
            Expr::Unary { op, arg } => {
                let v = self.eval(arg)?;
                unary(op.as_str(), v)
            }
            Expr::Update { op, prefix, arg } => {
                let place = self.resolve(arg)?;
                let old = self.read(&place).to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.write(&place, Value::Num(new));
                Value::Num(if *prefix { new } else { old })
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                binary(op.as_str(), &l, &r)
            }
            Expr::Logical { op, left, right } => {
                let l = self.eval(left)?;
                let short_circuits = match op {
                    LogicalOp::And => !l.truthy(),
                    LogicalOp::Or => l.truthy(),
                    LogicalOp::Nullish => !l.is_nullish(),
                };
                if short_circuits { l } else { self.eval(right)? }
            }
            Expr::Assign {
                op, target, value, ..
            } => {
                let place = self.resolve(target)?;
                let result = match op {
                    AssignOp::Assign => self.eval(value)?,
                    compound => {
                        let old = self.read(&place);
                        let r = self.eval(value)?;
                        let bin = compound.binary_op().map_or("+", |b| b.as_str());
                        binary(bin, &old, &r)
                    }
                };
                self.write(&place, result.clone());
                result
            }
            Expr::Cond {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.truthy() {
                    self.eval(consequent)?
                } else {
                    self.eval(alternate)?
                }
            }
            Expr::Call { callee, args } => {
                let f = self.eval(callee)?;
                let values = self.eval_args(args)?;
                call_host(&mut self.log, &f, values)?
            }
            Expr::Member { object, property } => {
                let obj = self.eval(object)?;
                match property {
                    MemberProp::Ident { name } => obj.get_named(name),
                    MemberProp::Computed { expr } => {
                        let key = self.eval(expr)?;
                        obj.get_index(&key)
                    }
                }
            }
            Expr::Seq { exprs } => {
                let mut last = Value::Undefined;
                for e in exprs {
                    last = self.eval(e)?;
                }
                last
            }
            Expr::Await { arg, .. } => {
                let v = self.eval(arg)?;
                suspend(&mut self.log, v)?
            }
            Expr::Yield {
                arg,
                delegate: false,
                ..
            } => {
                let v = match arg {
                    Some(a) => self.eval(a)?,
                    None => Value::Undefined,
                };
                suspend(&mut self.log, v)?
            }
            // Delegating to an array yields its items; the values sent back
            // are dropped and the delegation evaluates to undefined.
            Expr::Yield {
                arg,
                delegate: true,
                ..
            } => {
                let iterable = match arg {
                    Some(a) => self.eval(a)?,
                    None => Value::Undefined,
                };
                for item in iterable.array_items() {
                    suspend(&mut self.log, item)?;
                }
                Value::Undefined
            }
            other => panic!("expression not supported by the direct evaluator: {other:?}"),
        };
        Ok(value)
    }
}
