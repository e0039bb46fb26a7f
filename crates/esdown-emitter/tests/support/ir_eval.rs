//! Runs a lowered state machine the way the `_ts_generator` driver does:
//! instructions returned from the step function are interpreted against the
//! `trys` and `ops` stacks, and exceptions thrown by the step function become
//! `[6, error]`. `[5, iterator]` delegates: the driver yields the iterator's
//! items itself and resumes the machine once it is exhausted.
//!
//! Plain lowered functions run through the same statement interpreter.

use super::value::{
    Flow, LoopStep, Outcome, Res, Value, binary, call_host, loop_step, suspend, switch_step,
    unary,
};
use esdown_ast::{SourceUnit, Stmt};
use esdown_emitter::transforms::AstToIr;
use esdown_emitter::transforms::ir::{IRGeneratorCase, IRNode};
use esdown_emitter::{EmitOptions, LoweringContext};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

const MAX_RESUMES: usize = 10_000;

enum Place {
    Var(String),
    Label,
    Elem(Rc<RefCell<Vec<Value>>>, usize),
}

enum Resume {
    Yield(Value),
    Return(Value),
    Throw(Value),
}

pub struct MachineRunner<'m> {
    cases: &'m [IRGeneratorCase],
    uses_switch: bool,
    env: FxHashMap<String, Value>,
    pub log: Vec<String>,
    label: u32,
    trys: Vec<[Option<u32>; 4]>,
    ops: Vec<(u32, Value)>,
    /// Last instruction the machine was resumed with; read by `_state.sent()`.
    sent: (u32, Value),
    /// Items left in the iterator a `[5, v]` delegated to.
    delegate: Option<std::vec::IntoIter<Value>>,
    done: bool,
}

/// Lower the function declared by `stmt`, then run its state machine with
/// `args`.
pub fn run_lowered(stmt: &Stmt, args: &[Value]) -> (Outcome, Vec<String>) {
    run_lowered_with(stmt, args, &[])
}

/// Like [`run_lowered`], with unit-level variables the function can see.
pub fn run_lowered_with(
    stmt: &Stmt,
    args: &[Value],
    globals: &[(&str, Value)],
) -> (Outcome, Vec<String>) {
    let lowered = lower(stmt);
    let Some(IRNode::GeneratorBody {
        cases, uses_switch, ..
    }) = find_generator_body(&lowered)
    else {
        panic!("no step function in {lowered:?}");
    };

    let mut runner = MachineRunner::new(cases, *uses_switch);
    runner.enter_function(&lowered, args, globals);
    let outcome = runner.run();
    (outcome, runner.log)
}

/// Lower a function without suspension points and run its body.
pub fn run_plain_lowered(stmt: &Stmt, args: &[Value]) -> (Outcome, Vec<String>) {
    let lowered = lower(stmt);
    let IRNode::FunctionDecl { body, .. } = &lowered else {
        panic!("expected a lowered function declaration, got {lowered:?}");
    };
    let mut runner = MachineRunner::new(&[], false);
    runner.enter_function(&lowered, args, &[]);
    let outcome = match runner.exec_list(body) {
        Ok(Flow::Return(v)) => Outcome::Return(v),
        Ok(Flow::Normal) => Outcome::Return(Value::Undefined),
        Ok(flow) => panic!("{flow:?} escaped the function body"),
        Err(e) => Outcome::Throw(e),
    };
    (outcome, runner.log)
}

pub fn lower(stmt: &Stmt) -> IRNode {
    let unit = SourceUnit::new("semantics.ts", vec![stmt.clone()]);
    let mut ctx = LoweringContext::new(&unit, EmitOptions::default());
    AstToIr::new(&mut ctx)
        .lower_stmt(stmt)
        .expect("function lowers")
}

/// Names the lowered function declares with `var` outside its step function.
fn declared_vars(node: &IRNode, out: &mut Vec<String>) {
    match node {
        IRNode::VarDecl { name, .. } => out.push(name.clone()),
        IRNode::VarDeclList(decls) => decls.iter().for_each(|d| declared_vars(d, out)),
        IRNode::FunctionDecl { body, .. } | IRNode::FunctionExpr { body, .. } => {
            body.iter().for_each(|n| declared_vars(n, out));
        }
        IRNode::ReturnStatement(Some(inner)) | IRNode::ExpressionStatement(inner) => {
            declared_vars(inner, out);
        }
        IRNode::CallExpr { callee, arguments } => {
            declared_vars(callee, out);
            arguments.iter().for_each(|a| declared_vars(a, out));
        }
        IRNode::PropertyAccess { object, .. } => declared_vars(object, out),
        IRNode::Block(nodes) => nodes.iter().for_each(|n| declared_vars(n, out)),
        IRNode::ForStatement {
            initializer, body, ..
        } => {
            if let Some(init) = initializer {
                declared_vars(init, out);
            }
            declared_vars(body, out);
        }
        IRNode::IfStatement {
            then_branch,
            else_branch,
            ..
        } => {
            declared_vars(then_branch, out);
            if let Some(else_branch) = else_branch {
                declared_vars(else_branch, out);
            }
        }
        _ => {}
    }
}

pub fn find_generator_body(node: &IRNode) -> Option<&IRNode> {
    match node {
        IRNode::GeneratorBody { .. } => Some(node),
        IRNode::FunctionDecl { body, .. } | IRNode::FunctionExpr { body, .. } => {
            body.iter().find_map(find_generator_body)
        }
        IRNode::ReturnStatement(Some(inner)) | IRNode::ExpressionStatement(inner) => {
            find_generator_body(inner)
        }
        IRNode::CallExpr { callee, arguments } => find_generator_body(callee)
            .or_else(|| arguments.iter().find_map(find_generator_body)),
        IRNode::PropertyAccess { object, .. } => find_generator_body(object),
        _ => None,
    }
}

fn instruction(value: Value) -> (u32, Value) {
    let Value::Array(items) = value else {
        panic!("step function returned {value:?}");
    };
    let items = items.borrow();
    let code = items.first().map(Value::to_number).expect("opcode") as u32;
    (code, items.get(1).cloned().unwrap_or(Value::Undefined))
}

impl<'m> MachineRunner<'m> {
    pub fn new(cases: &'m [IRGeneratorCase], uses_switch: bool) -> Self {
        MachineRunner {
            cases,
            uses_switch,
            env: FxHashMap::default(),
            log: Vec::new(),
            label: 0,
            trys: Vec::new(),
            ops: Vec::new(),
            sent: (0, Value::Undefined),
            delegate: None,
            done: false,
        }
    }

    /// Bind globals, then the function's own `var`s (which hide them), then
    /// its parameters.
    fn enter_function(&mut self, lowered: &IRNode, args: &[Value], globals: &[(&str, Value)]) {
        let IRNode::FunctionDecl { parameters, .. } = lowered else {
            panic!("expected a lowered function declaration, got {lowered:?}");
        };
        for (name, value) in globals {
            self.env.insert(name.to_string(), value.clone());
        }
        let mut locals = Vec::new();
        declared_vars(lowered, &mut locals);
        for name in locals {
            self.env.insert(name, Value::Undefined);
        }
        for (i, param) in parameters.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or(Value::Undefined);
            self.env.insert(param.name.clone(), value);
        }
    }

    pub fn run(&mut self) -> Outcome {
        let mut input = (0, Value::Undefined);
        for _ in 0..MAX_RESUMES {
            match self.step(input) {
                Resume::Yield(v) => {
                    input = match suspend(&mut self.log, v) {
                        Ok(resumed) => (0, resumed),
                        Err(error) => (1, error),
                    };
                }
                Resume::Return(v) => return Outcome::Return(v),
                Resume::Throw(e) => return Outcome::Throw(e),
            }
        }
        panic!("state machine did not finish");
    }

    fn step(&mut self, mut op: (u32, Value)) -> Resume {
        while !self.done {
            if let Some(items) = &mut self.delegate {
                // An array iterator ignores sent values and has no `throw`.
                match (op.0, items.next()) {
                    (0, Some(item)) => return Resume::Yield(item),
                    (0, None) => op = (0, Value::Undefined),
                    _ => {}
                }
                self.delegate = None;
            }
            match op.0 {
                0 | 1 => self.sent = op.clone(),
                4 => {
                    self.label += 1;
                    return Resume::Yield(op.1);
                }
                5 => {
                    self.label += 1;
                    self.delegate = Some(op.1.array_items().into_iter());
                    op = (0, Value::Undefined);
                    continue;
                }
                7 => {
                    op = self.ops.pop().expect("endfinally without a pending completion");
                    self.trys.pop();
                    continue;
                }
                code => {
                    let top = self.trys.last().copied();
                    if top.is_none() && (code == 6 || code == 2) {
                        self.done = true;
                        continue;
                    }
                    let target = op.1.to_number() as u32;
                    let inside = |t: [Option<u32>; 4]| {
                        t[0].is_some_and(|start| target > start)
                            && t[3].is_some_and(|end| target < end)
                    };
                    if code == 3 && top.is_none_or(inside) {
                        self.label = target;
                    } else if let Some(catch) = top.and_then(|t| t[1])
                        && code == 6
                        && self.label < catch
                    {
                        self.label = catch;
                        self.sent = op.clone();
                    } else if let Some(finally) = top.and_then(|t| t[2])
                        && self.label < finally
                    {
                        self.label = finally;
                        self.ops.push(op.clone());
                    } else {
                        if top.is_some_and(|t| t[2].is_some()) {
                            self.ops.pop();
                        }
                        self.trys.pop();
                        continue;
                    }
                }
            }
            op = match self.run_body() {
                Ok(v) => instruction(v),
                Err(e) => (6, e),
            };
        }
        match op.0 {
            code if code & 5 != 0 => Resume::Throw(op.1),
            0 => Resume::Return(Value::Undefined),
            _ => Resume::Return(op.1),
        }
    }

    /// One call of the step function: enter at the current label and fall
    /// through cases until one returns an instruction.
    fn run_body(&mut self) -> Res<Value> {
        let cases = self.cases;
        let start = if self.uses_switch {
            cases
                .iter()
                .position(|c| c.label == self.label)
                .unwrap_or_else(|| panic!("no case for label {}", self.label))
        } else {
            0
        };
        for case in &cases[start..] {
            match self.exec_list(&case.statements)? {
                Flow::Normal => {}
                Flow::Return(v) => return Ok(v),
                other => panic!("{other:?} escaped the state machine"),
            }
        }
        panic!("fell off the end of the state machine");
    }

    fn exec_list(&mut self, nodes: &[IRNode]) -> Res<Flow> {
        for node in nodes {
            match self.exec(node)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, node: &IRNode) -> Res<Flow> {
        self.exec_labeled(node, &[])
    }

    fn declare(&mut self, node: &IRNode) -> Res<()> {
        match node {
            IRNode::VarDecl { name, initializer } => match initializer {
                Some(init) => {
                    let value = self.eval(init)?;
                    self.env.insert(name.clone(), value);
                }
                None => {
                    self.env.entry(name.clone()).or_insert(Value::Undefined);
                }
            },
            IRNode::VarDeclList(decls) => {
                for decl in decls {
                    self.declare(decl)?;
                }
            }
            other => panic!("not a declaration: {other:?}"),
        }
        Ok(())
    }

    fn exec_labeled(&mut self, node: &IRNode, labels: &[String]) -> Res<Flow> {
        match node {
            IRNode::ExpressionStatement(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            IRNode::VarDecl { .. } | IRNode::VarDeclList(_) => {
                self.declare(node)?;
                Ok(Flow::Normal)
            }
            IRNode::ReturnStatement(value) => {
                let value = match value {
                    Some(v) => self.eval(v)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            IRNode::IfStatement {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.truthy() {
                    self.exec(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            IRNode::Block(nodes) | IRNode::Sequence(nodes) => self.exec_list(nodes),
            IRNode::EmptyStatement => Ok(Flow::Normal),
            IRNode::WhileStatement { condition, body } => {
                while self.eval(condition)?.truthy() {
                    match loop_step(self.exec(body)?, labels) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(flow) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            IRNode::DoWhileStatement { body, condition } => {
                loop {
                    match loop_step(self.exec(body)?, labels) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(flow) => return Ok(flow),
                    }
                    if !self.eval(condition)?.truthy() {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            IRNode::ForStatement {
                initializer,
                condition,
                incrementor,
                body,
            } => {
                if let Some(init) = initializer {
                    match init.as_ref() {
                        IRNode::VarDecl { .. } | IRNode::VarDeclList(_) => self.declare(init)?,
                        other => {
                            self.eval(other)?;
                        }
                    }
                }
                loop {
                    if let Some(condition) = condition
                        && !self.eval(condition)?.truthy()
                    {
                        break;
                    }
                    match loop_step(self.exec(body)?, labels) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(flow) => return Ok(flow),
                    }
                    if let Some(incrementor) = incrementor {
                        self.eval(incrementor)?;
                    }
                }
                Ok(Flow::Normal)
            }
            IRNode::SwitchStatement { expression, cases } => {
                let value = self.eval(expression)?;
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
                for case in &cases[start..] {
                    for stmt in &case.statements {
                        if let Some(flow) = switch_step(self.exec(stmt)?, labels) {
                            return Ok(flow);
                        }
                    }
                }
                Ok(Flow::Normal)
            }
            IRNode::TryStatement {
                try_block,
                catch_clause,
                finally_block,
            } => {
                let mut result = self.exec(try_block);
                if let Some(clause) = catch_clause
                    && let Err(error) = result.clone()
                {
                    // The catch binding hides a variable of the same name
                    // only inside the clause.
                    let hidden = clause
                        .param
                        .as_ref()
                        .map(|param| (param, self.env.insert(param.clone(), error)));
                    result = self.exec_list(&clause.body);
                    match hidden {
                        Some((param, Some(previous))) => {
                            self.env.insert(param.clone(), previous);
                        }
                        Some((param, None)) => {
                            self.env.remove(param);
                        }
                        None => {}
                    }
                }
                if let Some(finally) = finally_block {
                    match self.exec(finally)? {
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                result
            }
            IRNode::ThrowStatement(value) => Err(self.eval(value)?),
            IRNode::BreakStatement(label) => Ok(Flow::Break(label.clone())),
            IRNode::ContinueStatement(label) => Ok(Flow::Continue(label.clone())),
            IRNode::LabeledStatement { label, statement } => {
                let mut inner = labels.to_vec();
                inner.push(label.clone());
                match self.exec_labeled(statement, &inner)? {
                    Flow::Break(Some(l)) if &l == label => Ok(Flow::Normal),
                    other => Ok(other),
                }
            }
            IRNode::GeneratorTrysPush { labels: region } => {
                self.trys.push(*region);
                Ok(Flow::Normal)
            }
            other => panic!("statement not supported by the machine runner: {other:?}"),
        }
    }

    fn lookup(&self, name: &str) -> Value {
        self.env
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::lookup_global(name))
    }

    fn resolve(&mut self, target: &IRNode) -> Res<Place> {
        match target {
            IRNode::Identifier(name) => Ok(Place::Var(name.clone())),
            IRNode::GeneratorLabel => Ok(Place::Label),
            IRNode::ElementAccess { object, index } => {
                let Value::Array(items) = self.eval(object)? else {
                    panic!("element assignment on a non-array");
                };
                let index = self.eval(index)?.to_number() as usize;
                Ok(Place::Elem(items, index))
            }
            other => panic!("assignment target not supported: {other:?}"),
        }
    }

    fn read(&self, place: &Place) -> Value {
        match place {
            Place::Var(name) => self.lookup(name),
            Place::Label => Value::Num(f64::from(self.label)),
            Place::Elem(items, i) => items.borrow().get(*i).cloned().unwrap_or(Value::Undefined),
        }
    }

    fn write(&mut self, place: &Place, value: Value) {
        match place {
            Place::Var(name) => {
                self.env.insert(name.clone(), value);
            }
            Place::Label => self.label = value.to_number() as u32,
            Place::Elem(items, i) => {
                let mut items = items.borrow_mut();
                if items.len() <= *i {
                    items.resize(*i + 1, Value::Undefined);
                }
                items[*i] = value;
            }
        }
    }

    fn update(&mut self, operand: &IRNode, operator: &str, prefix: bool) -> Res<Value> {
        let place = self.resolve(operand)?;
        let old = self.read(&place).to_number();
        let new = if operator == "++" { old + 1.0 } else { old - 1.0 };
        self.write(&place, Value::Num(new));
        Ok(Value::Num(if prefix { new } else { old }))
    }

    fn eval_list(&mut self, nodes: &[IRNode]) -> Res<Vec<Value>> {
        let mut values = Vec::with_capacity(nodes.len());
        for node in nodes {
            values.push(self.eval(node)?);
        }
        Ok(values)
    }

    fn eval(&mut self, node: &IRNode) -> Res<Value> {
        let value = match node {
            IRNode::NumericLiteral(text) => Value::Num(text.parse().unwrap_or(f64::NAN)),
            IRNode::StringLiteral(s) => Value::Str(s.clone()),
            IRNode::BooleanLiteral(b) => Value::Bool(*b),
            IRNode::NullLiteral => Value::Null,
            IRNode::Undefined | IRNode::This { .. } => Value::Undefined,
            IRNode::Identifier(name) => self.lookup(name),
            IRNode::BinaryExpr {
                left,
                operator,
                right,
            } => match operator.as_str() {
                "=" => {
                    let place = self.resolve(left)?;
                    let value = self.eval(right)?;
                    self.write(&place, value.clone());
                    value
                }
                op @ ("+=" | "-=" | "*=" | "/=" | "%=" | "<<=" | ">>=" | "&=" | "|=" | "^=") => {
                    let place = self.resolve(left)?;
                    let old = self.read(&place);
                    let r = self.eval(right)?;
                    let value = binary(&op[..op.len() - 1], &old, &r);
                    self.write(&place, value.clone());
                    value
                }
                op => {
                    let l = self.eval(left)?;
                    let r = self.eval(right)?;
                    binary(op, &l, &r)
                }
            },
            IRNode::PrefixUnaryExpr { operator, operand } => match operator.as_str() {
                "++" | "--" => self.update(operand, operator, true)?,
                op => {
                    let v = self.eval(operand)?;
                    unary(op, v)
                }
            },
            IRNode::PostfixUnaryExpr { operand, operator } => {
                self.update(operand, operator, false)?
            }
            IRNode::CallExpr { callee, arguments } => match callee.as_ref() {
                IRNode::PropertyAccess { object, property } if property == "call" => {
                    let f = self.eval(object)?;
                    let args = self.eval_list(arguments)?;
                    call_host(&mut self.log, &f, args.into_iter().skip(1).collect())?
                }
                IRNode::PropertyAccess { object, property } if property == "apply" => {
                    let f = self.eval(object)?;
                    let args = self.eval_list(arguments)?;
                    let spread = args.get(1).map(Value::array_items).unwrap_or_default();
                    call_host(&mut self.log, &f, spread)?
                }
                // `_ts_values(xs)` iterates the array itself.
                IRNode::Identifier(name) if name == "_ts_values" => {
                    let args = self.eval_list(arguments)?;
                    args.into_iter().next().unwrap_or(Value::Undefined)
                }
                other => {
                    let f = self.eval(other)?;
                    let args = self.eval_list(arguments)?;
                    call_host(&mut self.log, &f, args)?
                }
            },
            IRNode::PropertyAccess { object, property } => self.eval(object)?.get_named(property),
            IRNode::ElementAccess { object, index } => {
                let obj = self.eval(object)?;
                let key = self.eval(index)?;
                obj.get_index(&key)
            }
            IRNode::ConditionalExpr {
                condition,
                when_true,
                when_false,
            } => {
                if self.eval(condition)?.truthy() {
                    self.eval(when_true)?
                } else {
                    self.eval(when_false)?
                }
            }
            IRNode::CommaExpr(exprs) => {
                let mut last = Value::Undefined;
                for e in exprs {
                    last = self.eval(e)?;
                }
                last
            }
            IRNode::ArrayLiteral(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        IRNode::OmittedExpression => values.push(Value::Undefined),
                        other => values.push(self.eval(other)?),
                    }
                }
                Value::array(values)
            }
            IRNode::LogicalOr { left, right } => {
                let l = self.eval(left)?;
                if l.truthy() { l } else { self.eval(right)? }
            }
            IRNode::LogicalAnd { left, right } => {
                let l = self.eval(left)?;
                if l.truthy() { self.eval(right)? } else { l }
            }
            IRNode::GeneratorOp { opcode, value } => {
                let value = match value {
                    Some(v) => self.eval(v)?,
                    None => Value::Undefined,
                };
                Value::array(vec![Value::Num(f64::from(*opcode)), value])
            }
            IRNode::GeneratorSent => {
                let (code, value) = self.sent.clone();
                if code & 1 == 1 {
                    return Err(value);
                }
                value
            }
            IRNode::GeneratorLabel => Value::Num(f64::from(self.label)),
            IRNode::LabelRef(label) => Value::Num(f64::from(*label)),
            other => panic!("expression not supported by the machine runner: {other:?}"),
        };
        Ok(value)
    }
}
