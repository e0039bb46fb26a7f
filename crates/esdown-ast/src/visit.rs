//! Read-only traversal and the syntax queries the lowering rules rely on.
//!
//! `Visit` walks every child by default. The queries below override the
//! function/arrow/class hooks to stop at the scope boundaries that matter for
//! them:
//!
//! - suspension (`await`/`yield`) never crosses a function or arrow boundary
//! - `this` and `arguments` cross arrow boundaries but not function boundaries

use crate::node::*;
use rustc_hash::FxHashSet;

pub trait Visit {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_function(&mut self, function: &Function) {
        walk_function(self, function);
    }

    fn visit_arrow(&mut self, arrow: &Arrow) {
        walk_arrow(self, arrow);
    }

    fn visit_class(&mut self, class: &Class) {
        walk_class(self, class);
    }

    fn visit_param(&mut self, param: &Param) {
        if let Some(default) = &param.default {
            self.visit_expr(default);
        }
    }

    fn visit_binding(&mut self, _name: &str) {}

    /// Called before each node; returning `true` stops descending further.
    fn done(&self) -> bool {
        false
    }
}

pub fn walk_stmts<V: Visit + ?Sized>(v: &mut V, stmts: &[Stmt]) {
    for stmt in stmts {
        if v.done() {
            return;
        }
        v.visit_stmt(stmt);
    }
}

fn walk_var_decl<V: Visit + ?Sized>(v: &mut V, decl: &VarDecl) {
    for d in &decl.declarators {
        v.visit_binding(&d.name);
        if let Some(init) = &d.init {
            v.visit_expr(init);
        }
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, stmt: &Stmt) {
    if v.done() {
        return;
    }
    match stmt {
        Stmt::Expr { expr } | Stmt::Throw { arg: expr } => v.visit_expr(expr),
        Stmt::Var(decl) => walk_var_decl(v, decl),
        Stmt::Function(f) => v.visit_function(f),
        Stmt::Class(c) => v.visit_class(c),
        Stmt::Namespace(ns) => {
            for seg in &ns.name {
                v.visit_binding(seg);
            }
            walk_stmts(v, &ns.body);
        }
        Stmt::Export { decl } => v.visit_stmt(decl),
        Stmt::Return { arg } => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_stmt(consequent);
            if let Some(alt) = alternate {
                v.visit_stmt(alt);
            }
        }
        Stmt::Block { body } => walk_stmts(v, body),
        Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
            v.visit_expr(test);
            v.visit_stmt(body);
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            match init {
                Some(ForInit::Var(decl)) => walk_var_decl(v, decl),
                Some(ForInit::Expr { expr }) => v.visit_expr(expr),
                None => {}
            }
            if let Some(test) = test {
                v.visit_expr(test);
            }
            if let Some(update) = update {
                v.visit_expr(update);
            }
            v.visit_stmt(body);
        }
        Stmt::ForOf {
            binding,
            iterable,
            body,
            ..
        } => {
            v.visit_binding(binding);
            v.visit_expr(iterable);
            v.visit_stmt(body);
        }
        Stmt::Switch {
            discriminant,
            cases,
        } => {
            v.visit_expr(discriminant);
            for case in cases {
                if let Some(test) = &case.test {
                    v.visit_expr(test);
                }
                walk_stmts(v, &case.body);
            }
        }
        Stmt::Try(t) => {
            walk_stmts(v, &t.block);
            if let Some(handler) = &t.handler {
                if let Some(param) = &handler.param {
                    v.visit_binding(param);
                }
                walk_stmts(v, &handler.body);
            }
            if let Some(finalizer) = &t.finalizer {
                walk_stmts(v, finalizer);
            }
        }
        Stmt::Labeled { label, body } => {
            v.visit_binding(label);
            v.visit_stmt(body);
        }
        Stmt::With { object, body, .. } => {
            v.visit_expr(object);
            v.visit_stmt(body);
        }
        Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Empty => {}
    }
}

fn walk_args<V: Visit + ?Sized>(v: &mut V, args: &[ExprOrSpread]) {
    for arg in args {
        v.visit_expr(&arg.expr);
    }
}

fn walk_prop_name<V: Visit + ?Sized>(v: &mut V, key: &PropName) {
    match key {
        PropName::Computed { expr } => v.visit_expr(expr),
        PropName::Ident { name } => v.visit_binding(name),
        PropName::Str { .. } | PropName::Num { .. } => {}
    }
}

fn walk_member_prop<V: Visit + ?Sized>(v: &mut V, prop: &MemberProp) {
    match prop {
        MemberProp::Computed { expr } => v.visit_expr(expr),
        MemberProp::Ident { name } => v.visit_binding(name),
    }
}

pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, expr: &Expr) {
    if v.done() {
        return;
    }
    match expr {
        Expr::Ident { .. } | Expr::Lit { .. } | Expr::This => {}
        Expr::Template { exprs, .. } | Expr::Seq { exprs } => {
            for e in exprs {
                v.visit_expr(e);
            }
        }
        Expr::Array { elements } => {
            for el in elements.iter().flatten() {
                v.visit_expr(&el.expr);
            }
        }
        Expr::Object { props } => {
            for prop in props {
                match prop {
                    Prop::KeyValue { key, value } => {
                        walk_prop_name(v, key);
                        v.visit_expr(value);
                    }
                    Prop::Shorthand { name } => v.visit_binding(name),
                    Prop::Method { key, function }
                    | Prop::Getter { key, function }
                    | Prop::Setter { key, function } => {
                        walk_prop_name(v, key);
                        v.visit_function(function);
                    }
                    Prop::Spread { expr, .. } => v.visit_expr(expr),
                }
            }
        }
        Expr::Function(f) => v.visit_function(f),
        Expr::Arrow(a) => v.visit_arrow(a),
        Expr::Class(c) => v.visit_class(c),
        Expr::Unary { arg, .. } | Expr::Update { arg, .. } => v.visit_expr(arg),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        Expr::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        Expr::Cond {
            test,
            consequent,
            alternate,
        } => {
            v.visit_expr(test);
            v.visit_expr(consequent);
            v.visit_expr(alternate);
        }
        Expr::Call { callee, args } | Expr::New { callee, args } => {
            v.visit_expr(callee);
            walk_args(v, args);
        }
        Expr::Member { object, property } => {
            v.visit_expr(object);
            walk_member_prop(v, property);
        }
        Expr::SuperCall { args, .. } => walk_args(v, args),
        Expr::SuperMember { property, .. } => walk_member_prop(v, property),
        Expr::Await { arg, .. } => v.visit_expr(arg),
        Expr::Yield { arg, .. } => {
            if let Some(arg) = arg {
                v.visit_expr(arg);
            }
        }
    }
}

pub fn walk_function<V: Visit + ?Sized>(v: &mut V, function: &Function) {
    if let Some(name) = &function.name {
        v.visit_binding(name);
    }
    for param in &function.params {
        v.visit_binding(&param.name);
        v.visit_param(param);
    }
    walk_stmts(v, &function.body);
}

pub fn walk_arrow<V: Visit + ?Sized>(v: &mut V, arrow: &Arrow) {
    for param in &arrow.params {
        v.visit_binding(&param.name);
        v.visit_param(param);
    }
    match &arrow.body {
        ArrowBody::Block { body } => walk_stmts(v, body),
        ArrowBody::Expr { expr } => v.visit_expr(expr),
    }
}

pub fn walk_class<V: Visit + ?Sized>(v: &mut V, class: &Class) {
    if let Some(name) = &class.name {
        v.visit_binding(name);
    }
    if let Some(sup) = &class.super_class {
        v.visit_expr(sup);
    }
    for member in &class.members {
        match member {
            ClassMember::Constructor { params, body, .. } => {
                for param in params {
                    v.visit_binding(&param.name);
                    v.visit_param(param);
                }
                walk_stmts(v, body);
            }
            ClassMember::Method { key, function, .. } => {
                walk_prop_name(v, key);
                v.visit_function(function);
            }
            ClassMember::Property { key, value, .. } => {
                walk_prop_name(v, key);
                if let Some(value) = value {
                    v.visit_expr(value);
                }
            }
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum SuspensionKind {
    Await,
    Yield,
    Any,
}

struct SuspensionFinder {
    kind: SuspensionKind,
    found: bool,
}

impl Visit for SuspensionFinder {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Await { .. } if self.kind != SuspensionKind::Yield => self.found = true,
            Expr::Yield { .. } if self.kind != SuspensionKind::Await => self.found = true,
            _ => walk_expr(self, expr),
        }
    }

    fn visit_function(&mut self, _function: &Function) {}

    fn visit_arrow(&mut self, _arrow: &Arrow) {}

    fn visit_class(&mut self, class: &Class) {
        // Only the heritage clause is evaluated in the enclosing function.
        if let Some(sup) = &class.super_class {
            self.visit_expr(sup);
        }
    }

    fn done(&self) -> bool {
        self.found
    }
}

fn find_suspension(expr: &Expr, kind: SuspensionKind) -> bool {
    let mut finder = SuspensionFinder { kind, found: false };
    finder.visit_expr(expr);
    finder.found
}

/// Whether `expr` contains an `await` evaluated by the enclosing function.
pub fn contains_await(expr: &Expr) -> bool {
    find_suspension(expr, SuspensionKind::Await)
}

/// Whether `expr` contains a `yield` evaluated by the enclosing function.
pub fn contains_yield(expr: &Expr) -> bool {
    find_suspension(expr, SuspensionKind::Yield)
}

/// Whether `expr` contains any suspension point.
pub fn contains_suspension(expr: &Expr) -> bool {
    find_suspension(expr, SuspensionKind::Any)
}

/// Whether any statement in `stmts` contains a suspension point.
pub fn stmts_contain_suspension(stmts: &[Stmt]) -> bool {
    let mut finder = SuspensionFinder {
        kind: SuspensionKind::Any,
        found: false,
    };
    walk_stmts(&mut finder, stmts);
    finder.found
}

/// Whether a single statement contains a suspension point.
pub fn stmt_contains_suspension(stmt: &Stmt) -> bool {
    stmts_contain_suspension(std::slice::from_ref(stmt))
}

struct LexicalFinder {
    this: bool,
    arguments: bool,
    found: bool,
}

impl Visit for LexicalFinder {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::This if self.this => self.found = true,
            Expr::Ident { name } if self.arguments && name == "arguments" => self.found = true,
            _ => walk_expr(self, expr),
        }
    }

    fn visit_function(&mut self, _function: &Function) {}

    fn visit_class(&mut self, class: &Class) {
        if let Some(sup) = &class.super_class {
            self.visit_expr(sup);
        }
    }

    fn done(&self) -> bool {
        self.found
    }
}

/// Whether `this` inside `stmts` refers to the enclosing function's receiver
/// (looking through arrow functions).
pub fn contains_this_reference(stmts: &[Stmt]) -> bool {
    let mut finder = LexicalFinder {
        this: true,
        arguments: false,
        found: false,
    };
    walk_stmts(&mut finder, stmts);
    finder.found
}

/// Whether `arguments` inside `stmts` refers to the enclosing function's
/// arguments object (looking through arrow functions).
pub fn contains_arguments(stmts: &[Stmt]) -> bool {
    let mut finder = LexicalFinder {
        this: false,
        arguments: true,
        found: false,
    };
    walk_stmts(&mut finder, stmts);
    finder.found
}

struct NameFinder<'a> {
    name: &'a str,
    found: bool,
}

impl Visit for NameFinder<'_> {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident { name } if name == self.name => self.found = true,
            _ => walk_expr(self, expr),
        }
    }

    fn visit_binding(&mut self, name: &str) {
        if name == self.name {
            self.found = true;
        }
    }

    fn done(&self) -> bool {
        self.found
    }
}

/// Whether `name` occurs in `stmts` as a reference or a binding, including
/// inside nested functions.
pub fn mentions_name(stmts: &[Stmt], name: &str) -> bool {
    let mut finder = NameFinder { name, found: false };
    walk_stmts(&mut finder, stmts);
    finder.found
}

struct SuperCallFinder {
    found: bool,
}

impl Visit for SuperCallFinder {
    fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::SuperCall { .. } => self.found = true,
            _ => walk_expr(self, expr),
        }
    }

    fn visit_function(&mut self, _function: &Function) {}

    fn visit_class(&mut self, class: &Class) {
        if let Some(sup) = &class.super_class {
            self.visit_expr(sup);
        }
    }

    fn done(&self) -> bool {
        self.found
    }
}

/// Whether `stmt` calls `super(...)` for the enclosing constructor
/// (looking through arrow functions).
pub fn contains_super_call(stmt: &Stmt) -> bool {
    let mut finder = SuperCallFinder { found: false };
    finder.visit_stmt(stmt);
    finder.found
}

struct IdentifierCollector {
    names: FxHashSet<String>,
}

impl Visit for IdentifierCollector {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Ident { name } = expr {
            self.names.insert(name.clone());
        }
        walk_expr(self, expr);
    }

    fn visit_binding(&mut self, name: &str) {
        if !self.names.contains(name) {
            self.names.insert(name.to_string());
        }
    }
}

/// Every identifier-like name in the unit: bindings, references, labels and
/// property names. Generated names must avoid all of them.
pub fn collect_identifiers(unit: &SourceUnit) -> FxHashSet<String> {
    let mut collector = IdentifierCollector {
        names: FxHashSet::default(),
    };
    walk_stmts(&mut collector, &unit.statements);
    collector.names
}

#[cfg(test)]
#[path = "../tests/visit.rs"]
mod tests;
