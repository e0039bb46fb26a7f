//! Terse constructors for building syntax trees by hand.
//!
//! The external parser normally hands trees over as JSON; these helpers are
//! used by embedders constructing trees in Rust and throughout the test suites.

use crate::node::*;
use esdown_common::Span;

pub fn ident(name: &str) -> Expr {
    Expr::Ident {
        name: name.to_string(),
    }
}

pub fn num(value: f64) -> Expr {
    Expr::Lit {
        value: Lit::Num(value),
    }
}

pub fn str_lit(value: &str) -> Expr {
    Expr::Lit {
        value: Lit::Str(value.to_string()),
    }
}

pub fn bool_lit(value: bool) -> Expr {
    Expr::Lit {
        value: Lit::Bool(value),
    }
}

pub fn null() -> Expr {
    Expr::Lit { value: Lit::Null }
}

pub fn undefined() -> Expr {
    Expr::Lit {
        value: Lit::Undefined,
    }
}

pub fn this() -> Expr {
    Expr::This
}

pub fn arg(expr: Expr) -> ExprOrSpread {
    ExprOrSpread {
        spread: false,
        expr,
    }
}

pub fn spread(expr: Expr) -> ExprOrSpread {
    ExprOrSpread { spread: true, expr }
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args: args.into_iter().map(arg).collect(),
    }
}

pub fn call_spread(callee: Expr, args: Vec<ExprOrSpread>) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args,
    }
}

pub fn new_expr(callee: Expr, args: Vec<ExprOrSpread>) -> Expr {
    Expr::New {
        callee: Box::new(callee),
        args,
    }
}

pub fn member(object: Expr, name: &str) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: MemberProp::Ident {
            name: name.to_string(),
        },
    }
}

pub fn index(object: Expr, key: Expr) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: MemberProp::Computed {
            expr: Box::new(key),
        },
    }
}

pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary {
        op,
        arg: Box::new(operand),
    }
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    assign_op(AssignOp::Assign, target, value)
}

pub fn assign_op(op: AssignOp, target: Expr, value: Expr) -> Expr {
    Expr::Assign {
        op,
        target: Box::new(target),
        value: Box::new(value),
        span: Span::DUMMY,
    }
}

pub fn update(op: UpdateOp, prefix: bool, operand: Expr) -> Expr {
    Expr::Update {
        op,
        prefix,
        arg: Box::new(operand),
    }
}

pub fn cond(test: Expr, consequent: Expr, alternate: Expr) -> Expr {
    Expr::Cond {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
    }
}

pub fn await_expr(operand: Expr) -> Expr {
    Expr::Await {
        arg: Box::new(operand),
        span: Span::DUMMY,
    }
}

pub fn yield_expr(operand: Option<Expr>) -> Expr {
    Expr::Yield {
        arg: operand.map(Box::new),
        delegate: false,
        span: Span::DUMMY,
    }
}

pub fn yield_delegate(operand: Expr) -> Expr {
    Expr::Yield {
        arg: Some(Box::new(operand)),
        delegate: true,
        span: Span::DUMMY,
    }
}

pub fn array(elements: Vec<ExprOrSpread>) -> Expr {
    Expr::Array {
        elements: elements.into_iter().map(Some).collect(),
    }
}

pub fn object(props: Vec<Prop>) -> Expr {
    Expr::Object { props }
}

pub fn key_value(key: &str, value: Expr) -> Prop {
    Prop::KeyValue {
        key: prop_ident(key),
        value,
    }
}

pub fn prop_ident(name: &str) -> PropName {
    PropName::Ident {
        name: name.to_string(),
    }
}

pub fn arrow_expr(params: &[&str], body: Expr) -> Expr {
    Expr::Arrow(Arrow {
        params: params.iter().map(|p| param(p)).collect(),
        body: ArrowBody::Expr {
            expr: Box::new(body),
        },
        is_async: false,
        span: Span::DUMMY,
    })
}

pub fn arrow_block(params: &[&str], body: Vec<Stmt>) -> Expr {
    Expr::Arrow(Arrow {
        params: params.iter().map(|p| param(p)).collect(),
        body: ArrowBody::Block { body },
        is_async: false,
        span: Span::DUMMY,
    })
}

pub fn template(quasis: &[&str], exprs: Vec<Expr>) -> Expr {
    Expr::Template {
        quasis: quasis.iter().map(|q| q.to_string()).collect(),
        exprs,
    }
}

pub fn super_call(args: Vec<ExprOrSpread>) -> Expr {
    Expr::SuperCall {
        args,
        span: Span::DUMMY,
    }
}

pub fn super_member(name: &str) -> Expr {
    Expr::SuperMember {
        property: MemberProp::Ident {
            name: name.to_string(),
        },
        span: Span::DUMMY,
    }
}

// =============================================================================
// Statements
// =============================================================================

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr { expr }
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return { arg: value }
}

pub fn throw(value: Expr) -> Stmt {
    Stmt::Throw { arg: value }
}

pub fn block(body: Vec<Stmt>) -> Stmt {
    Stmt::Block { body }
}

pub fn if_stmt(test: Expr, consequent: Stmt, alternate: Option<Stmt>) -> Stmt {
    Stmt::If {
        test,
        consequent: Box::new(consequent),
        alternate: alternate.map(Box::new),
    }
}

pub fn while_stmt(test: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While {
        test,
        body: Box::new(block(body)),
    }
}

pub fn do_while(body: Vec<Stmt>, test: Expr) -> Stmt {
    Stmt::DoWhile {
        body: Box::new(block(body)),
        test,
    }
}

pub fn for_stmt(
    init: Option<ForInit>,
    test: Option<Expr>,
    update: Option<Expr>,
    body: Vec<Stmt>,
) -> Stmt {
    Stmt::For {
        init,
        test,
        update,
        body: Box::new(block(body)),
    }
}

pub fn for_of(kind: VarKind, binding: &str, iterable: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::ForOf {
        kind,
        binding: binding.to_string(),
        iterable,
        body: Box::new(block(body)),
    }
}

pub fn var_decl(kind: VarKind, name: &str, init: Option<Expr>) -> Stmt {
    Stmt::Var(VarDecl {
        kind,
        declarators: vec![VarDeclarator {
            name: name.to_string(),
            init,
        }],
    })
}

pub fn let_decl(name: &str, init: Expr) -> Stmt {
    var_decl(VarKind::Let, name, Some(init))
}

pub fn try_stmt(
    body: Vec<Stmt>,
    handler: Option<(Option<&str>, Vec<Stmt>)>,
    finalizer: Option<Vec<Stmt>>,
) -> Stmt {
    Stmt::Try(TryStmt {
        block: body,
        handler: handler.map(|(param, body)| CatchClause {
            param: param.map(str::to_string),
            body,
        }),
        finalizer,
    })
}

pub fn brk(label: Option<&str>) -> Stmt {
    Stmt::Break {
        label: label.map(str::to_string),
    }
}

pub fn cont(label: Option<&str>) -> Stmt {
    Stmt::Continue {
        label: label.map(str::to_string),
    }
}

pub fn labeled(label: &str, body: Stmt) -> Stmt {
    Stmt::Labeled {
        label: label.to_string(),
        body: Box::new(body),
    }
}

pub fn switch(discriminant: Expr, cases: Vec<(Option<Expr>, Vec<Stmt>)>) -> Stmt {
    Stmt::Switch {
        discriminant,
        cases: cases
            .into_iter()
            .map(|(test, body)| SwitchCase { test, body })
            .collect(),
    }
}

pub fn export(decl: Stmt) -> Stmt {
    Stmt::Export {
        decl: Box::new(decl),
    }
}

// =============================================================================
// Functions, classes, namespaces
// =============================================================================

pub fn param(name: &str) -> Param {
    Param {
        name: name.to_string(),
        default: None,
        rest: false,
        property: false,
    }
}

pub fn function(name: Option<&str>, params: &[&str], body: Vec<Stmt>, flags: FunctionFlags) -> Function {
    Function {
        name: name.map(str::to_string),
        params: params.iter().map(|p| param(p)).collect(),
        body,
        flags,
        span: Span::DUMMY,
    }
}

pub fn fn_decl(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    Stmt::Function(function(Some(name), params, body, FunctionFlags::empty()))
}

pub fn async_fn_decl(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    Stmt::Function(function(Some(name), params, body, FunctionFlags::ASYNC))
}

pub fn generator_decl(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    Stmt::Function(function(Some(name), params, body, FunctionFlags::GENERATOR))
}

pub fn class(name: &str, super_class: Option<Expr>, members: Vec<ClassMember>) -> Class {
    Class {
        name: Some(name.to_string()),
        super_class: super_class.map(Box::new),
        members,
        span: Span::DUMMY,
    }
}

pub fn constructor(params: &[&str], body: Vec<Stmt>) -> ClassMember {
    ClassMember::Constructor {
        params: params.iter().map(|p| param(p)).collect(),
        body,
        span: Span::DUMMY,
    }
}

pub fn method(name: &str, params: &[&str], body: Vec<Stmt>) -> ClassMember {
    ClassMember::Method {
        key: prop_ident(name),
        function: function(Some(name), params, body, FunctionFlags::empty()),
        kind: MethodKind::Method,
        is_static: false,
    }
}

pub fn static_method(name: &str, params: &[&str], body: Vec<Stmt>) -> ClassMember {
    ClassMember::Method {
        key: prop_ident(name),
        function: function(Some(name), params, body, FunctionFlags::empty()),
        kind: MethodKind::Method,
        is_static: true,
    }
}

pub fn accessor(name: &str, kind: MethodKind, params: &[&str], body: Vec<Stmt>) -> ClassMember {
    ClassMember::Method {
        key: prop_ident(name),
        function: function(None, params, body, FunctionFlags::empty()),
        kind,
        is_static: false,
    }
}

pub fn field(name: &str, value: Option<Expr>, is_static: bool) -> ClassMember {
    ClassMember::Property {
        key: prop_ident(name),
        value,
        is_static,
    }
}

pub fn namespace(path: &[&str], body: Vec<Stmt>) -> Stmt {
    Stmt::Namespace(Namespace {
        name: path.iter().map(|s| s.to_string()).collect(),
        body,
        span: Span::DUMMY,
    })
}
