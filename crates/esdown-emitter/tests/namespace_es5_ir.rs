use super::*;
use crate::error::ErrorKind;
use crate::options::EmitOptions;
use crate::transform_context::LoweringContext;
use crate::transforms::ir_printer::IRPrinter;
use esdown_ast::builders::*;
use esdown_ast::{SourceUnit, VarKind};
use esdown_common::Span;

fn try_lower_all(statements: Vec<Stmt>) -> LowerResult<String> {
    let unit = SourceUnit::new("ns.ts", statements.clone());
    let mut ctx = LoweringContext::new(&unit, EmitOptions::default());
    let mut lowering = AstToIr::new(&mut ctx);
    let mut nodes = Vec::new();
    for stmt in &statements {
        nodes.push(lowering.lower_stmt(stmt)?);
    }
    let mut printer = IRPrinter::new();
    printer.emit_statements(&nodes);
    Ok(printer.finish())
}

fn lower_all(statements: Vec<Stmt>) -> String {
    try_lower_all(statements).expect("namespace should lower")
}

fn lines(lines: &[&str]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

#[test]
fn test_namespace_with_exports() {
    let ns = namespace(
        &["X"],
        vec![
            export(var_decl(VarKind::Const, "a", Some(num(1.0)))),
            export(fn_decl("f", &[], vec![])),
        ],
    );
    assert_eq!(
        lower_all(vec![ns]),
        lines(&[
            "var X;",
            "(function(X) {",
            "    var a = X.a = 1;",
            "    function f() {}",
            "    X.f = f;",
            "})(X || (X = {}));",
        ])
    );
}

#[test]
fn test_merged_namespace_declares_once() {
    let first = namespace(&["X"], vec![expr_stmt(call(ident("f"), vec![]))]);
    let second = namespace(&["X"], vec![expr_stmt(call(ident("g"), vec![]))]);
    assert_eq!(
        lower_all(vec![first, second]),
        lines(&[
            "var X;",
            "(function(X) {",
            "    f();",
            "})(X || (X = {}));",
            "(function(X) {",
            "    g();",
            "})(X || (X = {}));",
        ])
    );
}

#[test]
fn test_qualified_name_nests_iifes() {
    let ns = namespace(
        &["A", "B"],
        vec![export(var_decl(VarKind::Let, "x", Some(num(1.0))))],
    );
    assert_eq!(
        lower_all(vec![ns]),
        lines(&[
            "var A;",
            "(function(A) {",
            "    var B;",
            "    (function(B) {",
            "        var x = B.x = 1;",
            "    })(B = A.B || (A.B = {}));",
            "})(A || (A = {}));",
        ])
    );
}

#[test]
fn test_exported_inner_namespace_uses_parent() {
    let inner = namespace(&["Y"], vec![expr_stmt(call(ident("f"), vec![]))]);
    let outer = namespace(&["X"], vec![export(inner)]);
    assert_eq!(
        lower_all(vec![outer]),
        lines(&[
            "var X;",
            "(function(X) {",
            "    var Y;",
            "    (function(Y) {",
            "        f();",
            "    })(Y = X.Y || (X.Y = {}));",
            "})(X || (X = {}));",
        ])
    );
}

#[test]
fn test_exported_var_without_initializer() {
    let ns = namespace(&["X"], vec![export(var_decl(VarKind::Var, "a", None))]);
    assert_eq!(
        lower_all(vec![ns]),
        lines(&[
            "var X;",
            "(function(X) {",
            "    var a;",
            "    X.a = a;",
            "})(X || (X = {}));",
        ])
    );
}

#[test]
fn test_exported_class_is_assigned() {
    let ns = namespace(&["X"], vec![export(Stmt::Class(class("C", None, vec![])))]);
    let code = lower_all(vec![ns]);
    assert!(code.contains("    var C = function C() {\n"), "{code}");
    assert!(code.contains("    X.C = C;\n"), "{code}");
}

#[test]
fn test_parameter_clash_gets_fresh_name() {
    let ns = namespace(&["X"], vec![var_decl(VarKind::Var, "X", Some(num(1.0)))]);
    assert_eq!(
        lower_all(vec![ns]),
        lines(&[
            "var X;",
            "(function(_X) {",
            "    var X = 1;",
            "})(X || (X = {}));",
        ])
    );
}

#[test]
fn test_exported_top_level_namespace() {
    let ns = export(namespace(&["X"], vec![expr_stmt(call(ident("f"), vec![]))]));
    assert_eq!(
        lower_all(vec![ns]),
        lines(&[
            "export var X;",
            "(function(X) {",
            "    f();",
            "})(X || (X = {}));",
        ])
    );
}

#[test]
fn test_empty_namespace_emits_nothing() {
    let ns = namespace(&["Empty"], vec![]);
    let unit = SourceUnit::new("ns.ts", vec![ns.clone()]);
    let mut ctx = LoweringContext::new(&unit, EmitOptions::default());
    let node = AstToIr::new(&mut ctx).lower_stmt(&ns).unwrap();
    assert_eq!(node, IRNode::Sequence(Vec::new()));
    assert!(!ctx.is_declared("Empty"));
}

#[test]
fn test_export_of_expression_is_unsupported() {
    let ns = namespace(&["X"], vec![export(expr_stmt(ident("a")))]);
    let err = try_lower_all(vec![ns]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn test_namespace_without_name_is_unsupported() {
    let ns = Stmt::Namespace(Namespace {
        name: Vec::new(),
        body: vec![expr_stmt(ident("a"))],
        span: Span::new(0, 3),
    });
    let err = try_lower_all(vec![ns]).unwrap_err();
    assert_eq!(
        err,
        LowerError::unsupported("namespace without a name", Span::new(0, 3))
    );
}

#[test]
fn test_declares_name() {
    let body = vec![
        export(fn_decl("f", &[], vec![])),
        var_decl(VarKind::Var, "v", None),
        namespace(&["N", "M"], vec![]),
    ];
    assert!(declares_name(&body, "f"));
    assert!(declares_name(&body, "v"));
    assert!(declares_name(&body, "N"));
    assert!(!declares_name(&body, "M"));
}
