use super::*;
use crate::builders::*;

#[test]
fn test_contains_await_stops_at_function_boundary() {
    let nested = Expr::Function(function(
        None,
        &[],
        vec![expr_stmt(await_expr(call(ident("g"), vec![])))],
        FunctionFlags::ASYNC,
    ));
    assert!(!contains_await(&nested));
    assert!(contains_await(&call(
        ident("f"),
        vec![await_expr(ident("p"))]
    )));
}

#[test]
fn test_contains_yield_ignores_await() {
    let expr = binary(BinaryOp::Add, await_expr(ident("a")), num(1.0));
    assert!(!contains_yield(&expr));
    assert!(contains_suspension(&expr));
    assert!(contains_yield(&yield_expr(None)));
}

#[test]
fn test_suspension_not_found_in_arrow_body() {
    let arrow = arrow_expr(&[], yield_expr(Some(num(1.0))));
    assert!(!contains_suspension(&arrow));
}

#[test]
fn test_stmts_contain_suspension_in_nested_blocks() {
    let body = vec![if_stmt(
        ident("c"),
        block(vec![while_stmt(
            bool_lit(true),
            vec![expr_stmt(await_expr(ident("x")))],
        )]),
        None,
    )];
    assert!(stmts_contain_suspension(&body));
    assert!(!stmts_contain_suspension(&[expr_stmt(ident("x"))]));
}

#[test]
fn test_this_reference_looks_through_arrows_only() {
    let through_arrow = vec![expr_stmt(arrow_expr(&[], member(this(), "x")))];
    assert!(contains_this_reference(&through_arrow));

    let in_function = vec![expr_stmt(Expr::Function(function(
        None,
        &[],
        vec![ret(Some(this()))],
        FunctionFlags::empty(),
    )))];
    assert!(!contains_this_reference(&in_function));
}

#[test]
fn test_contains_arguments() {
    let body = vec![ret(Some(member(ident("arguments"), "length")))];
    assert!(contains_arguments(&body));
    assert!(!contains_arguments(&[ret(Some(ident("args")))]));
}

#[test]
fn test_collect_identifiers_includes_bindings_and_references() {
    let unit = SourceUnit::new(
        "ids.ts",
        vec![
            let_decl("_this", num(1.0)),
            fn_decl(
                "f",
                &["a"],
                vec![ret(Some(member(ident("_state"), "label")))],
            ),
            Stmt::Class(class("C", None, vec![method("m", &["p"], vec![])])),
        ],
    );
    let names = collect_identifiers(&unit);
    for expected in ["_this", "f", "a", "_state", "label", "C", "m", "p"] {
        assert!(names.contains(expected), "missing {expected}");
    }
}

#[test]
fn test_mentions_name_sees_nested_functions() {
    let body = vec![ret(Some(Expr::Function(function(
        None,
        &[],
        vec![expr_stmt(call(ident("m"), vec![]))],
        FunctionFlags::empty(),
    ))))];
    assert!(mentions_name(&body, "m"));
    assert!(!mentions_name(&body, "n"));
}

#[test]
fn test_contains_super_call_looks_through_arrows_only() {
    let direct = expr_stmt(super_call(vec![arg(ident("x"))]));
    assert!(contains_super_call(&direct));

    let in_arrow = expr_stmt(call(arrow_expr(&[], super_call(vec![])), vec![]));
    assert!(contains_super_call(&in_arrow));

    let in_function = expr_stmt(Expr::Function(function(
        None,
        &[],
        vec![expr_stmt(super_call(vec![]))],
        FunctionFlags::empty(),
    )));
    assert!(!contains_super_call(&in_function));
}
