//! IR Printer
//!
//! Walks `IRNode` trees and emits JavaScript text. Layout follows one fixed
//! house style (the helper-import fixture style); the knobs that vary between
//! consumers live in [`PrinterOptions`].
//!
//! Expression parenthesization is precedence driven: a child expression is
//! wrapped only when its precedence is lower than its position requires.

use super::ir::*;
use esdown_common::NewLineKind;
use serde::{Deserialize, Serialize};

#[path = "ir_printer_helpers.rs"]
mod ir_printer_helpers;
pub use ir_printer_helpers::{escape_string, format_number};

/// Formatting knobs of the printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterOptions {
    /// Spaces per indentation level.
    pub indent_width: u32,
    pub new_line: NewLineKind,
    /// Annotate generator opcodes: `[4 /*yield*/, x]`.
    pub opcode_comments: bool,
    /// Prefix class IIFEs with `/*#__PURE__*/`.
    pub pure_annotations: bool,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        PrinterOptions {
            indent_width: 4,
            new_line: NewLineKind::LineFeed,
            opcode_comments: false,
            pure_annotations: true,
        }
    }
}

// Operator precedence levels, lowest first.
pub(crate) mod prec {
    pub const COMMA: u8 = 1;
    pub const ASSIGN: u8 = 2;
    pub const CONDITIONAL: u8 = 3;
    pub const LOGICAL_OR: u8 = 4;
    pub const LOGICAL_AND: u8 = 5;
    pub const BIT_OR: u8 = 6;
    pub const BIT_XOR: u8 = 7;
    pub const BIT_AND: u8 = 8;
    pub const EQUALITY: u8 = 9;
    pub const RELATIONAL: u8 = 10;
    pub const SHIFT: u8 = 11;
    pub const ADDITIVE: u8 = 12;
    pub const MULTIPLICATIVE: u8 = 13;
    pub const PREFIX: u8 = 15;
    pub const POSTFIX: u8 = 16;
    pub const CALL: u8 = 17;
    pub const MEMBER: u8 = 18;
    pub const PRIMARY: u8 = 19;
}

/// Printer for lowered IR.
pub struct IRPrinter {
    output: String,
    indent_level: u32,
    options: PrinterOptions,
    /// Step-function parameter names of the generator bodies being printed.
    state_names: Vec<String>,
}

impl Default for IRPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl IRPrinter {
    pub fn new() -> Self {
        Self::with_options(PrinterOptions::default())
    }

    pub fn with_options(options: PrinterOptions) -> Self {
        IRPrinter {
            output: String::with_capacity(1024),
            indent_level: 0,
            options,
            state_names: Vec::new(),
        }
    }

    /// Print a single node with default options.
    pub fn emit_to_string(node: &IRNode) -> String {
        let mut printer = Self::new();
        printer.emit(node);
        printer.output
    }

    /// Print a node at the current position.
    pub fn emit(&mut self, node: &IRNode) -> &str {
        self.emit_node(node);
        &self.output
    }

    /// Print a list of top-level statements, one per line.
    pub fn emit_statements(&mut self, nodes: &[IRNode]) {
        for node in nodes {
            self.emit_statement_line(node);
        }
    }

    pub fn get_output(&self) -> &str {
        &self.output
    }

    pub fn finish(self) -> String {
        self.output
    }

    // =========================================================================
    // Writer primitives
    // =========================================================================

    pub(super) fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    pub(super) fn write_line(&mut self) {
        self.output.push_str(self.options.new_line.as_str());
    }

    pub(super) fn write_indent(&mut self) {
        let width = (self.indent_level * self.options.indent_width) as usize;
        self.output.extend(std::iter::repeat_n(' ', width));
    }

    pub(super) const fn increase_indent(&mut self) {
        self.indent_level += 1;
    }

    pub(super) const fn decrease_indent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn state_name(&self) -> &str {
        self.state_names.last().map_or("_state", String::as_str)
    }

    /// Print a statement on its own line, flattening sequences.
    pub(super) fn emit_statement_line(&mut self, node: &IRNode) {
        match node {
            IRNode::Sequence(nodes) => {
                for n in nodes {
                    self.emit_statement_line(n);
                }
            }
            _ => {
                self.write_indent();
                self.emit_node(node);
                self.write_line();
            }
        }
    }

    /// Print `{`, the statements, and `}` at the current indentation.
    pub(super) fn emit_block_body(&mut self, statements: &[IRNode]) {
        if statements.iter().all(is_empty_sequence) {
            self.write("{}");
            return;
        }
        self.write("{");
        self.write_line();
        self.increase_indent();
        for stmt in statements {
            self.emit_statement_line(stmt);
        }
        self.decrease_indent();
        self.write_indent();
        self.write("}");
    }

    /// Print a nested statement position (loop or if body).
    fn emit_embedded_statement(&mut self, node: &IRNode) {
        match node {
            IRNode::Block(stmts) => self.emit_block_body(stmts),
            _ if is_empty_sequence(node) => self.write(";"),
            _ => self.emit_node(node),
        }
    }

    // =========================================================================
    // Node dispatch
    // =========================================================================

    pub(super) fn emit_node(&mut self, node: &IRNode) {
        match node {
            IRNode::NumericLiteral(n) => self.write(n),
            IRNode::StringLiteral(s) => {
                let escaped = escape_string(s);
                self.write(&escaped);
            }
            IRNode::BooleanLiteral(b) => self.write(if *b { "true" } else { "false" }),
            IRNode::NullLiteral => self.write("null"),
            IRNode::Undefined => self.write("void 0"),
            IRNode::RegexLiteral { pattern, flags } => {
                self.write("/");
                self.write(pattern);
                self.write("/");
                self.write(flags);
            }
            IRNode::Identifier(name) => self.write(name),
            IRNode::This { captured } => self.write(if *captured { "_this" } else { "this" }),

            IRNode::BinaryExpr {
                left,
                operator,
                right,
            } => {
                let p = binary_precedence(operator);
                if p == prec::ASSIGN {
                    // Right associative
                    self.emit_expr(left, prec::CALL);
                    self.write(" ");
                    self.write(operator);
                    self.write(" ");
                    self.emit_expr(right, prec::ASSIGN);
                } else {
                    self.emit_expr(left, p);
                    self.write(" ");
                    self.write(operator);
                    self.write(" ");
                    self.emit_expr(right, p + 1);
                }
            }
            IRNode::LogicalOr { left, right } => {
                self.emit_expr(left, prec::LOGICAL_OR);
                self.write(" || ");
                self.emit_expr(right, prec::LOGICAL_OR + 1);
            }
            IRNode::LogicalAnd { left, right } => {
                self.emit_expr(left, prec::LOGICAL_AND);
                self.write(" && ");
                self.emit_expr(right, prec::LOGICAL_AND + 1);
            }
            IRNode::PrefixUnaryExpr { operator, operand } => {
                self.write(operator);
                if needs_space_after_prefix(operator, operand) {
                    self.write(" ");
                }
                self.emit_expr(operand, prec::PREFIX);
            }
            IRNode::PostfixUnaryExpr { operand, operator } => {
                self.emit_expr(operand, prec::POSTFIX);
                self.write(operator);
            }
            IRNode::CallExpr { callee, arguments } => {
                self.emit_callee(callee);
                self.write("(");
                self.emit_arguments(arguments);
                self.write(")");
            }
            IRNode::NewExpr { callee, arguments } => {
                self.write("new ");
                if has_call_head(callee) || precedence(callee) < prec::MEMBER {
                    self.write("(");
                    self.emit_node(callee);
                    self.write(")");
                } else {
                    self.emit_node(callee);
                }
                self.write("(");
                self.emit_arguments(arguments);
                self.write(")");
            }
            IRNode::PropertyAccess { object, property } => {
                self.emit_member_object(object);
                self.write(".");
                self.write(property);
            }
            IRNode::ElementAccess { object, index } => {
                self.emit_member_object(object);
                self.write("[");
                self.emit_expr(index, prec::COMMA + 1);
                self.write("]");
            }
            IRNode::ConditionalExpr {
                condition,
                when_true,
                when_false,
            } => {
                self.emit_expr(condition, prec::LOGICAL_OR);
                self.write(" ? ");
                self.emit_expr(when_true, prec::ASSIGN);
                self.write(" : ");
                self.emit_expr(when_false, prec::ASSIGN);
            }
            IRNode::CommaExpr(exprs) => {
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.emit_expr(expr, prec::ASSIGN);
                }
            }
            IRNode::ArrayLiteral(elements) => {
                self.write("[");
                self.emit_arguments(elements);
                if matches!(elements.last(), Some(IRNode::OmittedExpression)) {
                    self.write(",");
                }
                self.write("]");
            }
            IRNode::OmittedExpression => {}
            IRNode::ObjectLiteral { properties } => self.emit_object_literal_multiline(properties),
            IRNode::FunctionExpr {
                name,
                parameters,
                body,
            } => {
                self.write("function");
                if let Some(name) = name {
                    self.write(" ");
                    self.write(name);
                }
                self.write("(");
                self.emit_parameters(parameters);
                self.write(") ");
                self.emit_function_body_with_defaults(parameters, body);
            }

            // Statements
            IRNode::VarDecl { name, initializer } => {
                self.write("var ");
                self.emit_declarator(name, initializer.as_deref());
                self.write(";");
            }
            IRNode::VarDeclList(decls) => {
                self.write("var ");
                self.emit_declarator_list(decls);
                self.write(";");
            }
            IRNode::ExpressionStatement(expr) => {
                if starts_with_ambiguous_token(expr) {
                    self.write("(");
                    self.emit_node(expr);
                    self.write(")");
                } else {
                    self.emit_expr(expr, prec::COMMA);
                }
                self.write(";");
            }
            IRNode::ReturnStatement(value) => {
                self.write("return");
                if let Some(value) = value {
                    self.write(" ");
                    self.emit_expr(value, prec::COMMA);
                }
                self.write(";");
            }
            IRNode::IfStatement {
                condition,
                then_branch,
                else_branch,
            } => {
                self.write("if (");
                self.emit_expr(condition, prec::COMMA);
                self.write(") ");
                self.emit_embedded_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    if matches!(**then_branch, IRNode::Block(_)) {
                        self.write(" else ");
                    } else {
                        self.write_line();
                        self.write_indent();
                        self.write("else ");
                    }
                    self.emit_embedded_statement(else_branch);
                }
            }
            IRNode::Block(stmts) => self.emit_block_body(stmts),
            IRNode::EmptyStatement => self.write(";"),
            IRNode::SwitchStatement { expression, cases } => {
                self.write("switch(");
                self.emit_expr(expression, prec::COMMA);
                self.write("){");
                self.write_line();
                self.increase_indent();
                for case in cases {
                    self.write_indent();
                    match &case.test {
                        Some(test) => {
                            self.write("case ");
                            self.emit_expr(test, prec::COMMA);
                            self.write(":");
                        }
                        None => self.write("default:"),
                    }
                    self.write_line();
                    self.increase_indent();
                    for stmt in &case.statements {
                        self.emit_statement_line(stmt);
                    }
                    self.decrease_indent();
                }
                self.decrease_indent();
                self.write_indent();
                self.write("}");
            }
            IRNode::ForStatement {
                initializer,
                condition,
                incrementor,
                body,
            } => {
                self.write("for(");
                if let Some(init) = initializer {
                    self.emit_for_initializer(init);
                }
                self.write(";");
                if let Some(cond) = condition {
                    self.write(" ");
                    self.emit_expr(cond, prec::COMMA);
                }
                self.write(";");
                if let Some(incr) = incrementor {
                    self.write(" ");
                    self.emit_expr(incr, prec::COMMA);
                }
                self.write(")");
                self.emit_loop_body(body);
            }
            IRNode::WhileStatement { condition, body } => {
                self.write("while(");
                self.emit_expr(condition, prec::COMMA);
                self.write(")");
                self.emit_loop_body(body);
            }
            IRNode::DoWhileStatement { body, condition } => {
                self.write("do ");
                self.emit_embedded_statement(body);
                self.write(" while(");
                self.emit_expr(condition, prec::COMMA);
                self.write(");");
            }
            IRNode::TryStatement {
                try_block,
                catch_clause,
                finally_block,
            } => {
                self.write("try ");
                self.emit_embedded_statement(try_block);
                if let Some(clause) = catch_clause {
                    self.write(" catch ");
                    if let Some(param) = &clause.param {
                        self.write("(");
                        self.write(param);
                        self.write(") ");
                    }
                    self.emit_block_body(&clause.body);
                }
                if let Some(finally_block) = finally_block {
                    self.write(" finally ");
                    self.emit_embedded_statement(finally_block);
                }
            }
            IRNode::ThrowStatement(expr) => {
                self.write("throw ");
                self.emit_expr(expr, prec::COMMA);
                self.write(";");
            }
            IRNode::BreakStatement(label) => {
                self.write("break");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            IRNode::ContinueStatement(label) => {
                self.write("continue");
                if let Some(label) = label {
                    self.write(" ");
                    self.write(label);
                }
                self.write(";");
            }
            IRNode::LabeledStatement { label, statement } => {
                self.write(label);
                self.write(": ");
                self.emit_node(statement);
            }
            IRNode::FunctionDecl {
                name,
                parameters,
                body,
            } => {
                self.write("function ");
                self.write(name);
                self.write("(");
                self.emit_parameters(parameters);
                self.write(") ");
                self.emit_function_body_with_defaults(parameters, body);
            }

            // ES5 classes
            IRNode::ES5ClassIIFE {
                base_param,
                base_class,
                body,
            } => {
                if self.options.pure_annotations {
                    self.write("/*#__PURE__*/ ");
                }
                self.write("function(");
                if let Some(param) = base_param {
                    self.write(param);
                }
                self.write(") ");
                self.emit_block_body(body);
                self.write("(");
                if let Some(base) = base_class {
                    self.emit_expr(base, prec::ASSIGN);
                }
                self.write(")");
            }
            IRNode::PrototypeMethod {
                proto_name,
                method_name,
                function,
            } => {
                self.write(proto_name);
                self.emit_method_name(method_name);
                self.write(" = ");
                self.emit_node(function);
                self.write(";");
            }
            IRNode::StaticMethod {
                class_name,
                method_name,
                function,
            } => {
                self.write(class_name);
                self.emit_method_name(method_name);
                self.write(" = ");
                self.emit_node(function);
                self.write(";");
            }

            // Generator state machine
            IRNode::GeneratorBody {
                state_name,
                uses_switch,
                cases,
            } => self.emit_generator_body(state_name, *uses_switch, cases),
            IRNode::GeneratorOp { opcode, value } => {
                self.write("[");
                self.write(&opcode.to_string());
                if self.options.opcode_comments {
                    self.write(" /*");
                    self.write(opcode_name(*opcode));
                    self.write("*/");
                }
                if let Some(value) = value {
                    self.write(", ");
                    self.emit_expr(value, prec::ASSIGN);
                }
                self.write("]");
            }
            IRNode::GeneratorSent => {
                let state = self.state_name().to_string();
                self.write(&state);
                self.write(".sent()");
            }
            IRNode::GeneratorLabel => {
                let state = self.state_name().to_string();
                self.write(&state);
                self.write(".label");
            }
            IRNode::GeneratorTrysPush { labels } => {
                let state = self.state_name().to_string();
                self.write(&state);
                self.write(".trys.push([");
                let last = labels.iter().rposition(Option::is_some).unwrap_or(0);
                // Missing handlers print as holes: [1, , 3, 4]
                for (i, label) in labels.iter().take(last + 1).enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    if let Some(label) = label {
                        self.write(&label.to_string());
                    }
                }
                self.write("]);");
            }
            IRNode::LabelRef(label) => self.write(&label.to_string()),

            // Modules
            IRNode::UseStrict => self.write("\"use strict\";"),
            IRNode::DefaultImport { local, source } => {
                self.write("import ");
                self.write(local);
                self.write(" from ");
                let escaped = escape_string(source);
                self.write(&escaped);
                self.write(";");
            }
            IRNode::RequireStatement { local, source } => {
                self.write("var ");
                self.write(local);
                self.write(" = require(");
                let escaped = escape_string(source);
                self.write(&escaped);
                self.write(");");
            }
            IRNode::Export(decl) => {
                self.write("export ");
                self.emit_node(decl);
            }

            IRNode::NamespaceIIFE {
                name,
                param_name,
                parent_name,
                body,
            } => {
                self.write("(function(");
                self.write(param_name);
                self.write(") ");
                self.emit_block_body(body);
                self.write(")(");
                match parent_name {
                    Some(parent) => {
                        // NS = Parent.NS || (Parent.NS = {})
                        self.write(name);
                        self.write(" = ");
                        self.write(parent);
                        self.write(".");
                        self.write(name);
                        self.write(" || (");
                        self.write(parent);
                        self.write(".");
                        self.write(name);
                        self.write(" = {})");
                    }
                    None => {
                        self.write(name);
                        self.write(" || (");
                        self.write(name);
                        self.write(" = {})");
                    }
                }
                self.write(");");
            }

            IRNode::Sequence(nodes) => {
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        self.write_line();
                        self.write_indent();
                    }
                    self.emit_node(node);
                }
            }
        }
    }

    fn emit_generator_body(&mut self, state_name: &str, uses_switch: bool, cases: &[IRGeneratorCase]) {
        self.state_names.push(state_name.to_string());
        self.write("function(");
        self.write(state_name);
        self.write(") {");
        self.write_line();
        self.increase_indent();
        if uses_switch {
            self.write_indent();
            self.write("switch(");
            self.write(state_name);
            self.write(".label){");
            self.write_line();
            self.increase_indent();
            for case in cases {
                self.write_indent();
                self.write("case ");
                self.write(&case.label.to_string());
                self.write(":");
                self.write_line();
                self.increase_indent();
                for stmt in &case.statements {
                    self.emit_statement_line(stmt);
                }
                self.decrease_indent();
            }
            self.decrease_indent();
            self.write_indent();
            self.write("}");
            self.write_line();
        } else {
            for case in cases {
                for stmt in &case.statements {
                    self.emit_statement_line(stmt);
                }
            }
        }
        self.decrease_indent();
        self.write_indent();
        self.write("}");
        self.state_names.pop();
    }

    fn emit_loop_body(&mut self, body: &IRNode) {
        match body {
            IRNode::Block(stmts) => self.emit_block_body(stmts),
            IRNode::EmptyStatement => self.write(";"),
            _ if is_empty_sequence(body) => self.write(";"),
            _ => {
                self.write(" ");
                self.emit_node(body);
            }
        }
    }

    fn emit_for_initializer(&mut self, init: &IRNode) {
        match init {
            IRNode::VarDecl { name, initializer } => {
                self.write("var ");
                self.emit_declarator(name, initializer.as_deref());
            }
            IRNode::VarDeclList(decls) => {
                self.write("var ");
                self.emit_declarator_list(decls);
            }
            _ => self.emit_expr(init, prec::COMMA),
        }
    }

    fn emit_declarator(&mut self, name: &str, initializer: Option<&IRNode>) {
        self.write(name);
        if let Some(init) = initializer {
            self.write(" = ");
            self.emit_expr(init, prec::ASSIGN);
        }
    }

    fn emit_declarator_list(&mut self, decls: &[IRNode]) {
        let mut first = true;
        for decl in decls {
            if let IRNode::VarDecl { name, initializer } = decl {
                if !first {
                    self.write(", ");
                }
                first = false;
                self.emit_declarator(name, initializer.as_deref());
            }
        }
    }

    fn emit_method_name(&mut self, name: &IRMethodName) {
        match name {
            IRMethodName::Identifier(n) => {
                self.write(".");
                self.write(n);
            }
            IRMethodName::StringLiteral(s) => {
                self.write("[");
                let escaped = escape_string(s);
                self.write(&escaped);
                self.write("]");
            }
            IRMethodName::NumericLiteral(n) => {
                self.write("[");
                self.write(n);
                self.write("]");
            }
            IRMethodName::Computed(expr) => {
                self.write("[");
                self.emit_expr(expr, prec::ASSIGN);
                self.write("]");
            }
        }
    }

    fn emit_arguments(&mut self, arguments: &[IRNode]) {
        for (i, arg) in arguments.iter().enumerate() {
            if i > 0 {
                self.write(",");
                if !matches!(arg, IRNode::OmittedExpression) {
                    self.write(" ");
                }
            }
            self.emit_expr(arg, prec::ASSIGN);
        }
    }

    fn emit_callee(&mut self, callee: &IRNode) {
        if matches!(callee, IRNode::FunctionExpr { .. }) || precedence(callee) < prec::CALL {
            self.write("(");
            self.emit_node(callee);
            self.write(")");
        } else {
            self.emit_node(callee);
        }
    }

    fn emit_member_object(&mut self, object: &IRNode) {
        let needs_parens = match object {
            IRNode::FunctionExpr { .. } | IRNode::NumericLiteral(_) => true,
            // `new C().x` would bind differently without arguments; ours always print them.
            IRNode::NewExpr { .. } => false,
            _ => precedence(object) < prec::CALL,
        };
        if needs_parens {
            self.write("(");
            self.emit_node(object);
            self.write(")");
        } else {
            self.emit_node(object);
        }
    }

    /// Emit an expression, parenthesizing it when its precedence is below `min`.
    pub(super) fn emit_expr(&mut self, node: &IRNode, min: u8) {
        if precedence(node) < min {
            self.write("(");
            self.emit_node(node);
            self.write(")");
        } else {
            self.emit_node(node);
        }
    }
}

fn is_empty_sequence(node: &IRNode) -> bool {
    matches!(node, IRNode::Sequence(nodes) if nodes.iter().all(is_empty_sequence))
}

pub(crate) fn opcode_name(opcode: u32) -> &'static str {
    match opcode {
        0 => "next",
        1 => "throw",
        2 => "return",
        3 => "break",
        4 => "yield",
        5 => "yield*",
        6 => "catch",
        7 => "endfinally",
        _ => "unknown",
    }
}

pub(crate) fn binary_precedence(operator: &str) -> u8 {
    match operator {
        "," => prec::COMMA,
        "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "<<=" | ">>=" | ">>>=" | "&=" | "|=" | "^=" => {
            prec::ASSIGN
        }
        "||" => prec::LOGICAL_OR,
        "&&" => prec::LOGICAL_AND,
        "|" => prec::BIT_OR,
        "^" => prec::BIT_XOR,
        "&" => prec::BIT_AND,
        "==" | "!=" | "===" | "!==" => prec::EQUALITY,
        "<" | ">" | "<=" | ">=" | "in" => prec::RELATIONAL,
        "<<" | ">>" | ">>>" => prec::SHIFT,
        "+" | "-" => prec::ADDITIVE,
        "*" | "/" | "%" => prec::MULTIPLICATIVE,
        _ => prec::ASSIGN,
    }
}

/// Precedence of an expression node. Statements and non-expressions report
/// `PRIMARY` since they never appear in operand position.
pub(crate) fn precedence(node: &IRNode) -> u8 {
    match node {
        IRNode::CommaExpr(_) => prec::COMMA,
        IRNode::BinaryExpr { operator, .. } => binary_precedence(operator),
        IRNode::ConditionalExpr { .. } => prec::CONDITIONAL,
        IRNode::LogicalOr { .. } => prec::LOGICAL_OR,
        IRNode::LogicalAnd { .. } => prec::LOGICAL_AND,
        IRNode::PrefixUnaryExpr { .. } => prec::PREFIX,
        IRNode::PostfixUnaryExpr { .. } => prec::POSTFIX,
        IRNode::CallExpr { .. } | IRNode::ES5ClassIIFE { .. } => prec::CALL,
        IRNode::NewExpr { .. } | IRNode::PropertyAccess { .. } | IRNode::ElementAccess { .. } => {
            prec::MEMBER
        }
        _ => prec::PRIMARY,
    }
}

/// Whether the leftmost token of a member chain is a call, which would make
/// `new` bind to the call instead of the whole chain.
fn has_call_head(node: &IRNode) -> bool {
    match node {
        IRNode::CallExpr { .. } => true,
        IRNode::PropertyAccess { object, .. } | IRNode::ElementAccess { object, .. } => {
            has_call_head(object)
        }
        _ => false,
    }
}

/// `-(-x)` and `+(+x)` must not print as `--x` / `++x`.
fn needs_space_after_prefix(operator: &str, operand: &IRNode) -> bool {
    if operator.chars().all(char::is_alphabetic) {
        return true;
    }
    match operand {
        IRNode::PrefixUnaryExpr { operator: inner, .. } => {
            let last = operator.chars().last();
            last.is_some() && inner.starts_with(|c| Some(c) == last)
        }
        IRNode::NumericLiteral(n) => operator == "-" && n.starts_with('-'),
        _ => false,
    }
}

/// Expression statements may not start with `function` or `{`.
fn starts_with_ambiguous_token(expr: &IRNode) -> bool {
    match expr {
        IRNode::FunctionExpr { .. } | IRNode::ObjectLiteral { .. } | IRNode::ES5ClassIIFE { .. } => {
            true
        }
        IRNode::BinaryExpr { left, .. }
        | IRNode::LogicalOr { left, .. }
        | IRNode::LogicalAnd { left, .. } => {
            precedence(left) >= precedence(expr) && starts_with_ambiguous_token(left)
        }
        IRNode::ConditionalExpr { condition, .. } => {
            precedence(condition) > prec::CONDITIONAL && starts_with_ambiguous_token(condition)
        }
        IRNode::CallExpr { callee, .. } => {
            !matches!(**callee, IRNode::FunctionExpr { .. })
                && precedence(callee) >= prec::CALL
                && starts_with_ambiguous_token(callee)
        }
        IRNode::PropertyAccess { object, .. } | IRNode::ElementAccess { object, .. } => {
            !matches!(**object, IRNode::FunctionExpr { .. })
                && precedence(object) >= prec::CALL
                && starts_with_ambiguous_token(object)
        }
        IRNode::PostfixUnaryExpr { operand, .. } => starts_with_ambiguous_token(operand),
        IRNode::CommaExpr(exprs) => exprs.first().is_some_and(starts_with_ambiguous_token),
        _ => false,
    }
}

#[cfg(test)]
#[path = "../../tests/ir_printer.rs"]
mod tests;
