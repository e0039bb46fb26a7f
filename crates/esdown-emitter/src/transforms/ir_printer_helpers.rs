//! Helper methods for the IR printer.
//!
//! Contains parameter lists, ES5 function body emission with default
//! parameters, object literal layout, and literal text formatting.

use super::*;

impl IRPrinter {
    pub(super) fn emit_parameters(&mut self, params: &[IRParam]) {
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&param.name);
        }
    }

    /// Emit function body with default parameter checks prepended (ES5 style)
    pub(super) fn emit_function_body_with_defaults(&mut self, params: &[IRParam], body: &[IRNode]) {
        let has_defaults = params.iter().any(|p| p.default_value.is_some());
        if !has_defaults {
            self.emit_block_body(body);
            return;
        }

        self.write("{");
        self.write_line();
        self.increase_indent();
        for param in params {
            if let Some(default) = &param.default_value {
                // if (p === void 0) p = default;
                self.write_indent();
                self.write("if (");
                self.write(&param.name);
                self.write(" === void 0) ");
                self.write(&param.name);
                self.write(" = ");
                self.emit_expr(default, prec::ASSIGN);
                self.write(";");
                self.write_line();
            }
        }
        for stmt in body {
            self.emit_statement_line(stmt);
        }
        self.decrease_indent();
        self.write_indent();
        self.write("}");
    }

    /// Non-empty object literals put one property per line.
    pub(super) fn emit_object_literal_multiline(&mut self, properties: &[IRProperty]) {
        if properties.is_empty() {
            self.write("{}");
            return;
        }
        self.write("{");
        self.write_line();
        self.increase_indent();
        for (i, prop) in properties.iter().enumerate() {
            self.write_indent();
            self.emit_property(prop);
            if i + 1 < properties.len() {
                self.write(",");
            }
            self.write_line();
        }
        self.decrease_indent();
        self.write_indent();
        self.write("}");
    }

    fn emit_property(&mut self, prop: &IRProperty) {
        match prop.kind {
            IRPropertyKind::Init => {
                self.emit_property_key(&prop.key);
                self.write(": ");
                self.emit_expr(&prop.value, prec::ASSIGN);
            }
            IRPropertyKind::Get | IRPropertyKind::Set => {
                self.write(if prop.kind == IRPropertyKind::Get {
                    "get "
                } else {
                    "set "
                });
                self.emit_property_key(&prop.key);
                match &prop.value {
                    IRNode::FunctionExpr {
                        parameters, body, ..
                    } => {
                        self.write("(");
                        self.emit_parameters(parameters);
                        self.write(") ");
                        self.emit_function_body_with_defaults(parameters, body);
                    }
                    other => {
                        self.write("() ");
                        self.emit_block_body(std::slice::from_ref(other));
                    }
                }
            }
        }
    }

    fn emit_property_key(&mut self, key: &IRPropertyKey) {
        match key {
            IRPropertyKey::Identifier(name) | IRPropertyKey::NumericLiteral(name) => self.write(name),
            IRPropertyKey::StringLiteral(s) => {
                let escaped = escape_string(s);
                self.write(&escaped);
            }
        }
    }
}

/// Quote and escape a string as a double-quoted JavaScript literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\x{:02X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Format an `f64` the way JavaScript's `Number.prototype.toString` does for
/// the values that appear as literals.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let abs = value.abs();
    if (1e-6..1e21).contains(&abs) {
        // Shortest round-trip repr, which never uses an exponent in this range
        let text = format!("{value}");
        return text;
    }

    // Exponent form: 1e+21, 1.5e-7
    let text = format!("{value:e}");
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => text,
    }
}
