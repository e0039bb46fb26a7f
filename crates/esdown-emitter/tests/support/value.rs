//! Values, host functions and completions shared by both evaluators.

use std::cell::RefCell;
use std::rc::Rc;

/// Functions the evaluated code can call by name.
pub const HOST_FUNCTIONS: &[&str] = &["log", "fail", "list"];

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Func(String),
}

/// How a whole function run ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Return(Value),
    Throw(Value),
}

/// Statement completion. Throws travel as `Err`.
#[derive(Clone, Debug, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

pub type Res<T> = Result<T, Value>;

/// What a loop does with its body's completion.
pub enum LoopStep {
    Next,
    Exit,
    Propagate(Flow),
}

pub fn loop_step(flow: Flow, labels: &[String]) -> LoopStep {
    match flow {
        Flow::Normal | Flow::Continue(None) => LoopStep::Next,
        Flow::Continue(Some(l)) if labels.contains(&l) => LoopStep::Next,
        Flow::Break(None) => LoopStep::Exit,
        Flow::Break(Some(l)) if labels.contains(&l) => LoopStep::Exit,
        other => LoopStep::Propagate(other),
    }
}

/// A switch body stops at an unlabeled break or a break naming the switch.
pub fn switch_step(flow: Flow, labels: &[String]) -> Option<Flow> {
    match flow {
        Flow::Normal => None,
        Flow::Break(None) => Some(Flow::Normal),
        Flow::Break(Some(l)) if labels.contains(&l) => Some(Flow::Normal),
        other => Some(other),
    }
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn str(s: &str) -> Self {
        Value::Str(s.to_string())
    }

    pub fn lookup_global(name: &str) -> Self {
        if HOST_FUNCTIONS.contains(&name) {
            Value::Func(name.to_string())
        } else {
            Value::Undefined
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Func(_) => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined | Value::Func(_) => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Num(n) => *n,
            Value::Str(s) if s.trim().is_empty() => 0.0,
            Value::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            Value::Array(items) => {
                let items = items.borrow();
                match items.as_slice() {
                    [] => 0.0,
                    [only] => only.to_number(),
                    _ => f64::NAN,
                }
            }
        }
    }

    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Num(n) => number_to_string(*n),
            Value::Str(s) => s.clone(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_js_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Func(name) => format!("function {name}() {{ [native code] }}"),
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Func(_) => "function",
        }
    }

    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => a == b,
            _ => false,
        }
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Num(_), Value::Str(_)) | (Value::Str(_), Value::Num(_)) => {
                self.to_number() == other.to_number()
            }
            (Value::Bool(_), _) | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_eq(other),
        }
    }

    /// Elements of an array value, for spread and `apply`.
    pub fn array_items(&self) -> Vec<Value> {
        match self {
            Value::Array(items) => items.borrow().clone(),
            other => panic!("expected an array, got {other:?}"),
        }
    }

    pub fn get_named(&self, name: &str) -> Value {
        match (self, name) {
            (Value::Array(items), "length") => Value::Num(items.borrow().len() as f64),
            (Value::Str(s), "length") => Value::Num(s.chars().count() as f64),
            _ => Value::Undefined,
        }
    }

    pub fn get_index(&self, key: &Value) -> Value {
        match (self, key) {
            (Value::Array(items), Value::Num(n)) if *n >= 0.0 && n.fract() == 0.0 => items
                .borrow()
                .get(*n as usize)
                .cloned()
                .unwrap_or(Value::Undefined),
            (Value::Array(_) | Value::Str(_), Value::Str(name)) => self.get_named(name),
            _ => Value::Undefined,
        }
    }
}

pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn to_int32(v: &Value) -> i32 {
    let n = v.to_number();
    if n.is_finite() { n.trunc() as i64 as i32 } else { 0 }
}

pub fn binary(op: &str, l: &Value, r: &Value) -> Value {
    let stringy = |v: &Value| matches!(v, Value::Str(_) | Value::Array(_));
    match op {
        "+" if stringy(l) || stringy(r) => {
            Value::Str(format!("{}{}", l.to_js_string(), r.to_js_string()))
        }
        "+" => Value::Num(l.to_number() + r.to_number()),
        "-" => Value::Num(l.to_number() - r.to_number()),
        "*" => Value::Num(l.to_number() * r.to_number()),
        "/" => Value::Num(l.to_number() / r.to_number()),
        "%" => Value::Num(l.to_number() % r.to_number()),
        "**" => Value::Num(l.to_number().powf(r.to_number())),
        "<" | ">" | "<=" | ">=" => {
            let ordering = match (l, r) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => l.to_number().partial_cmp(&r.to_number()),
            };
            let result = ordering.is_some_and(|o| match op {
                "<" => o.is_lt(),
                ">" => o.is_gt(),
                "<=" => o.is_le(),
                _ => o.is_ge(),
            });
            Value::Bool(result)
        }
        "===" => Value::Bool(l.strict_eq(r)),
        "!==" => Value::Bool(!l.strict_eq(r)),
        "==" => Value::Bool(l.loose_eq(r)),
        "!=" => Value::Bool(!l.loose_eq(r)),
        "&" => Value::Num(f64::from(to_int32(l) & to_int32(r))),
        "|" => Value::Num(f64::from(to_int32(l) | to_int32(r))),
        "^" => Value::Num(f64::from(to_int32(l) ^ to_int32(r))),
        "<<" => Value::Num(f64::from(to_int32(l).wrapping_shl(to_int32(r) as u32 & 31))),
        ">>" => Value::Num(f64::from(to_int32(l) >> (to_int32(r) as u32 & 31))),
        other => panic!("binary operator {other} is not supported by the test evaluators"),
    }
}

pub fn unary(op: &str, v: Value) -> Value {
    match op.trim() {
        "-" => Value::Num(-v.to_number()),
        "+" => Value::Num(v.to_number()),
        "!" => Value::Bool(!v.truthy()),
        "~" => Value::Num(f64::from(!to_int32(&v))),
        "typeof" => Value::str(v.type_of()),
        "void" => Value::Undefined,
        other => panic!("unary operator {other} is not supported by the test evaluators"),
    }
}

/// Call a host function. `log` records its arguments and returns the first,
/// `fail` throws its argument, `list` builds an array.
pub fn call_host(log: &mut Vec<String>, callee: &Value, args: Vec<Value>) -> Res<Value> {
    let Value::Func(name) = callee else {
        return Err(Value::Str(format!("{} is not a function", callee.to_js_string())));
    };
    match name.as_str() {
        "log" => {
            let line = args.iter().map(Value::to_js_string).collect::<Vec<_>>().join(",");
            log.push(format!("log:{line}"));
            Ok(args.into_iter().next().unwrap_or(Value::Undefined))
        }
        "fail" => {
            let reason = args.into_iter().next().unwrap_or(Value::Undefined);
            log.push(format!("fail:{}", reason.to_js_string()));
            Err(reason)
        }
        "list" => Ok(Value::array(args)),
        other => panic!("unknown host function {other}"),
    }
}

/// Suspend on `value` and compute what the function resumes with. A string
/// `"reject:<reason>"` resumes by throwing `<reason>`; anything else resumes
/// with itself.
pub fn suspend(log: &mut Vec<String>, value: Value) -> Res<Value> {
    log.push(format!("suspend:{}", value.to_js_string()));
    if let Value::Str(s) = &value
        && let Some(reason) = s.strip_prefix("reject:")
    {
        return Err(Value::str(reason));
    }
    Ok(value)
}
