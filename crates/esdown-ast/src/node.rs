//! Syntax node definitions.
//!
//! Node kinds are closed enums. The JSON form uses a `"type"` tag on every
//! statement, expression, property and member; spans are optional in JSON and
//! default to [`Span::DUMMY`].

use bitflags::bitflags;
use esdown_common::Span;
use serde::{Deserialize, Serialize};

// =============================================================================
// Unit
// =============================================================================

/// One input file: the granularity at which helpers are deduplicated and
/// temporaries are numbered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub file_name: String,
    #[serde(default)]
    pub statements: Vec<Stmt>,
}

impl SourceUnit {
    pub fn new(file_name: impl Into<String>, statements: Vec<Stmt>) -> Self {
        SourceUnit {
            file_name: file_name.into(),
            statements,
        }
    }
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Stmt {
    Expr {
        expr: Expr,
    },
    Var(VarDecl),
    Function(Function),
    Class(Class),
    Namespace(Namespace),
    /// `export <decl>`
    Export {
        decl: Box<Stmt>,
    },
    Return {
        #[serde(default)]
        arg: Option<Expr>,
    },
    If {
        test: Expr,
        consequent: Box<Stmt>,
        #[serde(default)]
        alternate: Option<Box<Stmt>>,
    },
    Block {
        body: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    For {
        #[serde(default)]
        init: Option<ForInit>,
        #[serde(default)]
        test: Option<Expr>,
        #[serde(default)]
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `for (<kind> <binding> of <iterable>)`. The iterable is treated as an
    /// array-like value.
    ForOf {
        kind: VarKind,
        binding: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Try(TryStmt),
    Throw {
        arg: Expr,
    },
    Break {
        #[serde(default)]
        label: Option<String>,
    },
    Continue {
        #[serde(default)]
        label: Option<String>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    With {
        object: Expr,
        body: Box<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<VarDeclarator>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarDeclarator {
    pub name: String,
    #[serde(default)]
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ForInit {
    Var(VarDecl),
    Expr { expr: Expr },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` for `default:`
    #[serde(default)]
    pub test: Option<Expr>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TryStmt {
    pub block: Vec<Stmt>,
    #[serde(default)]
    pub handler: Option<CatchClause>,
    #[serde(default)]
    pub finalizer: Option<Vec<Stmt>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    #[serde(default)]
    pub param: Option<String>,
    pub body: Vec<Stmt>,
}

// =============================================================================
// Functions and classes
// =============================================================================

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FunctionFlags: u8 {
        const ASYNC = 1 << 0;
        const GENERATOR = 1 << 1;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Function {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub flags: FunctionFlags,
    #[serde(default)]
    pub span: Span,
}

impl Function {
    pub fn is_async(&self) -> bool {
        self.flags.contains(FunctionFlags::ASYNC)
    }

    pub fn is_generator(&self) -> bool {
        self.flags.contains(FunctionFlags::GENERATOR)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub default: Option<Expr>,
    /// `...name`
    #[serde(default)]
    pub rest: bool,
    /// TypeScript parameter property (`constructor(public x)`).
    #[serde(default)]
    pub property: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    #[serde(default)]
    pub params: Vec<Param>,
    pub body: ArrowBody,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ArrowBody {
    Block { body: Vec<Stmt> },
    Expr { expr: Box<Expr> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Class {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub super_class: Option<Box<Expr>>,
    #[serde(default)]
    pub members: Vec<ClassMember>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClassMember {
    Constructor {
        #[serde(default)]
        params: Vec<Param>,
        #[serde(default)]
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Method {
        key: PropName,
        function: Function,
        #[serde(default)]
        kind: MethodKind,
        #[serde(default)]
        is_static: bool,
    },
    Property {
        key: PropName,
        #[serde(default)]
        value: Option<Expr>,
        #[serde(default)]
        is_static: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    #[default]
    Method,
    Getter,
    Setter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    /// Qualified name segments: `namespace A.B.C` is `["A", "B", "C"]`.
    pub name: Vec<String>,
    #[serde(default)]
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expr {
    Ident {
        name: String,
    },
    Lit {
        value: Lit,
    },
    /// Untagged template literal: `quasis.len() == exprs.len() + 1`.
    Template {
        quasis: Vec<String>,
        #[serde(default)]
        exprs: Vec<Expr>,
    },
    This,
    Array {
        /// `None` is an elision (`[a, , b]`).
        elements: Vec<Option<ExprOrSpread>>,
    },
    Object {
        props: Vec<Prop>,
    },
    Function(Function),
    Arrow(Arrow),
    Class(Class),
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Cond {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<ExprOrSpread>,
    },
    New {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<ExprOrSpread>,
    },
    Member {
        object: Box<Expr>,
        property: MemberProp,
    },
    /// `super(args)`
    SuperCall {
        #[serde(default)]
        args: Vec<ExprOrSpread>,
        #[serde(default)]
        span: Span,
    },
    /// `super.prop` / `super[expr]`
    SuperMember {
        property: MemberProp,
        #[serde(default)]
        span: Span,
    },
    Seq {
        exprs: Vec<Expr>,
    },
    Await {
        arg: Box<Expr>,
        #[serde(default)]
        span: Span,
    },
    Yield {
        #[serde(default)]
        arg: Option<Box<Expr>>,
        #[serde(default)]
        delegate: bool,
        #[serde(default)]
        span: Span,
    },
}

impl Expr {
    /// Identifier and member expressions: the valid assignment targets.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Expr::Ident { .. } | Expr::Member { .. } | Expr::SuperMember { .. }
        )
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident { name } => Some(name),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Lit {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
    Regex { pattern: String, flags: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExprOrSpread {
    #[serde(default)]
    pub spread: bool,
    pub expr: Expr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MemberProp {
    Ident { name: String },
    Computed { expr: Box<Expr> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PropName {
    Ident { name: String },
    Str { value: String },
    Num { value: f64 },
    Computed { expr: Box<Expr> },
}

impl PropName {
    pub fn is_computed(&self) -> bool {
        matches!(self, PropName::Computed { .. })
    }

    /// Static key text, if the key is not computed.
    pub fn static_name(&self) -> Option<String> {
        match self {
            PropName::Ident { name } => Some(name.clone()),
            PropName::Str { value } => Some(value.clone()),
            PropName::Num { value } => Some(format!("{value}")),
            PropName::Computed { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Prop {
    KeyValue {
        key: PropName,
        value: Expr,
    },
    Shorthand {
        name: String,
    },
    Method {
        key: PropName,
        function: Function,
    },
    Getter {
        key: PropName,
        function: Function,
    },
    Setter {
        key: PropName,
        function: Function,
    },
    Spread {
        expr: Expr,
        #[serde(default)]
        span: Span,
    },
}

// =============================================================================
// Operators
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "~")]
    BitNot,
    #[serde(rename = "typeof")]
    TypeOf,
    #[serde(rename = "void")]
    Void,
    #[serde(rename = "delete")]
    Delete,
}

impl UnaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::TypeOf => "typeof ",
            UnaryOp::Void => "void ",
            UnaryOp::Delete => "delete ",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateOp {
    #[serde(rename = "++")]
    Increment,
    #[serde(rename = "--")]
    Decrement,
}

impl UpdateOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "**")]
    Exp,
    #[serde(rename = "==")]
    EqEq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "===")]
    EqEqEq,
    #[serde(rename = "!==")]
    NotEqEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
    #[serde(rename = ">>>")]
    UShr,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "instanceof")]
    InstanceOf,
}

impl BinaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::EqEq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::EqEqEq => "===",
            BinaryOp::NotEqEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "??")]
    Nullish,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignOp {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubAssign,
    #[serde(rename = "*=")]
    MulAssign,
    #[serde(rename = "/=")]
    DivAssign,
    #[serde(rename = "%=")]
    ModAssign,
    #[serde(rename = "<<=")]
    ShlAssign,
    #[serde(rename = ">>=")]
    ShrAssign,
    #[serde(rename = ">>>=")]
    UShrAssign,
    #[serde(rename = "&=")]
    BitAndAssign,
    #[serde(rename = "|=")]
    BitOrAssign,
    #[serde(rename = "^=")]
    BitXorAssign,
}

impl AssignOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
            AssignOp::ShlAssign => "<<=",
            AssignOp::ShrAssign => ">>=",
            AssignOp::UShrAssign => ">>>=",
            AssignOp::BitAndAssign => "&=",
            AssignOp::BitOrAssign => "|=",
            AssignOp::BitXorAssign => "^=",
        }
    }

    /// The binary operator a compound assignment applies, if any.
    pub const fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
            AssignOp::ShlAssign => Some(BinaryOp::Shl),
            AssignOp::ShrAssign => Some(BinaryOp::Shr),
            AssignOp::UShrAssign => Some(BinaryOp::UShr),
            AssignOp::BitAndAssign => Some(BinaryOp::BitAnd),
            AssignOp::BitOrAssign => Some(BinaryOp::BitOr),
            AssignOp::BitXorAssign => Some(BinaryOp::BitXor),
        }
    }
}

#[cfg(test)]
#[path = "../tests/node.rs"]
mod tests;
