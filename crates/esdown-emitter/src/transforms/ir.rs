//! Lowered IR (Intermediate Representation) for Transforms
//!
//! Lowering rules produce a tree of `IRNode`s instead of strings. The IR
//! describes ES5 JavaScript constructs only; everything that needed a rewrite
//! has already been rewritten by the time a node is built. The printer walks
//! these trees and emits text.
//!
//! # IR Structure
//!
//! Expressions and statements share one enum. Statement variants print their
//! own terminator (`;` or a closing brace); expression variants never do.
//! A handful of variants exist only for the generator state machine
//! (`GeneratorBody`, `GeneratorOp`, `GeneratorSent`, `GeneratorLabel`,
//! `GeneratorTrysPush`, `LabelRef`).

/// Intermediate Representation node for transformed JavaScript
#[derive(Debug, Clone, PartialEq)]
pub enum IRNode {
    // =========================================================================
    // Literals
    // =========================================================================
    /// Numeric literal: `42`, `3.14`
    NumericLiteral(String),

    /// String literal, printed double-quoted: `"hello"`
    StringLiteral(String),

    /// Boolean literal: `true`, `false`
    BooleanLiteral(bool),

    /// Null literal: `null`
    NullLiteral,

    /// Undefined: `void 0`
    Undefined,

    /// Regular expression literal: `/ab+c/gi`
    RegexLiteral { pattern: String, flags: String },

    // =========================================================================
    // Identifiers
    // =========================================================================
    /// Identifier: `foo`, `_bar`
    Identifier(String),

    /// This keyword: `this` or `_this` (for captures)
    This { captured: bool },

    // =========================================================================
    // Expressions
    // =========================================================================
    /// Binary expression: `left op right`. Assignment operators use this too.
    BinaryExpr {
        left: Box<Self>,
        operator: String,
        right: Box<Self>,
    },

    /// Unary prefix expression: `!x`, `-x`, `++x`, `typeof x`
    PrefixUnaryExpr {
        operator: String,
        operand: Box<Self>,
    },

    /// Unary postfix expression: `x++`, `x--`
    PostfixUnaryExpr {
        operand: Box<Self>,
        operator: String,
    },

    /// Call expression: `callee(args)`
    CallExpr {
        callee: Box<Self>,
        arguments: Vec<Self>,
    },

    /// New expression: `new Callee(args)`
    NewExpr {
        callee: Box<Self>,
        arguments: Vec<Self>,
    },

    /// Property access: `object.property`
    PropertyAccess { object: Box<Self>, property: String },

    /// Element access: `object[index]`
    ElementAccess { object: Box<Self>, index: Box<Self> },

    /// Conditional expression: `cond ? then : else`
    ConditionalExpr {
        condition: Box<Self>,
        when_true: Box<Self>,
        when_false: Box<Self>,
    },

    /// Comma expression: `a, b, c`
    CommaExpr(Vec<Self>),

    /// Array literal: `[a, b, c]`
    ArrayLiteral(Vec<Self>),

    /// Array hole: the empty slot in `[a, , b]`
    OmittedExpression,

    /// Object literal: `{ key: value, ... }`
    ObjectLiteral { properties: Vec<IRProperty> },

    /// Function expression: `function name(params) { body }`
    FunctionExpr {
        name: Option<String>,
        parameters: Vec<IRParam>,
        body: Vec<Self>,
    },

    /// Logical OR: `left || right`
    LogicalOr { left: Box<Self>, right: Box<Self> },

    /// Logical AND: `left && right`
    LogicalAnd { left: Box<Self>, right: Box<Self> },

    // =========================================================================
    // Statements
    // =========================================================================
    /// Variable declaration: `var x = value;`
    VarDecl {
        name: String,
        initializer: Option<Box<Self>>,
    },

    /// Multiple variable declarations: `var a = 1, b = 2;`
    VarDeclList(Vec<Self>),

    /// Expression statement: `expr;`
    ExpressionStatement(Box<Self>),

    /// Return statement: `return expr;`
    ReturnStatement(Option<Box<Self>>),

    /// If statement: `if (cond) { then } else { else }`
    IfStatement {
        condition: Box<Self>,
        then_branch: Box<Self>,
        else_branch: Option<Box<Self>>,
    },

    /// Block statement: `{ statements }`
    Block(Vec<Self>),

    /// Empty statement: `;`
    EmptyStatement,

    /// Switch statement
    SwitchStatement {
        expression: Box<Self>,
        cases: Vec<IRSwitchCase>,
    },

    /// For statement: `for(init; cond; incr){ body }`
    ForStatement {
        initializer: Option<Box<Self>>,
        condition: Option<Box<Self>>,
        incrementor: Option<Box<Self>>,
        body: Box<Self>,
    },

    /// While statement: `while(cond){ body }`
    WhileStatement {
        condition: Box<Self>,
        body: Box<Self>,
    },

    /// Do-while statement: `do { body } while(cond);`
    DoWhileStatement {
        body: Box<Self>,
        condition: Box<Self>,
    },

    /// Try statement: `try { block } catch (e) { handler } finally { finalizer }`
    TryStatement {
        try_block: Box<Self>,
        catch_clause: Option<IRCatchClause>,
        finally_block: Option<Box<Self>>,
    },

    /// Throw statement: `throw expr;`
    ThrowStatement(Box<Self>),

    /// Break statement: `break;` or `break label;`
    BreakStatement(Option<String>),

    /// Continue statement: `continue;` or `continue label;`
    ContinueStatement(Option<String>),

    /// Labeled statement: `label: stmt`
    LabeledStatement { label: String, statement: Box<Self> },

    // =========================================================================
    // Declarations
    // =========================================================================
    /// Function declaration: `function name(params) { body }`
    FunctionDecl {
        name: String,
        parameters: Vec<IRParam>,
        body: Vec<Self>,
    },

    // =========================================================================
    // ES5 Class Transform Specific
    // =========================================================================
    /// IIFE expression for an ES5 class:
    /// `/*#__PURE__*/ function(Base) { "use strict"; ... return C; }(Base)`
    ES5ClassIIFE {
        /// Parameter receiving the base class, when the class extends one.
        base_param: Option<String>,
        base_class: Option<Box<Self>>,
        body: Vec<Self>,
    },

    /// Prototype method assignment: `_proto.method = function method() {...};`
    PrototypeMethod {
        proto_name: String,
        method_name: IRMethodName,
        function: Box<Self>,
    },

    /// Static method assignment: `ClassName.method = function method() {...};`
    StaticMethod {
        class_name: String,
        method_name: IRMethodName,
        function: Box<Self>,
    },

    // =========================================================================
    // Generator State Machine
    // =========================================================================
    /// Step function handed to the generator driver:
    /// `function(_state) { switch(_state.label){ ... } }`
    GeneratorBody {
        state_name: String,
        /// Whether this uses switch/case or a single straight-line case
        uses_switch: bool,
        cases: Vec<IRGeneratorCase>,
    },

    /// Generator operation: `[opcode, value]`
    GeneratorOp {
        opcode: u32,
        value: Option<Box<Self>>,
    },

    /// `_state.sent()` - the value (or thrown error) the machine resumed with
    GeneratorSent,

    /// `_state.label` - the label property
    GeneratorLabel,

    /// `_state.trys.push([try, catch, finally, end]);`
    GeneratorTrysPush { labels: [Option<u32>; 4] },

    /// A state machine label. Abstract while the machine is being built,
    /// resolved to the concrete case number before printing.
    LabelRef(u32),

    // =========================================================================
    // Module IR Nodes
    // =========================================================================
    /// "use strict" directive
    UseStrict,

    /// `import local from "source";`
    DefaultImport { local: String, source: String },

    /// `var local = require("source");`
    RequireStatement { local: String, source: String },

    /// `export <declaration>`
    Export(Box<Self>),

    // =========================================================================
    // Namespace IR Nodes
    // =========================================================================
    /// Namespace IIFE: `(function(NS) { ... })(NS || (NS = {}));`
    /// With a parent: `(function(NS) { ... })(NS = Parent.NS || (Parent.NS = {}));`
    NamespaceIIFE {
        name: String,
        param_name: String,
        parent_name: Option<String>,
        body: Vec<Self>,
    },

    // =========================================================================
    // Special
    // =========================================================================
    /// Sequence of statements/nodes
    Sequence(Vec<Self>),
}

/// Property in an object literal
#[derive(Debug, Clone, PartialEq)]
pub struct IRProperty {
    pub key: IRPropertyKey,
    pub value: IRNode,
    pub kind: IRPropertyKind,
}

/// Object property key. ES5 object literals have no computed keys; those are
/// lowered to `_define_property` calls before reaching the IR.
#[derive(Debug, Clone, PartialEq)]
pub enum IRPropertyKey {
    Identifier(String),
    StringLiteral(String),
    NumericLiteral(String),
}

/// Object property kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IRPropertyKind {
    Init,
    Get,
    Set,
}

/// Method name (for prototype/static assignments)
#[derive(Debug, Clone, PartialEq)]
pub enum IRMethodName {
    Identifier(String),
    StringLiteral(String),
    NumericLiteral(String),
    Computed(Box<IRNode>),
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct IRParam {
    pub name: String,
    pub default_value: Option<Box<IRNode>>,
}

/// Switch case
#[derive(Debug, Clone, PartialEq)]
pub struct IRSwitchCase {
    pub test: Option<IRNode>, // None for default case
    pub statements: Vec<IRNode>,
}

/// Catch clause
#[derive(Debug, Clone, PartialEq)]
pub struct IRCatchClause {
    pub param: Option<String>,
    pub body: Vec<IRNode>,
}

/// Generator case (for the state machine switch)
#[derive(Debug, Clone, PartialEq)]
pub struct IRGeneratorCase {
    pub label: u32,
    pub statements: Vec<IRNode>,
}

// =========================================================================
// Builder helpers for IR construction
// =========================================================================

impl IRNode {
    /// Create an identifier node
    pub fn id(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    /// Create a string literal
    pub fn string(s: impl Into<String>) -> Self {
        Self::StringLiteral(s.into())
    }

    /// Create a numeric literal
    pub fn number(n: impl Into<String>) -> Self {
        Self::NumericLiteral(n.into())
    }

    /// Create a numeric literal from an integer
    pub fn int(n: u32) -> Self {
        Self::NumericLiteral(n.to_string())
    }

    /// Create a call expression
    pub fn call(callee: Self, args: Vec<Self>) -> Self {
        Self::CallExpr {
            callee: Box::new(callee),
            arguments: args,
        }
    }

    /// Create a method call: `object.method(args)`
    pub fn method_call(object: Self, method: impl Into<String>, args: Vec<Self>) -> Self {
        Self::call(Self::prop(object, method), args)
    }

    /// Create a property access
    pub fn prop(object: Self, property: impl Into<String>) -> Self {
        Self::PropertyAccess {
            object: Box::new(object),
            property: property.into(),
        }
    }

    /// Create an element access
    pub fn elem(object: Self, index: Self) -> Self {
        Self::ElementAccess {
            object: Box::new(object),
            index: Box::new(index),
        }
    }

    /// Create a binary expression
    pub fn binary(left: Self, op: impl Into<String>, right: Self) -> Self {
        Self::BinaryExpr {
            left: Box::new(left),
            operator: op.into(),
            right: Box::new(right),
        }
    }

    /// Create an assignment expression
    pub fn assign(target: Self, value: Self) -> Self {
        Self::BinaryExpr {
            left: Box::new(target),
            operator: "=".to_string(),
            right: Box::new(value),
        }
    }

    /// Create a prefix unary expression
    pub fn prefix(op: impl Into<String>, operand: Self) -> Self {
        Self::PrefixUnaryExpr {
            operator: op.into(),
            operand: Box::new(operand),
        }
    }

    /// Create a logical negation: `!expr`
    pub fn not(operand: Self) -> Self {
        Self::prefix("!", operand)
    }

    /// Create a var declaration
    pub fn var_decl(name: impl Into<String>, init: Option<Self>) -> Self {
        Self::VarDecl {
            name: name.into(),
            initializer: init.map(Box::new),
        }
    }

    /// Create `var a, b, c;` with no initializers
    pub fn var_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::VarDeclList(
            names
                .into_iter()
                .map(|n| Self::var_decl(n, None))
                .collect(),
        )
    }

    /// Create a return statement
    pub fn ret(expr: Option<Self>) -> Self {
        Self::ReturnStatement(expr.map(Box::new))
    }

    /// Create a function expression
    pub const fn func_expr(name: Option<String>, params: Vec<IRParam>, body: Vec<Self>) -> Self {
        Self::FunctionExpr {
            name,
            parameters: params,
            body,
        }
    }

    /// Create a function declaration
    pub fn func_decl(name: impl Into<String>, params: Vec<IRParam>, body: Vec<Self>) -> Self {
        Self::FunctionDecl {
            name: name.into(),
            parameters: params,
            body,
        }
    }

    /// Create `this` reference
    pub const fn this() -> Self {
        Self::This { captured: false }
    }

    /// Create `_this` reference (captured)
    pub const fn this_captured() -> Self {
        Self::This { captured: true }
    }

    /// Create `void 0`
    pub const fn void_0() -> Self {
        Self::Undefined
    }

    /// Create a block
    pub const fn block(stmts: Vec<Self>) -> Self {
        Self::Block(stmts)
    }

    /// Create an expression statement
    pub fn expr_stmt(expr: Self) -> Self {
        Self::ExpressionStatement(Box::new(expr))
    }

    /// Create an if statement without an else branch
    pub fn if_then(condition: Self, then_branch: Self) -> Self {
        Self::IfStatement {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: None,
        }
    }

    /// Create an object literal
    pub const fn object(props: Vec<IRProperty>) -> Self {
        Self::ObjectLiteral { properties: props }
    }

    /// Create an empty object literal
    pub const fn empty_object() -> Self {
        Self::ObjectLiteral {
            properties: Vec::new(),
        }
    }

    /// Create an array literal
    pub const fn array(elements: Vec<Self>) -> Self {
        Self::ArrayLiteral(elements)
    }

    /// Create a logical OR expression: `left || right`
    pub fn logical_or(left: Self, right: Self) -> Self {
        Self::LogicalOr {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a logical AND expression: `left && right`
    pub fn logical_and(left: Self, right: Self) -> Self {
        Self::LogicalAnd {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Create a conditional expression
    pub fn conditional(condition: Self, when_true: Self, when_false: Self) -> Self {
        Self::ConditionalExpr {
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: Box::new(when_false),
        }
    }

    /// Create a sequence of statements
    pub const fn sequence(nodes: Vec<Self>) -> Self {
        Self::Sequence(nodes)
    }

    /// Create a new expression: `new Constructor(args)`
    pub fn new_expr(callee: Self, args: Vec<Self>) -> Self {
        Self::NewExpr {
            callee: Box::new(callee),
            arguments: args,
        }
    }

    /// Create a generator operation: `[opcode, value]`
    pub fn generator_op(opcode: u32, value: Option<Self>) -> Self {
        Self::GeneratorOp {
            opcode,
            value: value.map(Box::new),
        }
    }

    /// Literals and identifiers: evaluating them twice is unobservable.
    pub const fn is_simple(&self) -> bool {
        matches!(
            self,
            Self::NumericLiteral(_)
                | Self::StringLiteral(_)
                | Self::BooleanLiteral(_)
                | Self::NullLiteral
                | Self::Undefined
                | Self::Identifier(_)
                | Self::This { .. }
        )
    }

    /// Constant literals: safe to evaluate out of order.
    pub const fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::NumericLiteral(_)
                | Self::StringLiteral(_)
                | Self::BooleanLiteral(_)
                | Self::NullLiteral
                | Self::Undefined
        )
    }

    /// Visit every direct child node mutably.
    pub fn for_each_child_mut(&mut self, f: &mut dyn FnMut(&mut IRNode)) {
        match self {
            Self::NumericLiteral(_)
            | Self::StringLiteral(_)
            | Self::BooleanLiteral(_)
            | Self::NullLiteral
            | Self::Undefined
            | Self::RegexLiteral { .. }
            | Self::Identifier(_)
            | Self::This { .. }
            | Self::OmittedExpression
            | Self::EmptyStatement
            | Self::BreakStatement(_)
            | Self::ContinueStatement(_)
            | Self::GeneratorSent
            | Self::GeneratorLabel
            | Self::GeneratorTrysPush { .. }
            | Self::LabelRef(_)
            | Self::UseStrict
            | Self::DefaultImport { .. }
            | Self::RequireStatement { .. } => {}
            Self::BinaryExpr { left, right, .. }
            | Self::LogicalOr { left, right }
            | Self::LogicalAnd { left, right } => {
                f(left);
                f(right);
            }
            Self::PrefixUnaryExpr { operand, .. } | Self::PostfixUnaryExpr { operand, .. } => {
                f(operand);
            }
            Self::CallExpr { callee, arguments } | Self::NewExpr { callee, arguments } => {
                f(callee);
                arguments.iter_mut().for_each(|a| f(a));
            }
            Self::PropertyAccess { object, .. } => f(object),
            Self::ElementAccess { object, index } => {
                f(object);
                f(index);
            }
            Self::ConditionalExpr {
                condition,
                when_true,
                when_false,
            } => {
                f(condition);
                f(when_true);
                f(when_false);
            }
            Self::ExpressionStatement(inner)
            | Self::ThrowStatement(inner)
            | Self::Export(inner) => f(inner),
            Self::CommaExpr(nodes)
            | Self::ArrayLiteral(nodes)
            | Self::VarDeclList(nodes)
            | Self::Block(nodes)
            | Self::Sequence(nodes) => nodes.iter_mut().for_each(|n| f(n)),
            Self::ObjectLiteral { properties } => {
                properties.iter_mut().for_each(|p| f(&mut p.value));
            }
            Self::FunctionExpr {
                parameters, body, ..
            }
            | Self::FunctionDecl {
                parameters, body, ..
            } => {
                for param in parameters.iter_mut() {
                    if let Some(default) = &mut param.default_value {
                        f(default);
                    }
                }
                body.iter_mut().for_each(|n| f(n));
            }
            Self::VarDecl { initializer, .. } => {
                if let Some(init) = initializer {
                    f(init);
                }
            }
            Self::ReturnStatement(value) => {
                if let Some(value) = value {
                    f(value);
                }
            }
            Self::IfStatement {
                condition,
                then_branch,
                else_branch,
            } => {
                f(condition);
                f(then_branch);
                if let Some(else_branch) = else_branch {
                    f(else_branch);
                }
            }
            Self::SwitchStatement { expression, cases } => {
                f(expression);
                for case in cases.iter_mut() {
                    if let Some(test) = &mut case.test {
                        f(test);
                    }
                    case.statements.iter_mut().for_each(|n| f(n));
                }
            }
            Self::ForStatement {
                initializer,
                condition,
                incrementor,
                body,
            } => {
                for part in [initializer, condition, incrementor].into_iter().flatten() {
                    f(part);
                }
                f(body);
            }
            Self::WhileStatement { condition, body } | Self::DoWhileStatement { body, condition } => {
                f(condition);
                f(body);
            }
            Self::TryStatement {
                try_block,
                catch_clause,
                finally_block,
            } => {
                f(try_block);
                if let Some(clause) = catch_clause {
                    clause.body.iter_mut().for_each(|n| f(n));
                }
                if let Some(finally_block) = finally_block {
                    f(finally_block);
                }
            }
            Self::LabeledStatement { statement, .. } => f(statement),
            Self::ES5ClassIIFE {
                base_class, body, ..
            } => {
                if let Some(base) = base_class {
                    f(base);
                }
                body.iter_mut().for_each(|n| f(n));
            }
            Self::PrototypeMethod {
                method_name,
                function,
                ..
            }
            | Self::StaticMethod {
                method_name,
                function,
                ..
            } => {
                if let IRMethodName::Computed(expr) = method_name {
                    f(expr);
                }
                f(function);
            }
            Self::GeneratorBody { cases, .. } => {
                for case in cases.iter_mut() {
                    case.statements.iter_mut().for_each(|n| f(n));
                }
            }
            Self::GeneratorOp { value, .. } => {
                if let Some(value) = value {
                    f(value);
                }
            }
            Self::NamespaceIIFE { body, .. } => body.iter_mut().for_each(|n| f(n)),
        }
    }
}

impl IRParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: None,
        }
    }

    pub fn with_default(mut self, default: IRNode) -> Self {
        self.default_value = Some(Box::new(default));
        self
    }
}

impl IRProperty {
    /// Create a simple property with identifier key: `{ key: value }`
    pub fn init(key: impl Into<String>, value: IRNode) -> Self {
        Self {
            key: IRPropertyKey::Identifier(key.into()),
            value,
            kind: IRPropertyKind::Init,
        }
    }

    /// Create a property with string literal key: `{ "key": value }`
    pub fn init_string(key: impl Into<String>, value: IRNode) -> Self {
        Self {
            key: IRPropertyKey::StringLiteral(key.into()),
            value,
            kind: IRPropertyKind::Init,
        }
    }

    /// Create a getter property
    pub fn getter(key: IRPropertyKey, get: IRNode) -> Self {
        Self {
            key,
            value: get,
            kind: IRPropertyKind::Get,
        }
    }

    /// Create a setter property
    pub fn setter(key: IRPropertyKey, set: IRNode) -> Self {
        Self {
            key,
            value: set,
            kind: IRPropertyKind::Set,
        }
    }
}
