//! ES5 Class Transform (IR-based)
//!
//! Transforms ES6 classes to ES5 IIFE patterns, producing IR nodes.
//!
//! ```typescript
//! class Dog extends Animal {
//!     constructor(name) {
//!         super(name);
//!         this.breed = "mixed";
//!     }
//!     speak() { return super.speak(); }
//! }
//! ```
//!
//! Becomes IR that prints as:
//!
//! ```javascript
//! var Dog = /*#__PURE__*/ function(Animal) {
//!     "use strict";
//!     _inherits(Dog, Animal);
//!     var _super = _create_super(Dog);
//!     function Dog(name) {
//!         _class_call_check(this, Dog);
//!         var _this;
//!         _this = _super.call(this, name);
//!         _this.breed = "mixed";
//!         return _this;
//!     }
//!     var _proto = Dog.prototype;
//!     _proto.speak = function speak() {
//!         return Animal.prototype.speak.call(this);
//!     };
//!     return Dog;
//! }(Animal);
//! ```
//!
//! A class with no base, no prototype members and no statics collapses to
//! the constructor function alone:
//! `var A = function A() { "use strict"; _class_call_check(this, A); }`.
//!
//! Members are assigned in source order; a later member with the same key
//! overwrites an earlier one at runtime.

use super::ast_to_ir::{AstToIr, is_identifier_name, method_function_name, push_flat};
use super::ir::*;
use super::ir_printer::format_number;
use crate::error::{LowerError, LowerResult};
use crate::transform_context::{ClassFrame, FunctionScope};
use esdown_ast::*;
use esdown_common::Span;
use indexmap::IndexMap;

/// Members of one class, split by how they are emitted.
struct ClassMembers<'c> {
    constructor: Option<(&'c [Param], &'c [Stmt], Span)>,
    instance_fields: Vec<(&'c PropName, Option<&'c Expr>)>,
    static_fields: Vec<(&'c PropName, Option<&'c Expr>)>,
    /// Plain methods, in source order.
    methods: Vec<(&'c PropName, &'c Function, bool)>,
    accessors: Vec<(&'c PropName, &'c Function, MethodKind, bool)>,
}

impl<'c> ClassMembers<'c> {
    fn collect(class: &'c Class) -> Self {
        let mut members = ClassMembers {
            constructor: None,
            instance_fields: Vec::new(),
            static_fields: Vec::new(),
            methods: Vec::new(),
            accessors: Vec::new(),
        };
        for member in &class.members {
            match member {
                ClassMember::Constructor { params, body, span } => {
                    members.constructor = Some((params, body, *span));
                }
                ClassMember::Method {
                    key,
                    function,
                    kind: MethodKind::Method,
                    is_static,
                } => members.methods.push((key, function, *is_static)),
                ClassMember::Method {
                    key,
                    function,
                    kind,
                    is_static,
                } => members.accessors.push((key, function, *kind, *is_static)),
                ClassMember::Property {
                    key,
                    value,
                    is_static: true,
                } => members.static_fields.push((key, value.as_ref())),
                ClassMember::Property { key, value, .. } => {
                    members.instance_fields.push((key, value.as_ref()));
                }
            }
        }
        members
    }

    fn is_compact(&self) -> bool {
        self.methods.is_empty() && self.accessors.is_empty() && self.static_fields.is_empty()
    }
}

/// Getter/setter pair for one key of `_create_class`.
#[derive(Default)]
struct AccessorPair {
    get: Option<IRNode>,
    set: Option<IRNode>,
}

impl AstToIr<'_> {
    /// `class C {}` as a statement: `var C = ...;`
    pub(crate) fn lower_class_declaration(&mut self, class: &Class) -> LowerResult<IRNode> {
        let name = match &class.name {
            Some(name) => name.clone(),
            None => self.ctx.fresh_name("class"),
        };
        self.ctx.declare_name(&name);
        let value = self.lower_class(class, &name)?;
        Ok(IRNode::var_decl(name, Some(value)))
    }

    pub(crate) fn lower_class_expression(&mut self, class: &Class) -> LowerResult<IRNode> {
        let name = match &class.name {
            Some(name) => name.clone(),
            None => self.ctx.fresh_name("class"),
        };
        self.lower_class(class, &name)
    }

    fn lower_class(&mut self, class: &Class, name: &str) -> LowerResult<IRNode> {
        let members = ClassMembers::collect(class);
        self.ctx.require_helper("class_call_check")?;

        let base = match &class.super_class {
            Some(sup) => Some(self.lower_expr(sup)?),
            None => None,
        };
        let base_param = match (&class.super_class, &base) {
            (Some(sup), Some(_)) => Some(match sup.as_ident() {
                Some(ident) if ident != name => ident.to_string(),
                _ => self.ctx.fresh_name("superClass"),
            }),
            _ => None,
        };

        let super_name = match base_param {
            Some(_) => Some(self.ctx.well_known("super")),
            None => None,
        };
        self.ctx.push_class(ClassFrame {
            name: name.to_string(),
            base: base_param.clone(),
            super_name,
            in_static: false,
            in_constructor: false,
        });
        let result = if base.is_none() && members.is_compact() {
            self.lower_compact_class(name, &members)
        } else {
            self.lower_class_iife(name, &members, base, base_param)
        };
        self.ctx.pop_class();
        result
    }

    /// `function A() { "use strict"; _class_call_check(this, A); ... }`
    fn lower_compact_class(&mut self, name: &str, members: &ClassMembers<'_>) -> LowerResult<IRNode> {
        let (params, mut body) = self.lower_constructor(name, members, false)?;
        body.insert(0, IRNode::UseStrict);
        Ok(IRNode::func_expr(Some(name.to_string()), params, body))
    }

    fn lower_class_iife(
        &mut self,
        name: &str,
        members: &ClassMembers<'_>,
        base: Option<IRNode>,
        base_param: Option<String>,
    ) -> LowerResult<IRNode> {
        // The IIFE is a function of its own; static initializers that capture
        // `this` or need temporaries declare them here.
        self.ctx.push_scope(FunctionScope::function());
        let result = self.lower_class_iife_body(name, members, base_param.as_deref());
        let scope = self.ctx.pop_scope();
        let statements = result?;

        let mut body = vec![IRNode::UseStrict];
        body.extend(self.finish_body(&scope, Vec::new(), statements));

        Ok(IRNode::ES5ClassIIFE {
            base_param,
            base_class: base.map(Box::new),
            body,
        })
    }

    fn lower_class_iife_body(
        &mut self,
        name: &str,
        members: &ClassMembers<'_>,
        base_param: Option<&str>,
    ) -> LowerResult<Vec<IRNode>> {
        let mut body = Vec::new();

        if let Some(base) = base_param {
            let inherits = self
                .ctx
                .helper_call("inherits", vec![IRNode::id(name), IRNode::id(base)])?;
            body.push(IRNode::expr_stmt(inherits));
            let create_super = self.ctx.helper_call("create_super", vec![IRNode::id(name)])?;
            body.push(IRNode::var_decl(self.ctx.well_known("super"), Some(create_super)));
        }

        let (params, ctor_body) = self.lower_constructor(name, members, base_param.is_some())?;
        body.push(IRNode::func_decl(name, params, ctor_body));

        let proto = self.ctx.well_known("proto");
        if members.methods.iter().any(|(_, _, is_static)| !is_static) {
            body.push(IRNode::var_decl(
                &proto,
                Some(IRNode::prop(IRNode::id(name), "prototype")),
            ));
        }

        for &(key, function, is_static) in &members.methods {
            self.set_class_position(is_static, false);
            let method_name = self.lower_method_name(key)?;
            let fn_name = method_function_name(key, &function.body);
            let (params, fn_body) = self.lower_function(function)?;
            let function = Box::new(IRNode::func_expr(fn_name, params, fn_body));
            body.push(if is_static {
                IRNode::StaticMethod {
                    class_name: name.to_string(),
                    method_name,
                    function,
                }
            } else {
                IRNode::PrototypeMethod {
                    proto_name: proto.clone(),
                    method_name,
                    function,
                }
            });
        }

        if !members.accessors.is_empty() {
            body.push(self.lower_accessors(name, members)?);
        }

        for &(key, value) in &members.static_fields {
            self.set_class_position(true, false);
            let key = self.lower_key_expr(key)?;
            // `this` in a static initializer is the class itself
            self.ctx.current_scope_mut().this_alias = Some(name.to_string());
            let value = match value {
                Some(v) => self.lower_expr(v),
                None => Ok(IRNode::Undefined),
            };
            self.ctx.current_scope_mut().this_alias = None;
            let define = self
                .ctx
                .helper_call("define_property", vec![IRNode::id(name), key, value?])?;
            body.push(IRNode::expr_stmt(define));
        }

        body.push(IRNode::ret(Some(IRNode::id(name))));
        Ok(body)
    }

    fn set_class_position(&mut self, in_static: bool, in_constructor: bool) {
        if let Some(frame) = self.ctx.current_class_mut() {
            frame.in_static = in_static;
            frame.in_constructor = in_constructor;
        }
    }

    /// Key of a `_proto.m = ...` / `C.m = ...` assignment.
    fn lower_method_name(&mut self, key: &PropName) -> LowerResult<IRMethodName> {
        Ok(match key {
            PropName::Ident { name } => IRMethodName::Identifier(name.clone()),
            PropName::Str { value } if is_identifier_name(value) => {
                IRMethodName::Identifier(value.clone())
            }
            PropName::Str { value } => IRMethodName::StringLiteral(value.clone()),
            PropName::Num { value } => IRMethodName::NumericLiteral(format_number(*value)),
            PropName::Computed { expr } => IRMethodName::Computed(Box::new(self.lower_expr(expr)?)),
        })
    }

    /// `_create_class(C, [{ key: "x", get: ..., set: ... }], [statics])`
    fn lower_accessors(&mut self, name: &str, members: &ClassMembers<'_>) -> LowerResult<IRNode> {
        let mut instance: IndexMap<String, AccessorPair> = IndexMap::new();
        let mut statics: IndexMap<String, AccessorPair> = IndexMap::new();

        for &(key, function, kind, is_static) in &members.accessors {
            let Some(key_name) = key.static_name() else {
                return Err(LowerError::unsupported("computed accessor key", function.span));
            };
            self.set_class_position(is_static, false);
            let (params, body) = self.lower_function(function)?;
            let table = if is_static { &mut statics } else { &mut instance };
            let pair = table.entry(key_name).or_default();
            match kind {
                MethodKind::Getter => {
                    pair.get = Some(IRNode::func_expr(Some("get".to_string()), params, body));
                }
                _ => {
                    pair.set = Some(IRNode::func_expr(Some("set".to_string()), params, body));
                }
            }
        }

        let mut args = vec![
            IRNode::id(name),
            if instance.is_empty() {
                IRNode::NullLiteral
            } else {
                descriptor_list(instance)
            },
        ];
        if !statics.is_empty() {
            args.push(descriptor_list(statics));
        }
        Ok(IRNode::expr_stmt(self.ctx.helper_call("create_class", args)?))
    }

    /// Constructor parameters and body, including the class call check,
    /// parameter properties, field initializers and the derived-class
    /// `_this` protocol.
    fn lower_constructor(
        &mut self,
        name: &str,
        members: &ClassMembers<'_>,
        derived: bool,
    ) -> LowerResult<(Vec<IRParam>, Vec<IRNode>)> {
        self.set_class_position(false, true);
        let mut scope = FunctionScope::function();
        let this_alias = derived.then(|| self.ctx.well_known("this"));
        scope.this_alias = this_alias.clone();

        self.ctx.push_scope(scope);
        let result = self.lower_constructor_in_scope(name, members, this_alias.as_deref());
        let scope = self.ctx.pop_scope();
        self.set_class_position(false, false);
        let (lowered_params, prologue, body) = result?;

        // Captures and temporaries go after the class call check.
        let mut out = Vec::with_capacity(body.len() + 2);
        let mut rest = body.into_iter();
        out.extend(rest.next());
        out.extend(self.finish_body(&scope, prologue, Vec::new()));
        out.extend(rest);
        Ok((lowered_params, out))
    }

    fn lower_constructor_in_scope(
        &mut self,
        name: &str,
        members: &ClassMembers<'_>,
        this_alias: Option<&str>,
    ) -> LowerResult<(Vec<IRParam>, Vec<IRNode>, Vec<IRNode>)> {
        let check = self
            .ctx
            .helper_call("class_call_check", vec![IRNode::this(), IRNode::id(name)])?;
        let mut body = vec![IRNode::expr_stmt(check)];

        let (params, user_body) = match members.constructor {
            Some((params, body, _)) => (params, body),
            None => (&[][..], &[][..]),
        };
        let lowered = self.lower_params(params)?;
        let this_node = this_alias.map_or_else(IRNode::this, IRNode::id);

        // Parameter properties, then field initializers
        let mut initializers = Vec::new();
        for param in params.iter().filter(|p| p.property) {
            initializers.push(IRNode::expr_stmt(IRNode::assign(
                IRNode::prop(this_node.clone(), &param.name),
                IRNode::id(&param.name),
            )));
        }
        for &(key, value) in &members.instance_fields {
            let key = self.lower_key_expr(key)?;
            let value = match value {
                Some(v) => self.lower_expr(v)?,
                None => IRNode::Undefined,
            };
            let define = self
                .ctx
                .helper_call("define_property", vec![this_node.clone(), key, value])?;
            initializers.push(IRNode::expr_stmt(define));
        }

        let Some(alias) = this_alias else {
            body.extend(initializers);
            body.extend(self.lower_stmts(user_body)?);
            return Ok((lowered.params, lowered.prologue, body));
        };

        let super_name = self.ctx.well_known("super");
        if members.constructor.is_none() && initializers.is_empty() {
            // Synthesized constructor forwarding every argument
            body.push(IRNode::ret(Some(IRNode::method_call(
                IRNode::id(&super_name),
                "apply",
                vec![IRNode::this(), IRNode::id("arguments")],
            ))));
            return Ok((lowered.params, lowered.prologue, body));
        }

        body.push(IRNode::var_names([alias.to_string()]));
        if members.constructor.is_none() {
            body.push(IRNode::expr_stmt(IRNode::assign(
                IRNode::id(alias),
                IRNode::method_call(
                    IRNode::id(&super_name),
                    "apply",
                    vec![IRNode::this(), IRNode::id("arguments")],
                ),
            )));
            body.extend(initializers);
            body.push(IRNode::ret(Some(IRNode::id(alias))));
            return Ok((lowered.params, lowered.prologue, body));
        }

        // Initializers run right after the statement that calls super()
        let super_at = user_body.iter().position(contains_super_call);
        let mut pending = Some(initializers);
        if super_at.is_none() {
            body.extend(pending.take().unwrap_or_default());
        }
        for (index, stmt) in user_body.iter().enumerate() {
            let lowered_stmt = self.lower_stmt(stmt)?;
            push_flat(&mut body, lowered_stmt);
            if Some(index) == super_at {
                body.extend(pending.take().unwrap_or_default());
            }
        }
        if !matches!(user_body.last(), Some(Stmt::Return { .. })) {
            body.push(IRNode::ret(Some(this_node)));
        }
        Ok((lowered.params, lowered.prologue, body))
    }

    /// `Base.prototype.x` (or `Base.x` in static members).
    pub(crate) fn lower_super_member(&mut self, property: &MemberProp, span: Span) -> LowerResult<IRNode> {
        let Some(frame) = self.ctx.current_class() else {
            return Err(LowerError::unsupported("super outside a class member", span));
        };
        let Some(base) = frame.base.clone() else {
            return Err(LowerError::unsupported("super in a class without a base", span));
        };
        let holder = if frame.in_static {
            IRNode::id(base)
        } else {
            IRNode::prop(IRNode::id(base), "prototype")
        };
        self.lower_member(holder, property)
    }

    /// `super(args)` in a derived constructor: `_this = _super.call(this, args)`.
    pub(crate) fn lower_super_call(&mut self, pieces: Vec<(bool, IRNode)>, span: Span) -> LowerResult<IRNode> {
        let super_name = match self.ctx.current_class() {
            Some(ClassFrame {
                super_name: Some(super_name),
                in_constructor: true,
                ..
            }) => super_name.clone(),
            _ => {
                return Err(LowerError::unsupported(
                    "super call outside a derived constructor",
                    span,
                ));
            }
        };
        let this_alias = self.ctx.well_known("this");
        let call = self.call_with_receiver(IRNode::id(super_name), IRNode::this(), pieces)?;
        Ok(IRNode::assign(IRNode::id(this_alias), call))
    }
}

fn descriptor_list(table: IndexMap<String, AccessorPair>) -> IRNode {
    let descriptors = table
        .into_iter()
        .map(|(key, pair)| {
            let mut properties = vec![IRProperty::init("key", IRNode::string(key))];
            if let Some(get) = pair.get {
                properties.push(IRProperty::init("get", get));
            }
            if let Some(set) = pair.set {
                properties.push(IRProperty::init("set", set));
            }
            IRNode::object(properties)
        })
        .collect();
    IRNode::ArrayLiteral(descriptors)
}

#[cfg(test)]
#[path = "../../tests/class_es5_ir.rs"]
mod tests;
