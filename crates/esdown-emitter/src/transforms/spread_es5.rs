//! ES5 Spread Transform
//!
//! Spread elements have no ES5 syntax; they become `concat` chains over
//! `_to_consumable_array`:
//!
//! ```javascript
//! [a, ...b, c]      // [a].concat(_to_consumable_array(b), [c])
//! f(...args)        // f.apply(void 0, _to_consumable_array(args))
//! o.m(a, ...b)      // o.m.apply(o, [a].concat(_to_consumable_array(b)))
//! g().m(...b)       // (_obj = g()).m.apply(_obj, _to_consumable_array(b))
//! new C(...args)    // _construct(C, _to_consumable_array(args))
//! ```
//!
//! Operands arrive already lowered and are emitted in source order, so
//! evaluation order is unchanged.

use super::ast_to_ir::{AstToIr, CalleeShape};
use super::ir::IRNode;
use crate::error::LowerResult;

impl AstToIr<'_> {
    /// Build the argument array for a list of `(is_spread, value)` pieces.
    pub(crate) fn spread_array(&mut self, pieces: Vec<(bool, IRNode)>) -> LowerResult<IRNode> {
        let mut segments = Vec::new();
        let mut run = Vec::new();
        for (spread, node) in pieces {
            if spread {
                if !run.is_empty() {
                    segments.push(IRNode::ArrayLiteral(std::mem::take(&mut run)));
                }
                segments.push(self.ctx.helper_call("to_consumable_array", vec![node])?);
            } else {
                run.push(node);
            }
        }
        if !run.is_empty() {
            segments.push(IRNode::ArrayLiteral(run));
        }

        let mut segments = segments.into_iter();
        let Some(head) = segments.next() else {
            return Ok(IRNode::ArrayLiteral(Vec::new()));
        };
        let rest: Vec<IRNode> = segments.collect();
        if rest.is_empty() {
            return Ok(head);
        }
        Ok(IRNode::method_call(head, "concat", rest))
    }

    pub(crate) fn spread_call(&mut self, callee: CalleeShape, pieces: Vec<(bool, IRNode)>) -> LowerResult<IRNode> {
        match callee {
            CalleeShape::Plain(function) => {
                let args = self.spread_array(pieces)?;
                Ok(IRNode::method_call(function, "apply", vec![IRNode::Undefined, args]))
            }
            CalleeShape::Member { object, key } => {
                // The receiver is evaluated once and passed as `this`.
                let (head, receiver) = match object {
                    IRNode::Identifier(_) | IRNode::This { .. } => (object.clone(), object),
                    other => {
                        let temp = self.ctx.declare_temp("obj");
                        (IRNode::assign(IRNode::id(&temp), other), IRNode::id(temp))
                    }
                };
                let args = self.spread_array(pieces)?;
                Ok(IRNode::method_call(key.access(head), "apply", vec![receiver, args]))
            }
        }
    }

    pub(crate) fn spread_new(&mut self, callee: IRNode, pieces: Vec<(bool, IRNode)>) -> LowerResult<IRNode> {
        let args = self.spread_array(pieces)?;
        self.ctx.helper_call("construct", vec![callee, args])
    }
}

#[cfg(test)]
#[path = "../../tests/spread_es5.rs"]
mod tests;
