//! ES5 Transforms
//!
//! Lowering rules that turn ES2015+ syntax into ES5 constructs.
//!
//! # Architecture
//!
//! Transforms follow a two-phase approach:
//!
//! 1. **Transform Phase**: `AstToIr` walks syntax nodes and produces IR nodes
//!    that represent the lowered constructs. Each rule is an `impl AstToIr`
//!    block in its own file.
//!
//! 2. **Print Phase**: `IRPrinter` walks IR trees and emits JavaScript text.
//!
//! | Rule | File | Notes |
//! |------|------|-------|
//! | classes | `class_es5_ir` | `_inherits` / `_create_super` / `_create_class` |
//! | namespaces | `namespace_es5_ir` | IIFE per qualified-name segment |
//! | spread | `spread_es5` | `_to_consumable_array`, `.apply`, `_construct` |
//! | arrows | `arrow_es5` | lexical `this` / `arguments` captures |
//! | async / generators | `async_es5_ir` + `state_machine` | `_ts_generator` step functions |

pub mod ast_to_ir;
pub mod helpers;
pub mod ir;
pub mod ir_printer;
pub mod state_machine;

mod arrow_es5;
mod async_es5_ir;
mod class_es5_ir;
mod namespace_es5_ir;
mod spread_es5;

pub use ast_to_ir::AstToIr;
pub use helpers::{HELPER_CATALOG, HelperHandle, HelperRegistry, HelperSpec, lookup_helper};
pub use ir::IRNode;
pub use ir_printer::{IRPrinter, PrinterOptions};
