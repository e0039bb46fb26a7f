//! Input syntax tree for the esdown lowering passes.
//!
//! The tree is produced by an external parser (or deserialized from its JSON
//! form) and handed to the emitter by shared reference. Every node is owned by
//! its parent; there are no back-edges or arena indices.

pub mod node;
pub use node::*;

pub mod builders;

pub mod visit;
pub use visit::{
    Visit, collect_identifiers, contains_arguments, contains_await, contains_super_call,
    contains_suspension, contains_this_reference, contains_yield, mentions_name,
    stmt_contains_suspension, stmts_contain_suspension,
};
