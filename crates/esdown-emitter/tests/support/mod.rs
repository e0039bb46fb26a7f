//! Reference evaluators for the state machine semantics tests.
//!
//! A suspending function is run twice: once by evaluating its syntax tree
//! directly, once by lowering it and driving the resulting step function the
//! way `_ts_generator` does. Both runs record host calls and suspensions in a
//! log; a correct lowering produces the same log and the same outcome.

#![allow(dead_code)]

pub mod ast_eval;
pub mod ir_eval;
pub mod value;

pub use ast_eval::{run_direct, run_direct_with};
pub use ir_eval::{find_generator_body, lower, run_lowered, run_lowered_with, run_plain_lowered};
pub use value::{Outcome, Value};
