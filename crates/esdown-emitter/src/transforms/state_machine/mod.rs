//! Generator state machines
//!
//! A function with suspension points is compiled into a step function that
//! the `_ts_generator` driver calls repeatedly. The body is split into cases
//! of a `switch(_state.label)`; every case ends by returning an instruction
//! to the driver or by falling into the next case:
//!
//! | op | meaning |
//! |----|---------|
//! | `[2, v]` | return `v` |
//! | `[3, L]` | jump to case `L` (through pending finally blocks) |
//! | `[4, v]` | suspend with `v`; resume at the next case |
//! | `[5, v]` | delegate to iterator `v`; resume at the next case |
//! | `[7]` | end of a finally block: resume the pending completion |
//!
//! `builder` flattens statements into cases with abstract labels, `lower`
//! walks the syntax tree and drives the builder, and this module holds the
//! finished descriptor with its structural checks.

pub mod builder;
pub(crate) mod lower;

pub use builder::{Label, MachineBuilder};

use super::ir::{IRGeneratorCase, IRNode};
use crate::error::InvariantViolation;
use esdown_common::limits::MAX_STATE_MACHINE_CASES;
use indexmap::IndexSet;
use smallvec::SmallVec;

/// How control leaves a case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// `_state.label = N;` and into the next case
    Fallthrough(u32),
    /// `return [3, N];` as the last statement
    Jump(u32),
    /// `return [3, N];` under a condition
    ConditionalJump(u32),
    /// `return [4, v];` / `return [5, v];`, resuming at `N`
    Resume(u32),
    Return,
    Throw,
    EndFinally,
}

impl Exit {
    pub const fn target(self) -> Option<u32> {
        match self {
            Exit::Fallthrough(l) | Exit::Jump(l) | Exit::ConditionalJump(l) | Exit::Resume(l) => {
                Some(l)
            }
            Exit::Return | Exit::Throw | Exit::EndFinally => None,
        }
    }

    fn map_target(self, f: impl FnOnce(u32) -> u32) -> Self {
        match self {
            Exit::Fallthrough(l) => Exit::Fallthrough(f(l)),
            Exit::Jump(l) => Exit::Jump(f(l)),
            Exit::ConditionalJump(l) => Exit::ConditionalJump(f(l)),
            Exit::Resume(l) => Exit::Resume(f(l)),
            other => other,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Case {
    pub label: u32,
    pub body: Vec<IRNode>,
    pub exits: SmallVec<[Exit; 2]>,
}

/// A protected range: `_state.trys.push([start, catch, finally, end])`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TryRegion {
    pub start: u32,
    pub catch_label: Option<u32>,
    pub finally_label: Option<u32>,
    /// Where execution continues after the region.
    pub end: u32,
}

impl TryRegion {
    pub const fn contains(&self, label: u32) -> bool {
        self.start <= label && label < self.end
    }

    /// Case that receives an exception thrown at `label`.
    pub fn handler(&self, label: u32) -> Option<u32> {
        if !self.contains(label) {
            return None;
        }
        let protected_end = self.catch_label.or(self.finally_label).unwrap_or(self.end);
        if label < protected_end {
            return self.catch_label.or(self.finally_label);
        }
        match (self.catch_label, self.finally_label) {
            (Some(_), Some(finally)) if label < finally => Some(finally),
            _ => None,
        }
    }

    fn encloses(&self, other: &TryRegion) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    fn is_disjoint(&self, other: &TryRegion) -> bool {
        self.end <= other.start || other.end <= self.start
    }
}

/// A finished, validated state machine.
#[derive(Clone, Debug, PartialEq)]
pub struct StateMachine {
    pub state_name: String,
    pub cases: Vec<Case>,
    pub try_regions: Vec<TryRegion>,
    pub loop_headers: Vec<u32>,
    /// Function-level declarations, emitted as `var a, b;` before the driver call.
    pub hoisted_vars: IndexSet<String>,
    /// Nested function declarations, emitted before the driver call.
    pub hoisted_functions: Vec<IRNode>,
}

impl StateMachine {
    /// Labels control can reach from `case`: its exits plus the handler of
    /// the innermost region protecting it.
    pub fn successors(&self, case: &Case) -> SmallVec<[u32; 4]> {
        let mut out: SmallVec<[u32; 4]> = case.exits.iter().filter_map(|e| e.target()).collect();
        let innermost = self
            .try_regions
            .iter()
            .filter(|r| r.contains(case.label))
            .min_by_key(|r| r.end - r.start);
        if let Some(handler) = innermost.and_then(|r| r.handler(case.label)) {
            out.push(handler);
        }
        out
    }

    pub fn is_loop_header(&self, label: u32) -> bool {
        self.loop_headers.contains(&label)
    }

    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.cases.len() > MAX_STATE_MACHINE_CASES {
            return Err(InvariantViolation::TooManyCases(MAX_STATE_MACHINE_CASES));
        }
        for (index, case) in self.cases.iter().enumerate() {
            let expected = index as u32;
            if case.label != expected {
                return Err(InvariantViolation::NonSequentialLabel {
                    expected,
                    found: case.label,
                });
            }
        }

        let case_count = self.cases.len() as u32;
        for case in &self.cases {
            for to in self.successors(case) {
                if to >= case_count {
                    return Err(InvariantViolation::DanglingSuccessor {
                        from: case.label,
                        to,
                    });
                }
            }
            for exit in &case.exits {
                if let Exit::Jump(to) | Exit::ConditionalJump(to) = *exit
                    && to <= case.label
                    && !self.is_loop_header(to)
                {
                    return Err(InvariantViolation::BackwardJumpToNonHeader {
                        from: case.label,
                        to,
                    });
                }
            }
        }

        let terminal = self.cases.iter().any(|c| {
            c.exits
                .iter()
                .any(|e| matches!(e, Exit::Return | Exit::Throw))
        });
        if !terminal {
            return Err(InvariantViolation::NoTerminalCase);
        }

        for (i, a) in self.try_regions.iter().enumerate() {
            let ordered = [a.catch_label, a.finally_label]
                .into_iter()
                .flatten()
                .all(|l| a.start <= l && l <= a.end);
            if !ordered {
                return Err(InvariantViolation::OverlappingTryRegions);
            }
            for b in &self.try_regions[i + 1..] {
                if !(a.is_disjoint(b) || a.encloses(b) || b.encloses(a)) {
                    return Err(InvariantViolation::OverlappingTryRegions);
                }
            }
        }
        Ok(())
    }

    /// The step function: `function(_state) { switch(_state.label){ ... } }`.
    /// A single case prints without the switch.
    pub fn render(&self) -> IRNode {
        IRNode::GeneratorBody {
            state_name: self.state_name.clone(),
            uses_switch: self.cases.len() > 1,
            cases: self
                .cases
                .iter()
                .map(|c| IRGeneratorCase {
                    label: c.label,
                    statements: c.body.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/state_machine.rs"]
mod tests;
