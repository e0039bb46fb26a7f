//! Incremental construction of a [`StateMachine`].
//!
//! Labels are abstract while the body is being built: `define_label` hands
//! out an id, `mark_label` binds it to the case that starts at the current
//! position, and jumps refer to it through `IRNode::LabelRef`. `finish`
//! resolves every reference to the concrete case number and validates the
//! result.
//!
//! Marking a label on an empty, still-open case reuses that case, so runs of
//! adjacent marks share one case. Anything emitted after the current case has
//! returned or thrown is unreachable and dropped.

use super::{Case, Exit, StateMachine, TryRegion};
use crate::error::InvariantViolation;
use crate::transforms::ir::IRNode;
use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::trace;

/// Abstract label id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    pub const fn id(self) -> u32 {
        self.0
    }

    pub fn reference(self) -> IRNode {
        IRNode::LabelRef(self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Loop,
    Switch,
    /// A labeled statement that is not a loop.
    Labeled,
}

/// Target of `break` / `continue` inside the machine.
#[derive(Clone, Debug)]
struct BreakFrame {
    kind: FrameKind,
    break_label: Label,
    continue_label: Option<Label>,
    source_labels: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockState {
    Try,
    Catch,
    Finally,
}

#[derive(Clone, Copy, Debug)]
struct ExceptionBlock {
    catch_label: Option<Label>,
    finally_label: Option<Label>,
    end_label: Label,
    state: BlockState,
}

#[derive(Clone, Copy, Debug)]
struct PendingRegion {
    start: Label,
    catch_label: Option<Label>,
    finally_label: Option<Label>,
    end: Label,
}

pub struct MachineBuilder {
    state_name: String,
    /// Concrete case number of each abstract label, once marked.
    label_map: Vec<Option<u32>>,
    cases: Vec<Case>,
    terminated: bool,
    regions: Vec<PendingRegion>,
    exception_blocks: Vec<ExceptionBlock>,
    frames: Vec<BreakFrame>,
    /// Source labels waiting for the next loop or switch frame.
    pending_labels: Vec<String>,
    loop_headers: Vec<Label>,
    hoisted_vars: IndexSet<String>,
    hoisted_functions: Vec<IRNode>,
}

impl MachineBuilder {
    pub fn new(state_name: impl Into<String>) -> Self {
        MachineBuilder {
            state_name: state_name.into(),
            label_map: Vec::new(),
            cases: vec![Case {
                label: 0,
                body: Vec::new(),
                exits: SmallVec::new(),
            }],
            terminated: false,
            regions: Vec::new(),
            exception_blocks: Vec::new(),
            frames: Vec::new(),
            pending_labels: Vec::new(),
            loop_headers: Vec::new(),
            hoisted_vars: IndexSet::new(),
            hoisted_functions: Vec::new(),
        }
    }

    pub fn state_name(&self) -> &str {
        &self.state_name
    }

    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    // =========================================================================
    // Labels and cases
    // =========================================================================

    pub fn define_label(&mut self) -> Label {
        let id = self.label_map.len() as u32;
        self.label_map.push(None);
        Label(id)
    }

    pub fn mark_label(&mut self, label: Label) {
        let reuse = !self.terminated
            && self
                .cases
                .last()
                .is_some_and(|c| c.body.is_empty() && c.exits.is_empty());
        let concrete = if reuse {
            self.cases.len() as u32 - 1
        } else {
            if !self.terminated {
                self.push_to_current(IRNode::expr_stmt(IRNode::assign(
                    IRNode::GeneratorLabel,
                    label.reference(),
                )));
                self.add_exit(Exit::Fallthrough(label.0));
            }
            self.start_case()
        };
        trace!(label = label.0, case = concrete, "mark label");
        self.label_map[label.0 as usize] = Some(concrete);
    }

    fn start_case(&mut self) -> u32 {
        let label = self.cases.len() as u32;
        self.cases.push(Case {
            label,
            body: Vec::new(),
            exits: SmallVec::new(),
        });
        self.terminated = false;
        label
    }

    fn push_to_current(&mut self, node: IRNode) {
        if let Some(case) = self.cases.last_mut() {
            case.body.push(node);
        }
    }

    fn add_exit(&mut self, exit: Exit) {
        if let Some(case) = self.cases.last_mut() {
            case.exits.push(exit);
        }
    }

    pub fn add_loop_header(&mut self, label: Label) {
        self.loop_headers.push(label);
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Append a lowered statement to the current case. Jumps, returns and
    /// throws it contains are recorded as exits; a top-level return or throw
    /// closes the case.
    pub fn emit_stmt(&mut self, mut node: IRNode) {
        if self.terminated {
            return;
        }
        let mut exits: SmallVec<[Exit; 2]> = SmallVec::new();
        let terminal = match &node {
            IRNode::ReturnStatement(Some(value)) => match value.as_ref() {
                IRNode::GeneratorOp {
                    opcode: 3,
                    value: Some(target),
                } => {
                    if let IRNode::LabelRef(l) = target.as_ref() {
                        exits.push(Exit::Jump(*l));
                    }
                    true
                }
                IRNode::GeneratorOp { opcode: 7, .. } => {
                    exits.push(Exit::EndFinally);
                    true
                }
                _ => {
                    exits.push(Exit::Return);
                    true
                }
            },
            IRNode::ReturnStatement(None) => {
                exits.push(Exit::Return);
                true
            }
            IRNode::ThrowStatement(_) => {
                exits.push(Exit::Throw);
                true
            }
            _ => false,
        };
        if !terminal {
            collect_nested_exits(&mut node, &mut exits);
        }
        self.push_to_current(node);
        for exit in exits {
            self.add_exit(exit);
        }
        if terminal {
            self.terminated = true;
        }
    }

    /// `return [3, L];`
    pub fn emit_jump(&mut self, label: Label) {
        self.emit_stmt(IRNode::ret(Some(IRNode::generator_op(3, Some(label.reference())))));
    }

    /// `if (!(cond)) return [3, L];`
    pub fn emit_jump_if_false(&mut self, condition: IRNode, label: Label) {
        self.emit_conditional_jump(IRNode::not(condition), label);
    }

    /// `if (cond) return [3, L];`
    pub fn emit_jump_if_true(&mut self, condition: IRNode, label: Label) {
        self.emit_conditional_jump(condition, label);
    }

    fn emit_conditional_jump(&mut self, condition: IRNode, label: Label) {
        if self.terminated {
            return;
        }
        let jump = IRNode::ret(Some(IRNode::generator_op(3, Some(label.reference()))));
        self.push_to_current(IRNode::if_then(condition, jump));
        self.add_exit(Exit::ConditionalJump(label.0));
    }

    /// `return [4, v];` and start the case that resumes it.
    pub fn emit_yield(&mut self, value: Option<IRNode>) {
        self.emit_suspension(4, value);
    }

    /// `return [5, v];` (delegating yield) and start the resume case.
    pub fn emit_yield_star(&mut self, iterator: IRNode) {
        self.emit_suspension(5, Some(iterator));
    }

    fn emit_suspension(&mut self, opcode: u32, value: Option<IRNode>) {
        if self.terminated {
            return;
        }
        let resume = self.define_label();
        self.push_to_current(IRNode::ret(Some(IRNode::generator_op(opcode, value))));
        self.add_exit(Exit::Resume(resume.0));
        self.terminated = true;
        self.mark_label(resume);
    }

    /// `return [2, v];` / `return [2];`
    pub fn emit_return(&mut self, value: Option<IRNode>) {
        self.emit_stmt(IRNode::ret(Some(IRNode::generator_op(2, value))));
    }

    pub fn emit_throw(&mut self, value: IRNode) {
        self.emit_stmt(IRNode::ThrowStatement(Box::new(value)));
    }

    /// `return [7];`
    pub fn emit_end_finally(&mut self) {
        self.emit_stmt(IRNode::ret(Some(IRNode::generator_op(7, None))));
    }

    // =========================================================================
    // Exception blocks
    // =========================================================================

    /// Open a try region: marks its start and registers the handler labels
    /// with the driver.
    pub fn begin_exception_block(&mut self, has_catch: bool, has_finally: bool) {
        let start = self.define_label();
        let catch_label = has_catch.then(|| self.define_label());
        let finally_label = has_finally.then(|| self.define_label());
        let end_label = self.define_label();

        self.mark_label(start);
        self.push_to_current(IRNode::GeneratorTrysPush {
            labels: [
                Some(start.0),
                catch_label.map(Label::id),
                finally_label.map(Label::id),
                Some(end_label.0),
            ],
        });
        self.regions.push(PendingRegion {
            start,
            catch_label,
            finally_label,
            end: end_label,
        });
        self.exception_blocks.push(ExceptionBlock {
            catch_label,
            finally_label,
            end_label,
            state: BlockState::Try,
        });
    }

    /// Close the protected body and start the catch clause. The caught value
    /// is stored in `variable`.
    pub fn begin_catch(&mut self, variable: &str) {
        let Some(block) = self.exception_blocks.last().copied() else {
            return;
        };
        let Some(catch_label) = block.catch_label else {
            return;
        };
        self.emit_jump(block.end_label);
        self.mark_label(catch_label);
        self.emit_stmt(IRNode::expr_stmt(IRNode::assign(
            IRNode::id(variable),
            IRNode::GeneratorSent,
        )));
        if let Some(b) = self.exception_blocks.last_mut() {
            b.state = BlockState::Catch;
        }
    }

    pub fn begin_finally(&mut self) {
        let Some(block) = self.exception_blocks.last().copied() else {
            return;
        };
        let Some(finally_label) = block.finally_label else {
            return;
        };
        self.emit_jump(block.end_label);
        self.mark_label(finally_label);
        if let Some(b) = self.exception_blocks.last_mut() {
            b.state = BlockState::Finally;
        }
    }

    pub fn end_exception_block(&mut self) {
        let Some(block) = self.exception_blocks.pop() else {
            return;
        };
        if block.state == BlockState::Finally {
            self.emit_end_finally();
        } else {
            self.emit_jump(block.end_label);
        }
        self.mark_label(block.end_label);
    }

    // =========================================================================
    // Break / continue targets
    // =========================================================================

    /// Source labels (`outer:`) to attach to the next loop or switch.
    pub fn add_pending_label(&mut self, label: impl Into<String>) {
        self.pending_labels.push(label.into());
    }

    pub fn push_frame(&mut self, kind: FrameKind, break_label: Label, continue_label: Option<Label>) {
        let source_labels = std::mem::take(&mut self.pending_labels);
        self.frames.push(BreakFrame {
            kind,
            break_label,
            continue_label,
            source_labels,
        });
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn find_break_target(&self, label: Option<&str>) -> Option<Label> {
        self.frames
            .iter()
            .rev()
            .find(|f| match label {
                Some(l) => f.source_labels.iter().any(|s| s == l),
                None => matches!(f.kind, FrameKind::Loop | FrameKind::Switch),
            })
            .map(|f| f.break_label)
    }

    pub fn find_continue_target(&self, label: Option<&str>) -> Option<Label> {
        self.frames
            .iter()
            .rev()
            .filter(|f| f.kind == FrameKind::Loop)
            .find(|f| label.is_none_or(|l| f.source_labels.iter().any(|s| s == l)))
            .and_then(|f| f.continue_label)
    }

    // =========================================================================
    // Hoisting
    // =========================================================================

    pub fn hoist_var(&mut self, name: impl Into<String>) {
        self.hoisted_vars.insert(name.into());
    }

    pub fn hoist_function(&mut self, declaration: IRNode) {
        self.hoisted_functions.push(declaration);
    }

    // =========================================================================
    // Finish
    // =========================================================================

    /// Close the last case, resolve labels and validate.
    pub fn finish(mut self) -> Result<StateMachine, InvariantViolation> {
        if !self.terminated {
            self.emit_return(None);
        }

        let map = std::mem::take(&mut self.label_map);
        let resolve = |label: u32| -> Result<u32, InvariantViolation> {
            map.get(label as usize)
                .copied()
                .flatten()
                .ok_or(InvariantViolation::UnresolvedLabel(label))
        };

        let mut cases = std::mem::take(&mut self.cases);
        for case in &mut cases {
            let mut error = None;
            for node in &mut case.body {
                remap_labels(node, &resolve, &mut error);
            }
            if let Some(e) = error {
                return Err(e);
            }
            let mut exits = SmallVec::new();
            for exit in &case.exits {
                let target = exit.target().map(&resolve).transpose()?;
                exits.push(exit.map_target(|l| target.unwrap_or(l)));
            }
            case.exits = exits;
        }

        let mut try_regions = Vec::with_capacity(self.regions.len());
        for region in &self.regions {
            try_regions.push(TryRegion {
                start: resolve(region.start.0)?,
                catch_label: region.catch_label.map(|l| resolve(l.0)).transpose()?,
                finally_label: region.finally_label.map(|l| resolve(l.0)).transpose()?,
                end: resolve(region.end.0)?,
            });
        }
        let loop_headers = self
            .loop_headers
            .iter()
            .map(|l| resolve(l.0))
            .collect::<Result<Vec<_>, _>>()?;

        let machine = StateMachine {
            state_name: self.state_name,
            cases,
            try_regions,
            loop_headers,
            hoisted_vars: self.hoisted_vars,
            hoisted_functions: self.hoisted_functions,
        };
        machine.validate()?;
        Ok(machine)
    }
}

/// Nested `return [3, L]` / `return` / `throw` inside a statement, not
/// crossing into nested functions. The node is only read.
fn collect_nested_exits(node: &mut IRNode, exits: &mut SmallVec<[Exit; 2]>) {
    match node {
        IRNode::ReturnStatement(Some(value)) => match value.as_ref() {
            IRNode::GeneratorOp {
                opcode: 3,
                value: Some(target),
            } => {
                if let IRNode::LabelRef(l) = target.as_ref() {
                    exits.push(Exit::ConditionalJump(*l));
                }
            }
            IRNode::GeneratorOp { opcode: 7, .. } => exits.push(Exit::EndFinally),
            _ => exits.push(Exit::Return),
        },
        IRNode::ReturnStatement(None) => exits.push(Exit::Return),
        IRNode::ThrowStatement(_) => exits.push(Exit::Throw),
        IRNode::FunctionExpr { .. }
        | IRNode::FunctionDecl { .. }
        | IRNode::ES5ClassIIFE { .. }
        | IRNode::NamespaceIIFE { .. }
        | IRNode::GeneratorBody { .. } => {}
        _ => node.for_each_child_mut(&mut |child| collect_nested_exits(child, exits)),
    }
}

fn remap_labels(
    node: &mut IRNode,
    resolve: &dyn Fn(u32) -> Result<u32, InvariantViolation>,
    error: &mut Option<InvariantViolation>,
) {
    match node {
        IRNode::LabelRef(label) => match resolve(*label) {
            Ok(concrete) => *label = concrete,
            Err(e) => {
                error.get_or_insert(e);
            }
        },
        IRNode::GeneratorTrysPush { labels } => {
            for label in labels.iter_mut().flatten() {
                match resolve(*label) {
                    Ok(concrete) => *label = concrete,
                    Err(e) => {
                        error.get_or_insert(e);
                    }
                }
            }
        }
        IRNode::FunctionExpr { .. }
        | IRNode::FunctionDecl { .. }
        | IRNode::ES5ClassIIFE { .. }
        | IRNode::NamespaceIIFE { .. }
        | IRNode::GeneratorBody { .. } => {}
        _ => node.for_each_child_mut(&mut |child| remap_labels(child, resolve, error)),
    }
}
