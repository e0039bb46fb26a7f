//! Lowering Context - per-unit state shared by every lowering rule
//!
//! One `LoweringContext` lives for exactly one output unit. It owns:
//!
//! - the helper registry (which shims the unit imports)
//! - name generation: fresh temporaries never collide with an identifier that
//!   appears anywhere in the unit and are never handed out twice
//! - a stack of function scopes recording hoisted temporaries and whether the
//!   scope must capture `this` / `arguments` for an inner arrow or state
//!   machine
//! - the names declared in each enclosing block, used for namespace merging
//!   and for renaming `let`/`const` bindings that would collide once they
//!   become function-scoped `var`s
//! - collected diagnostics
//!
//! Rules that fail partway through a top-level declaration leave the context
//! dirty; the driver takes a [`Checkpoint`] before each declaration and rolls
//! back to it when the declaration is skipped.

use crate::error::{LowerError, LowerResult};
use crate::options::EmitOptions;
use crate::transforms::helpers::{HelperHandle, HelperRegistry};
use crate::transforms::ir::IRNode;
use esdown_ast::{SourceUnit, collect_identifiers};
use esdown_common::limits::MAX_LOWERING_DEPTH;
use esdown_common::{Diagnostic, Span};
use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};

/// Lowering state of one function body (or of the unit itself).
#[derive(Debug, Default, Clone)]
pub struct FunctionScope {
    /// Temporaries to declare at the top of this body: `var _a, _b;`
    pub hoisted: IndexSet<String>,
    /// An inner arrow refers to this scope's `this`: `var _this = this;`
    pub captures_this: bool,
    /// `var _arguments = arguments;`
    pub captures_arguments: bool,
    /// Arrows are lexically transparent for `this` and `arguments`.
    pub is_arrow: bool,
    /// Name `this` resolves to inside this scope, when it is not `this`
    /// (derived constructors use `_this`, static initializers the class name).
    pub this_alias: Option<String>,
    /// Body is being lowered into a state machine step function.
    pub suspending: bool,
}

impl FunctionScope {
    pub fn function() -> Self {
        Self::default()
    }

    pub fn arrow() -> Self {
        FunctionScope {
            is_arrow: true,
            ..Self::default()
        }
    }
}

/// Class currently being lowered.
#[derive(Debug, Clone)]
pub struct ClassFrame {
    pub name: String,
    /// Identifier holding the base class inside the class IIFE.
    pub base: Option<String>,
    /// `var _super = _create_super(C)`
    pub super_name: Option<String>,
    pub in_static: bool,
    pub in_constructor: bool,
}

/// Names declared in one block. Function bodies, namespace bodies and the
/// unit open a function frame; every binding of the function is recorded
/// there under its emitted name.
#[derive(Debug, Default, Clone)]
struct BlockFrame {
    names: FxHashSet<String>,
    bound: FxHashSet<String>,
    function: bool,
    /// `renames.len()` when the block opened.
    renames: usize,
}

impl BlockFrame {
    fn new(function: bool, renames: usize) -> Self {
        BlockFrame {
            function,
            renames,
            ..Self::default()
        }
    }
}

/// Snapshot of the rollback-relevant parts of the context.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    helpers: usize,
    scopes: usize,
    unit_scope: FunctionScope,
    blocks: Vec<BlockFrame>,
    classes: usize,
    renames: usize,
}

pub struct LoweringContext {
    pub file_name: String,
    pub options: EmitOptions,
    pub helpers: HelperRegistry,
    /// Every identifier present in the unit.
    reserved: FxHashSet<String>,
    /// Every name handed out by `fresh_name`.
    generated: FxHashSet<String>,
    well_known: FxHashMap<&'static str, String>,
    /// `scopes[0]` is the unit scope.
    scopes: Vec<FunctionScope>,
    blocks: Vec<BlockFrame>,
    classes: Vec<ClassFrame>,
    /// Identifier substitutions, innermost last.
    renames: Vec<(String, String)>,
    diagnostics: Vec<Diagnostic>,
    depth: u32,
}

impl LoweringContext {
    pub fn new(unit: &SourceUnit, options: EmitOptions) -> Self {
        LoweringContext {
            file_name: unit.file_name.clone(),
            options,
            helpers: HelperRegistry::new(),
            reserved: collect_identifiers(unit),
            generated: FxHashSet::default(),
            well_known: FxHashMap::default(),
            scopes: vec![FunctionScope::function()],
            blocks: vec![BlockFrame::new(true, 0)],
            classes: Vec::new(),
            renames: Vec::new(),
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub fn require_helper(&mut self, name: &str) -> LowerResult<HelperHandle> {
        self.helpers.require(name)
    }

    /// Shorthand for `require_helper(name)?.call(args)`.
    pub fn helper_call(&mut self, name: &str, args: Vec<IRNode>) -> LowerResult<IRNode> {
        self.helpers.require(name)?.call(args)
    }

    // =========================================================================
    // Names
    // =========================================================================

    fn is_taken(&self, name: &str) -> bool {
        self.reserved.contains(name) || self.generated.contains(name)
    }

    /// A new unit-unique name for a renamed user binding: `base1`,
    /// `base2`, ...
    pub fn suffixed_name(&mut self, base: &str) -> String {
        let mut n = 1u32;
        loop {
            let candidate = format!("{base}{n}");
            if !self.is_taken(&candidate) {
                self.generated.insert(candidate.clone());
                return candidate;
            }
            n += 1;
        }
    }

    /// A new unit-unique name: `_base`, `_base1`, `_base2`, ...
    pub fn fresh_name(&mut self, base: &str) -> String {
        let base = base.trim_start_matches('_');
        let mut candidate = format!("_{base}");
        let mut n = 1u32;
        while self.is_taken(&candidate) {
            candidate = format!("_{base}{n}");
            n += 1;
        }
        self.generated.insert(candidate.clone());
        candidate
    }

    /// Shared name for a conventional binding (`_this`, `_super`, `_proto`,
    /// `_state`, `_arguments`). Every scope uses the same spelling; it only
    /// changes when the unit itself uses the plain spelling.
    pub fn well_known(&mut self, base: &'static str) -> String {
        if let Some(name) = self.well_known.get(base) {
            return name.clone();
        }
        let name = self.fresh_name(base);
        self.well_known.insert(base, name.clone());
        name
    }

    /// Fresh temporary declared at the top of the current function.
    pub fn declare_temp(&mut self, base: &str) -> String {
        let name = self.fresh_name(base);
        self.current_scope_mut().hoisted.insert(name.clone());
        name
    }

    /// Whether the unit mentions `name` anywhere.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    pub fn push_rename(&mut self, from: &str, to: &str) {
        self.renames.push((from.to_string(), to.to_string()));
    }

    pub fn pop_rename(&mut self) {
        self.renames.pop();
    }

    /// Hide an enclosing rename of `name` from a new binding of the same
    /// name, until the innermost block or function ends.
    pub fn shadow_rename(&mut self, name: &str) {
        if self.renamed(name).is_some_and(|to| to != name) {
            self.push_rename(name, name);
        }
    }

    pub fn renamed(&self, name: &str) -> Option<&str> {
        self.renames
            .iter()
            .rev()
            .find(|(from, _)| from == name)
            .map(|(_, to)| to.as_str())
    }

    // =========================================================================
    // Scopes
    // =========================================================================

    pub fn push_scope(&mut self, scope: FunctionScope) {
        self.scopes.push(scope);
        self.push_function_names();
    }

    /// Pop the innermost function scope. The unit scope is never popped.
    pub fn pop_scope(&mut self) -> FunctionScope {
        if self.scopes.len() > 1 {
            self.pop_block_names();
            self.scopes.pop().unwrap_or_default()
        } else {
            FunctionScope::function()
        }
    }

    pub fn current_scope(&self) -> &FunctionScope {
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn current_scope_mut(&mut self) -> &mut FunctionScope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn unit_scope(&self) -> &FunctionScope {
        &self.scopes[0]
    }

    /// Whether the innermost non-arrow scope is a state machine body.
    pub fn in_suspending_scope(&self) -> bool {
        self.scopes
            .iter()
            .rev()
            .find(|s| !s.is_arrow)
            .is_some_and(|s| s.suspending)
    }

    /// What `this` means at the current position.
    pub fn resolve_this(&mut self) -> IRNode {
        let mut through_arrow = false;
        let mut target = None;
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.is_arrow {
                through_arrow = true;
                continue;
            }
            if let Some(alias) = &scope.this_alias {
                return IRNode::id(alias.clone());
            }
            target = Some(i);
            break;
        }
        match target {
            Some(i) if through_arrow => {
                self.scopes[i].captures_this = true;
                IRNode::id(self.well_known("this"))
            }
            _ => IRNode::this(),
        }
    }

    /// What `arguments` means at the current position. State machine bodies
    /// run inside a step function, so they read the outer function's
    /// arguments through a capture as well.
    pub fn resolve_arguments(&mut self) -> IRNode {
        let mut capture = false;
        let mut target = None;
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.is_arrow {
                capture = true;
                continue;
            }
            capture |= scope.suspending;
            target = Some(i);
            break;
        }
        match target {
            Some(i) if capture => {
                self.scopes[i].captures_arguments = true;
                IRNode::id(self.well_known("arguments"))
            }
            _ => IRNode::id("arguments"),
        }
    }

    /// Declarations a function body needs before its own statements:
    /// `var _this = this;`, `var _arguments = arguments;`.
    pub fn capture_prologue(&mut self, scope: &FunctionScope) -> Vec<IRNode> {
        let mut out = Vec::new();
        if scope.captures_this {
            out.push(IRNode::var_decl(self.well_known("this"), Some(IRNode::this())));
        }
        if scope.captures_arguments {
            out.push(IRNode::var_decl(
                self.well_known("arguments"),
                Some(IRNode::id("arguments")),
            ));
        }
        out
    }

    // =========================================================================
    // Declared names
    // =========================================================================

    /// Open a block. Renames pushed inside it end with it.
    pub fn push_block_names(&mut self) {
        self.blocks.push(BlockFrame::new(false, self.renames.len()));
    }

    /// Open a body whose `var`s do not leak out (a namespace IIFE).
    pub fn push_function_names(&mut self) {
        self.blocks.push(BlockFrame::new(true, self.renames.len()));
    }

    pub fn pop_block_names(&mut self) {
        if self.blocks.len() > 1
            && let Some(frame) = self.blocks.pop()
        {
            self.renames.truncate(frame.renames);
        }
    }

    /// Record a name declared in the innermost block. Returns `false` if it
    /// was already declared there.
    pub fn declare_name(&mut self, name: &str) -> bool {
        let emitted = self.renamed(name).unwrap_or(name).to_string();
        if let Some(frame) = self.blocks.iter_mut().rev().find(|b| b.function) {
            frame.bound.insert(emitted);
        }
        match self.blocks.last_mut() {
            Some(frame) => frame.names.insert(name.to_string()),
            None => true,
        }
    }

    /// Declare a `let`/`const` binding and return the name it is emitted
    /// under. Outside a function's top level the binding becomes a `var` of
    /// the whole function, so a name that is already visible or already
    /// bound in the function is renamed (`x` to `x1`) until the block ends.
    pub fn declare_lexical(&mut self, name: &str) -> String {
        let nested = self.blocks.last().is_some_and(|b| !b.function);
        if nested && self.collides(name) {
            let renamed = self.suffixed_name(name);
            self.push_rename(name, &renamed);
        }
        self.declare_name(name);
        self.renamed(name).unwrap_or(name).to_string()
    }

    fn collides(&self, name: &str) -> bool {
        let emitted = self.renamed(name).unwrap_or(name);
        self.blocks.iter().any(|b| b.names.contains(name))
            || self
                .blocks
                .iter()
                .rev()
                .find(|b| b.function)
                .is_some_and(|f| f.bound.contains(name) || f.bound.contains(emitted))
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.blocks.last().is_some_and(|b| b.names.contains(name))
    }

    // =========================================================================
    // Classes
    // =========================================================================

    pub fn push_class(&mut self, frame: ClassFrame) {
        self.classes.push(frame);
    }

    pub fn pop_class(&mut self) {
        self.classes.pop();
    }

    pub fn current_class(&self) -> Option<&ClassFrame> {
        self.classes.last()
    }

    pub fn current_class_mut(&mut self) -> Option<&mut ClassFrame> {
        self.classes.last_mut()
    }

    // =========================================================================
    // Diagnostics and limits
    // =========================================================================

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Enter one level of recursive lowering.
    pub fn enter(&mut self, span: Span) -> LowerResult<()> {
        if self.depth >= MAX_LOWERING_DEPTH {
            return Err(LowerError::unsupported("deeply nested expression", span));
        }
        self.depth += 1;
        Ok(())
    }

    pub const fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // =========================================================================
    // Rollback
    // =========================================================================

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            helpers: self.helpers.len(),
            scopes: self.scopes.len(),
            unit_scope: self.scopes[0].clone(),
            blocks: self.blocks.clone(),
            classes: self.classes.len(),
            renames: self.renames.len(),
        }
    }

    /// Forget everything recorded since `checkpoint`. Generated names stay
    /// reserved so they are still never reused.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.helpers.truncate(checkpoint.helpers);
        self.scopes.truncate(checkpoint.scopes.max(1));
        self.scopes[0] = checkpoint.unit_scope;
        self.blocks = checkpoint.blocks;
        self.classes.truncate(checkpoint.classes);
        self.renames.truncate(checkpoint.renames);
        self.depth = 0;
    }
}

#[cfg(test)]
#[path = "../tests/transform_context.rs"]
mod tests;
