//! Helper Library Registry
//!
//! Lowered code calls small runtime shims (`_inherits`, `_ts_generator`, ...)
//! from an external helper package. The registry knows the fixed catalog of
//! shims, records which ones a unit uses in first-use order, and builds the
//! import statements hoisted to the top of the unit.

use super::ir::IRNode;
use crate::error::{HelperError, LowerError};
use crate::options::{EmitOptions, HelperImportStyle};
use indexmap::IndexSet;
use tracing::debug;

/// Catalog entry: name and accepted argument count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HelperSpec {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
}

const fn spec(name: &'static str, min_args: usize, max_args: usize) -> HelperSpec {
    HelperSpec {
        name,
        min_args,
        max_args,
    }
}

pub static HELPER_CATALOG: &[HelperSpec] = &[
    spec("class_call_check", 2, 2),
    spec("inherits", 2, 2),
    spec("create_super", 1, 1),
    spec("create_class", 2, 3),
    spec("define_property", 3, 3),
    spec("async_to_generator", 1, 1),
    spec("ts_generator", 2, 2),
    spec("ts_values", 1, 1),
    spec("to_consumable_array", 1, 1),
    spec("construct", 2, 2),
    spec("instanceof", 2, 2),
];

pub fn lookup_helper(name: &str) -> Option<&'static HelperSpec> {
    HELPER_CATALOG.iter().find(|h| h.name == name)
}

/// A resolved helper. Cheap to copy; calling it does not touch the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HelperHandle {
    spec: &'static HelperSpec,
}

impl HelperHandle {
    pub const fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Identifier the helper is imported as: `_name`.
    pub fn local_name(&self) -> String {
        format!("_{}", self.spec.name)
    }

    pub fn ident(&self) -> IRNode {
        IRNode::id(self.local_name())
    }

    /// `_name(args)`, rejecting argument counts outside the arity contract.
    pub fn call(&self, args: Vec<IRNode>) -> Result<IRNode, LowerError> {
        let got = args.len();
        if got < self.spec.min_args || got > self.spec.max_args {
            return Err(HelperError::Arity {
                name: self.spec.name,
                min: self.spec.min_args,
                max: self.spec.max_args,
                got,
            }
            .into());
        }
        Ok(IRNode::call(self.ident(), args))
    }
}

/// Per-unit record of required helpers.
#[derive(Debug, Default, Clone)]
pub struct HelperRegistry {
    used: IndexSet<&'static str>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a helper and mark it for import. Idempotent.
    pub fn require(&mut self, name: &str) -> Result<HelperHandle, LowerError> {
        let spec = lookup_helper(name).ok_or_else(|| HelperError::Unknown(name.to_string()))?;
        if self.used.insert(spec.name) {
            debug!(helper = spec.name, "helper required");
        }
        Ok(HelperHandle { spec })
    }

    /// Required helper names, in first-use order.
    pub fn required_helpers(&self) -> Vec<&'static str> {
        self.used.iter().copied().collect()
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Forget helpers required after the first `len` ones.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.used.truncate(len);
    }

    /// Import statements for every required helper.
    pub fn import_statements(&self, options: &EmitOptions) -> Vec<IRNode> {
        self.used
            .iter()
            .map(|name| {
                let local = format!("_{name}");
                let source = options.helper_source(&local);
                match options.helper_import_style {
                    HelperImportStyle::EsModule => IRNode::DefaultImport { local, source },
                    HelperImportStyle::CommonJs => IRNode::RequireStatement { local, source },
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/helpers.rs"]
mod tests;
