//! Error types for the lowering passes
//!
//! Unsupported input is recoverable: the driver turns it into a diagnostic and
//! skips the declaration. Invariant violations and helper resolution failures
//! are bugs in a rule and abort the unit.

use esdown_common::Span;
use esdown_common::diagnostics::{Diagnostic, diagnostic_codes};
use thiserror::Error;

/// Classification of a [`LowerError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Unsupported,
    Internal,
    HelperResolution,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LowerError {
    /// The construct has no ES5 rendering under the current rules
    #[error("'{construct}' is not supported when lowering to ES5")]
    Unsupported { construct: String, span: Span },

    /// A state machine or IR invariant did not hold
    #[error("internal lowering error: {0}")]
    Internal(#[from] InvariantViolation),

    #[error("helper resolution failed: {0}")]
    Helper(#[from] HelperError),
}

impl LowerError {
    pub fn unsupported(construct: impl Into<String>, span: Span) -> Self {
        LowerError::Unsupported {
            construct: construct.into(),
            span,
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            LowerError::Unsupported { .. } => ErrorKind::Unsupported,
            LowerError::Internal(_) => ErrorKind::Internal,
            LowerError::Helper(_) => ErrorKind::HelperResolution,
        }
    }

    /// Diagnostic for a recoverable error. `None` for fatal kinds.
    pub fn to_diagnostic(&self, file: &str) -> Option<Diagnostic> {
        match self {
            LowerError::Unsupported { construct, span } => Some(Diagnostic::from_code(
                file,
                span.pos,
                span.len(),
                diagnostic_codes::UNSUPPORTED_CONSTRUCT,
                &[construct.as_str()],
            )),
            _ => None,
        }
    }
}

/// Structural invariants of a state machine descriptor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("label {0} was never marked")]
    UnresolvedLabel(u32),

    #[error("case {from} jumps to missing case {to}")]
    DanglingSuccessor { from: u32, to: u32 },

    #[error("case {from} jumps backward to {to}, which is not a loop header")]
    BackwardJumpToNonHeader { from: u32, to: u32 },

    #[error("try regions overlap without nesting")]
    OverlappingTryRegions,

    #[error("expected case label {expected}, found {found}")]
    NonSequentialLabel { expected: u32, found: u32 },

    #[error("state machine has no case that returns or throws")]
    NoTerminalCase,

    #[error("state machine exceeds {0} cases")]
    TooManyCases(usize),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HelperError {
    #[error("unknown helper '{0}'")]
    Unknown(String),

    #[error("helper '{name}' takes {min}..={max} arguments, got {got}")]
    Arity {
        name: &'static str,
        min: usize,
        max: usize,
        got: usize,
    },
}

pub type LowerResult<T> = Result<T, LowerError>;
