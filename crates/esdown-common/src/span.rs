//! Byte-offset source spans.
//!
//! Spans are produced by the external parser and carried on the syntax nodes
//! that can be reported in a diagnostic. Lowering never creates new spans; IR
//! nodes produced by transforms have no location.

use serde::{Deserialize, Serialize};

/// A half-open byte range `[pos, end)` in the original source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub pos: u32,
    pub end: u32,
}

impl Span {
    /// Span used for synthesized nodes and hand-built trees.
    pub const DUMMY: Span = Span { pos: 0, end: 0 };

    pub const fn new(pos: u32, end: u32) -> Self {
        Span { pos, end }
    }

    /// Length in bytes. Inverted spans report zero.
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.pos)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn is_dummy(&self) -> bool {
        self.pos == 0 && self.end == 0
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        if self.is_dummy() {
            return other;
        }
        if other.is_dummy() {
            return self;
        }
        Span {
            pos: self.pos.min(other.pos),
            end: self.end.max(other.end),
        }
    }
}
