//! Centralized limits and thresholds for the lowering passes.
//!
//! Lowering is recursive over the syntax tree. These limits turn pathological
//! nesting into an "unsupported construct" diagnostic instead of a stack
//! overflow.

/// Maximum nesting depth of expressions and statements visited by a lowering
/// rule.
///
/// ```javascript
/// // 600 nested parentheses / calls / conditionals:
/// f(f(f(f(f(/* ... */)))));
/// ```
pub const MAX_LOWERING_DEPTH: u32 = 500;

/// Maximum number of qualified name segments in a namespace declaration
/// (`namespace A.B.C.D ...`).
pub const MAX_QUALIFIED_NAME_DEPTH: usize = 100;

/// Maximum number of Cases a single state machine may contain before the
/// lowering gives up. Each suspension point, branch join and loop adds a
/// few Cases, so this is far above anything hand-written.
pub const MAX_STATE_MACHINE_CASES: usize = 65_536;
