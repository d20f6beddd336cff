//! Incremental C++ indentation engine.
//!
//! A pushdown scanner walks a document one line at a time, tracking the open
//! syntactic constructs on a stack and reporting an `(indent, padding)` unit
//! pair per line: `indent` counts structural nesting, `padding` counts
//! continuation units for wrapped expressions and conditions. Per-line
//! results are cached with revision stamps so re-indenting after an edit
//! only re-scans from the first affected line.
//!
//! Crate layout mirrors the three concerns:
//! * `state`     - the closed alphabet of context kinds plus the stack entry
//! * `policy`    - which constructs indent, by how much (style flags)
//! * `formatter` - the scanner, its transitions, and the per-line cache
//!
//! The engine is synchronous, allocation-light, and total: malformed input
//! degrades to recoverable state, never to a panic or an error value.

mod formatter;
mod policy;
mod state;

pub use formatter::{BlockData, CodeFormatter};
pub use policy::QtStyle;
pub use state::{State, StateKind, initial_stack};
