//! # Intermediate representation
//!
//! Decoded functions are held as a flat list of tree-shaped statements.
//! Control flow is expressed with [`Label`] statements and jumps to them;
//! the [`flow`](crate::flow) module recovers basic blocks from that list.
//!
//! ```text
//! ast/
//! ├── node.rs     # Expression / Statement / Label / Local / ValueSize
//! ├── body.rs     # Body (finished, normalized function body)
//! ├── builder.rs  # BodyBuilder (label lifecycle + prune-and-renumber)
//! └── rewrite.rs  # Rewriter (structural tree rewrite)
//! ```

mod body;
mod builder;
mod node;
mod rewrite;

pub use body::Body;
pub use builder::{normalize, BodyBuilder};
pub use node::{
    ArithmeticOp, ComparisonOp, DispatchFunction, Expression, Label, Local, Statement, ValueSize,
};
pub use rewrite::{LabelRemap, Rewriter};
