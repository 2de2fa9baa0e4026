//! # Execution
//!
//! Each decoded function is laid out once as postfix [`Code`]: its blocks in
//! label order, every expression flattened children-first. The
//! [`Interpreter`] runs that code with an explicit activation stack, so
//! neither deep expression trees nor deep guest recursion touch the host
//! stack.
//!
//! ```text
//! Body + ControlFlowGraph --compile--> Code --Interpreter--> u32
//! ```

mod code;
mod evaluate;
mod interpreter;

pub use code::{Code, Op};
pub use evaluate::{arithmetic, compare};
pub use interpreter::{evaluate_expression, Interpreter};
