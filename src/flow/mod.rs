//! Control-flow analysis over decoded function bodies

mod cfg;

pub use cfg::{Block, BlockId, ControlFlowGraph};
