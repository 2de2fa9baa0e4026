//! # ifvm - A Glulx Virtual Machine
//!
//! Runs Glulx story files by decoding each guest function into a small
//! tree-shaped IR, building its control flow graph, and interpreting the
//! graph block by block.
//!
//! ## Quick Start
//!
//! Decode and call a function placed directly in memory:
//!
//! ```rust
//! use ifvm::host::NullHost;
//! use ifvm::machine::Machine;
//! use ifvm::memory::{Memory, ValueStack};
//!
//! # fn main() -> ifvm::Result<()> {
//! // Stack-argument function, no locals: `return 42`, then a stop byte
//! let code = vec![0xC0, 0x00, 0x00, 0x31, 0x01, 0x2A, 0x7F];
//!
//! let mut machine = Machine::new(
//!     Memory::new(code),
//!     ValueStack::new(256),
//!     0,
//!     Box::new(NullHost),
//! );
//! assert_eq!(machine.call_function(0, &[])?, 42);
//! # Ok(())
//! # }
//! ```
//!
//! Whole story files go through [`GlulxMachine`], which validates the
//! header and checksum, lays out memory and decodes the start function:
//!
//! ```rust,no_run
//! use ifvm::{GlulxMachine, MachineConfig, RecordingHost};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let image = std::fs::read("story.ulx")?;
//! let host = RecordingHost::new();
//! let mut vm = GlulxMachine::new(image, Box::new(host.clone()), MachineConfig::default())?;
//! vm.run()?;
//! print!("{}", host.output());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! bytes ──► glulx::read_function ──► ast::BodyBuilder ──► flow::ControlFlowGraph
//!                 (decode + bind)       (labels, prune)          (blocks)
//!                                                                   │
//!               machine::Machine ◄── execution::Interpreter ◄──────┘
//!        (memory, stack, frames, cache)   (postfix code, activation stack)
//! ```
//!
//! ### Main Components
//!
//! - **[`memory`]**: bounds-checked big-endian memory and the value stack
//! - **[`ast`]**: IR nodes, the body builder and label normalization
//! - **[`flow`]**: basic blocks and the control flow graph
//! - **[`glulx`]**: header, opcode table, decoder and instruction binder
//! - **[`execution`]**: expression evaluation and block interpretation
//! - **[`machine`]**: call frames, function cache and execution limits
//! - **[`host`]**: Glk dispatch and text output supplied by the embedder
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`]. [`Error::kind`] groups the
//! variants into broad categories:
//!
//! ```rust
//! use ifvm::memory::Memory;
//! use ifvm::ErrorKind;
//!
//! let mut memory = Memory::new(vec![0; 4]);
//! memory.add_read_only_region(0, 2);
//! let err = memory.write_byte(1, 7).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::ReadOnlyViolation);
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (function decoding at `debug`, calls at
//! `trace`, halts and tripped limits at `warn`) and never installs a
//! subscriber.

#![warn(missing_docs)]

/// Version of the ifvm crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ast;
pub mod error;
pub mod execution;
pub mod flow;
pub mod glulx;
pub mod host;
pub mod machine;
pub mod memory;

// Re-export main types
pub use error::{DecodeError, Error, ErrorKind, Result};
pub use glulx::{GlulxHeader, GlulxMachine, GlulxVersion};
pub use host::{Host, NullHost, RecordingHost};
pub use machine::{Function, FunctionKind, Machine, MachineConfig};
