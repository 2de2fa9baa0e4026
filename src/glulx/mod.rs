//! # Glulx front end
//!
//! Everything specific to the Glulx format: the image header and load
//! sequence, the opcode table, operand modes, the function decoder and the
//! binder that turns decoded instructions into IR.
//!
//! ```text
//! glulx/
//! ├── header.rs   # GlulxHeader, GlulxVersion, checksum
//! ├── machine.rs  # GlulxMachine (image -> runnable Machine)
//! ├── opcodes.rs  # Opcode table
//! ├── operand.rs  # Addressing modes
//! ├── decoder.rs  # Function header, locals, instruction stream
//! ├── binder.rs   # Instruction -> Statement
//! └── string.rs   # Uncompressed string objects
//! ```

mod binder;
mod decoder;
mod header;
mod machine;
pub mod opcodes;
mod operand;
mod string;

pub use binder::InstructionBinder;
pub use decoder::{read_function, read_opcode_number};
pub use header::{compute_checksum, GlulxHeader, GlulxVersion, CHECKSUM_OFFSET, HEADER_SIZE, MAGIC_NUMBER};
pub use machine::GlulxMachine;
pub use opcodes::{lookup, Opcode, OperandKind};
pub use operand::{Mode, Operand, OperandType};
pub use string::{read_string, STRING_E0, STRING_E1, STRING_E2};
