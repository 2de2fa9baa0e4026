//! Operand addressing modes

use crate::memory::MemoryScanner;
use crate::{DecodeError, Result};
use std::fmt;

/// Where an operand's value comes from or goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// Immediate value
    Constant,
    /// Absolute memory address
    Address,
    /// Value stack
    Stack,
    /// Offset into the call frame's locals
    LocalAddress,
    /// Address relative to RAM start
    RamAddress,
}

impl OperandType {
    /// Short name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            OperandType::Constant => "constant",
            OperandType::Address => "address",
            OperandType::Stack => "stack",
            OperandType::LocalAddress => "local",
            OperandType::RamAddress => "ram",
        }
    }
}

impl fmt::Display for OperandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A decoded operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    /// Addressing mode
    pub kind: OperandType,
    /// Raw value; constants are already sign-extended
    pub value: u32,
}

impl Operand {
    /// Creates an operand
    pub fn new(kind: OperandType, value: u32) -> Self {
        Self { kind, value }
    }
}

/// An addressing-mode nibble: operand type plus the width of its data field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    kind: OperandType,
    width: u8,
}

impl Mode {
    /// Interprets one mode nibble
    pub fn from_nibble(nibble: u8) -> std::result::Result<Self, DecodeError> {
        let (kind, width) = match nibble {
            0x0 => (OperandType::Constant, 0),
            0x1 => (OperandType::Constant, 1),
            0x2 => (OperandType::Constant, 2),
            0x3 => (OperandType::Constant, 4),
            0x5 => (OperandType::Address, 1),
            0x6 => (OperandType::Address, 2),
            0x7 => (OperandType::Address, 4),
            0x8 => (OperandType::Stack, 0),
            0x9 => (OperandType::LocalAddress, 1),
            0xa => (OperandType::LocalAddress, 2),
            0xb => (OperandType::LocalAddress, 4),
            0xd => (OperandType::RamAddress, 1),
            0xe => (OperandType::RamAddress, 2),
            0xf => (OperandType::RamAddress, 4),
            other => return Err(DecodeError::InvalidOperandMode(other)),
        };
        Ok(Self { kind, width })
    }

    /// Operand type selected by this mode
    pub fn kind(&self) -> OperandType {
        self.kind
    }

    /// Bytes of operand data that follow
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Reads the operand's data field
    pub fn read(&self, scanner: &mut MemoryScanner<'_>) -> Result<Operand> {
        let signed = self.kind == OperandType::Constant;
        let value = match self.width {
            0 => 0,
            1 if signed => scanner.next_byte()? as i8 as i32 as u32,
            1 => scanner.next_byte()? as u32,
            2 if signed => scanner.next_word()? as i16 as i32 as u32,
            2 => scanner.next_word()? as u32,
            _ => scanner.next_dword()?,
        };
        Ok(Operand::new(self.kind, value))
    }
}
