//! # Function decoder
//!
//! Reads a function header and its instruction stream from memory and binds
//! each instruction to IR.
//!
//! ```text
//! +------+-----------------------+---------------------------------------+
//! | type | locals (size, count)* | instructions...                       |
//! | C0/1 | ... 00 00             | opcode | mode nibbles | operand data |
//! +------+-----------------------+---------------------------------------+
//! ```

use super::binder::InstructionBinder;
use super::opcodes::{lookup, Opcode, OperandKind};
use super::operand::{Mode, Operand};
use crate::ast::{BodyBuilder, Local, ValueSize};
use crate::machine::{Function, FunctionKind};
use crate::memory::{Memory, MemoryScanner};
use crate::{DecodeError, Error, Result};
use std::collections::HashMap;

/// Decodes the function at `address`
pub fn read_function(memory: &Memory, address: u32, ram_start: u32) -> Result<Function> {
    let mut scanner = memory.scanner(address);

    let kind = read_kind(&mut scanner).map_err(|e| with_address(e, address))?;

    let mut builder = BodyBuilder::new();
    let locals = read_locals(&mut scanner, &mut builder).map_err(|e| with_address(e, address))?;

    let mut binder = InstructionBinder::new(address, ram_start, builder, locals);
    read_instructions(&mut scanner, &mut binder).map_err(|e| with_address(e, address))?;

    let body = binder.into_body()?;
    Function::new(kind, address, body)
}

/// Failures local to this module, tagged with the function address on the way out
enum ReadError {
    Decode(DecodeError),
    Other(Error),
}

impl From<Error> for ReadError {
    fn from(error: Error) -> Self {
        ReadError::Other(error)
    }
}

impl From<DecodeError> for ReadError {
    fn from(error: DecodeError) -> Self {
        ReadError::Decode(error)
    }
}

fn with_address(error: ReadError, address: u32) -> Error {
    match error {
        ReadError::Decode(error) => Error::decode(address, error),
        ReadError::Other(error) => error,
    }
}

fn read_kind(scanner: &mut MemoryScanner<'_>) -> std::result::Result<FunctionKind, ReadError> {
    match scanner.next_byte()? {
        0xC0 => Ok(FunctionKind::StackArgument),
        0xC1 => Ok(FunctionKind::LocalArgument),
        other @ 0xC0..=0xDF => Err(DecodeError::UnknownFunctionType(other).into()),
        other => Err(DecodeError::NotAFunction(other).into()),
    }
}

/// Declares every local and maps its frame address to it.
///
/// Groups wider than a byte start at the next multiple of their size.
fn read_locals(
    scanner: &mut MemoryScanner<'_>,
    builder: &mut BodyBuilder,
) -> std::result::Result<HashMap<u32, Local>, ReadError> {
    let mut locals = HashMap::new();
    let mut address = 0u32;

    loop {
        let size_byte = scanner.next_byte()?;
        let count = scanner.next_byte()?;

        if size_byte == 0 && count == 0 {
            break;
        }

        let size = ValueSize::from_bytes(size_byte).ok_or(DecodeError::InvalidLocalSize(size_byte))?;
        let width = size.bytes();

        if address % width != 0 {
            address += width - address % width;
        }

        for _ in 0..count {
            locals.insert(address, builder.declare_local(size));
            address += width;
        }
    }

    Ok(locals)
}

/// Reads an opcode number; its encoded width is given by the top bits of the first byte
pub fn read_opcode_number(scanner: &mut MemoryScanner<'_>) -> Result<u32> {
    let first = scanner.peek_byte()?;

    if first & 0xC0 == 0xC0 {
        Ok(scanner.next_dword()? & 0x0FFF_FFFF)
    } else if first & 0x80 == 0x80 {
        Ok(u32::from(scanner.next_word()?) & 0x3FFF)
    } else {
        Ok(u32::from(scanner.next_byte()?) & 0x7F)
    }
}

/// Reads the operands of `opcode`, split into loads and stores.
///
/// Mode nibbles come first, two per byte, low nibble first; the operand data
/// follows all of them and is read with a second cursor. The primary cursor
/// ends up after the data.
fn read_operands(
    scanner: &mut MemoryScanner<'_>,
    opcode: &Opcode,
) -> std::result::Result<(Vec<Operand>, Vec<Operand>), ReadError> {
    let mut loads = Vec::new();
    let mut stores = Vec::new();

    let count = opcode.operand_count();
    if count == 0 {
        return Ok((loads, stores));
    }

    let modes_length = ((count + 1) / 2) as u32;
    let mut data = scanner.memory().scanner(scanner.address() + modes_length);

    for pair in opcode.operands.chunks(2) {
        let modes = scanner.next_byte()?;

        for (i, &kind) in pair.iter().enumerate() {
            let nibble = if i == 0 { modes & 0x0F } else { modes >> 4 };
            let operand = Mode::from_nibble(nibble)?.read(&mut data)?;
            match kind {
                OperandKind::Load => loads.push(operand),
                OperandKind::Store => stores.push(operand),
            }
        }
    }

    scanner.set_address(data.address());
    Ok((loads, stores))
}

fn read_instructions(
    scanner: &mut MemoryScanner<'_>,
    binder: &mut InstructionBinder,
) -> std::result::Result<(), ReadError> {
    loop {
        let address = scanner.address();

        // Running into the end of memory also ends the function
        let number = match read_opcode_number(scanner) {
            Ok(number) => number,
            Err(Error::OutOfRange { .. }) => break,
            Err(e) => return Err(e.into()),
        };

        let Some(opcode) = lookup(number) else {
            break;
        };

        let (loads, stores) = read_operands(scanner, opcode)?;
        binder.bind(opcode, &loads, &stores, address, scanner.address())?;
    }

    Ok(())
}
