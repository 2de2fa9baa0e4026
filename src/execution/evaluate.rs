//! Value helpers shared by the interpreter

use crate::ast::{ArithmeticOp, ComparisonOp, ValueSize};
use crate::machine::Machine;
use crate::{Error, Result};

/// Pops `count` call arguments; the first popped is the first argument
pub(crate) fn pop_stack_args(machine: &mut Machine, count: u32) -> Result<Vec<u32>> {
    let stack = machine.stack_mut();
    if count as u64 * 4 > stack.pointer() as u64 {
        return Err(Error::StackUnderflow {
            pointer: stack.pointer(),
            size: count.saturating_mul(4),
        });
    }
    (0..count).map(|_| stack.pop_dword()).collect()
}

/// Loads a value of `size` bytes, zero-extended
pub(crate) fn read_sized(machine: &Machine, address: u32, size: ValueSize) -> Result<u32> {
    let memory = machine.memory();
    match size {
        ValueSize::Byte => memory.read_byte(address).map(u32::from),
        ValueSize::Word => memory.read_word(address).map(u32::from),
        ValueSize::DWord => memory.read_dword(address),
    }
}

/// Stores the low `size` bytes of `value`
pub(crate) fn write_sized(
    machine: &mut Machine,
    address: u32,
    value: u32,
    size: ValueSize,
) -> Result<()> {
    let memory = machine.memory_mut();
    match size {
        ValueSize::Byte => memory.write_byte(address, value as u8),
        ValueSize::Word => memory.write_word(address, value as u16),
        ValueSize::DWord => memory.write_dword(address, value),
    }
}

/// 32-bit arithmetic: add/sub/mul wrap, div/mod are signed and truncate toward zero
pub fn arithmetic(op: ArithmeticOp, left: u32, right: u32) -> Result<u32> {
    let (l, r) = (left as i32, right as i32);
    let value = match op {
        ArithmeticOp::Add => l.wrapping_add(r),
        ArithmeticOp::Sub => l.wrapping_sub(r),
        ArithmeticOp::Mul => l.wrapping_mul(r),
        ArithmeticOp::Div => {
            if r == 0 {
                return Err(Error::DivisionByZero);
            }
            l.wrapping_div(r)
        }
        ArithmeticOp::Mod => {
            if r == 0 {
                return Err(Error::DivisionByZero);
            }
            l.wrapping_rem(r)
        }
    };
    Ok(value as u32)
}

/// Signed comparison
pub fn compare(op: ComparisonOp, left: i32, right: i32) -> bool {
    match op {
        ComparisonOp::Eq => left == right,
        ComparisonOp::Ne => left != right,
        ComparisonOp::Lt => left < right,
        ComparisonOp::Le => left <= right,
        ComparisonOp::Gt => left > right,
        ComparisonOp::Ge => left >= right,
    }
}
