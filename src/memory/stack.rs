//! Fixed-capacity big-endian value stack

use crate::{Error, Result};

/// Stack-machine temporaries and stack-convention call arguments.
///
/// Distinct from [`Memory`](super::Memory): the guest can only reach it through
/// push/pop operands, never through addresses.
#[derive(Debug, Clone)]
pub struct ValueStack {
    bytes: Vec<u8>,
    pointer: u32,
}

impl ValueStack {
    /// Creates an empty stack with `capacity` bytes
    pub fn new(capacity: u32) -> Self {
        Self {
            bytes: vec![0; capacity as usize],
            pointer: 0,
        }
    }

    /// Capacity in bytes
    pub fn capacity(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Number of bytes currently pushed
    pub fn pointer(&self) -> u32 {
        self.pointer
    }

    /// Resets the fill pointer to a previously observed value.
    ///
    /// Used on function return to discard values the callee left behind.
    pub fn restore_pointer(&mut self, pointer: u32) -> Result<()> {
        if pointer > self.capacity() {
            return Err(Error::StackOverflow {
                pointer: self.pointer,
                size: pointer.saturating_sub(self.pointer),
                capacity: self.capacity(),
            });
        }

        self.pointer = pointer;
        Ok(())
    }

    fn reserve_push(&mut self, size: u32) -> Result<usize> {
        if self.pointer as u64 + size as u64 > self.capacity() as u64 {
            return Err(Error::StackOverflow {
                pointer: self.pointer,
                size,
                capacity: self.capacity(),
            });
        }

        let start = self.pointer as usize;
        self.pointer += size;
        Ok(start)
    }

    fn reserve_pop(&mut self, size: u32) -> Result<usize> {
        if self.pointer < size {
            return Err(Error::StackUnderflow {
                pointer: self.pointer,
                size,
            });
        }

        self.pointer -= size;
        Ok(self.pointer as usize)
    }

    /// Pushes one byte
    pub fn push_byte(&mut self, value: u8) -> Result<()> {
        let start = self.reserve_push(1)?;
        self.bytes[start] = value;
        Ok(())
    }

    /// Pushes a big-endian word
    pub fn push_word(&mut self, value: u16) -> Result<()> {
        let start = self.reserve_push(2)?;
        self.bytes[start..start + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Pushes a big-endian dword
    pub fn push_dword(&mut self, value: u32) -> Result<()> {
        let start = self.reserve_push(4)?;
        self.bytes[start..start + 4].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Pops one byte
    pub fn pop_byte(&mut self) -> Result<u8> {
        let start = self.reserve_pop(1)?;
        Ok(self.bytes[start])
    }

    /// Pops a big-endian word
    pub fn pop_word(&mut self) -> Result<u16> {
        let start = self.reserve_pop(2)?;
        Ok(u16::from_be_bytes([self.bytes[start], self.bytes[start + 1]]))
    }

    /// Pops a big-endian dword
    pub fn pop_dword(&mut self) -> Result<u32> {
        let start = self.reserve_pop(4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.bytes[start..start + 4]);
        Ok(u32::from_be_bytes(buf))
    }

    /// Duplicates the top `count` dwords, preserving their order
    pub fn copy_dwords(&mut self, count: u32) -> Result<()> {
        let size = count.checked_mul(4).ok_or(Error::StackUnderflow {
            pointer: self.pointer,
            size: u32::MAX,
        })?;

        if size > self.pointer {
            return Err(Error::StackUnderflow {
                pointer: self.pointer,
                size,
            });
        }

        let source = (self.pointer - size) as usize;
        let target = self.reserve_push(size)?;
        self.bytes.copy_within(source..source + size as usize, target);
        Ok(())
    }
}
