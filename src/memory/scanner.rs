//! Sequential big-endian reader over [`Memory`]

use super::Memory;
use crate::Result;

/// Cursor that reads consecutive values from memory
#[derive(Debug, Clone)]
pub struct MemoryScanner<'a> {
    memory: &'a Memory,
    address: u32,
}

impl<'a> MemoryScanner<'a> {
    pub(super) fn new(memory: &'a Memory, address: u32) -> Self {
        Self { memory, address }
    }

    /// Memory being scanned
    pub fn memory(&self) -> &'a Memory {
        self.memory
    }

    /// Address of the next unread byte
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Moves the cursor
    pub fn set_address(&mut self, address: u32) {
        self.address = address;
    }

    /// True if a full dword remains before the end of memory
    pub fn can_read_dword(&self) -> bool {
        self.address as u64 + 4 <= self.memory.size() as u64
    }

    /// Reads the next byte without advancing
    pub fn peek_byte(&self) -> Result<u8> {
        self.memory.read_byte(self.address)
    }

    /// Reads one byte and advances
    pub fn next_byte(&mut self) -> Result<u8> {
        let value = self.memory.read_byte(self.address)?;
        self.address = self.address.wrapping_add(1);
        Ok(value)
    }

    /// Reads a word and advances
    pub fn next_word(&mut self) -> Result<u16> {
        let value = self.memory.read_word(self.address)?;
        self.address = self.address.wrapping_add(2);
        Ok(value)
    }

    /// Reads a dword and advances
    pub fn next_dword(&mut self) -> Result<u32> {
        let value = self.memory.read_dword(self.address)?;
        self.address = self.address.wrapping_add(4);
        Ok(value)
    }

    /// Advances past a dword without reading it
    pub fn skip_dword(&mut self) {
        self.address = self.address.wrapping_add(4);
    }
}
