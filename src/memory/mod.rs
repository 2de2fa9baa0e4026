//! # Memory model
//!
//! Byte-addressable guest memory and the auxiliary value stack. Both are
//! big-endian and bounds-checked; every access returns a [`Result`](crate::Result)
//! instead of panicking.
//!
//! ```text
//! memory/
//! ├── mod.rs      # Memory (growable store + read-only regions)
//! ├── scanner.rs  # MemoryScanner (sequential cursor used by the decoder)
//! └── stack.rs    # ValueStack (fixed-capacity stack-machine temporaries)
//! ```

mod scanner;
mod stack;

pub use scanner::MemoryScanner;
pub use stack::ValueStack;

use crate::{Error, Result};

/// Guest memory: a growable byte buffer with write-protected ranges
#[derive(Debug, Clone, Default)]
pub struct Memory {
    bytes: Vec<u8>,
    /// (start, length) pairs; appended, never removed
    read_only_regions: Vec<(u32, u32)>,
}

impl Memory {
    /// Creates memory holding a copy of `bytes`
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            read_only_regions: Vec::new(),
        }
    }

    /// Current size in bytes
    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Grows memory to `new_size`, zero-filling the new bytes
    pub fn expand(&mut self, new_size: u32) -> Result<()> {
        if new_size < self.size() {
            return Err(Error::InvalidMemorySize {
                requested: new_size,
                current: self.size(),
            });
        }

        self.bytes.resize(new_size as usize, 0);
        Ok(())
    }

    /// Marks `[start, start + length)` as read-only
    pub fn add_read_only_region(&mut self, start: u32, length: u32) {
        self.read_only_regions.push((start, length));
    }

    /// Write-protected regions as (start, length) pairs
    pub fn read_only_regions(&self) -> &[(u32, u32)] {
        &self.read_only_regions
    }

    /// Creates a scanner positioned at `address`
    pub fn scanner(&self, address: u32) -> MemoryScanner<'_> {
        MemoryScanner::new(self, address)
    }

    fn validate_range(&self, address: u32, size: u32) -> Result<usize> {
        let end = address as u64 + size as u64;
        if end > self.bytes.len() as u64 {
            return Err(Error::OutOfRange {
                address,
                size,
                length: self.size(),
            });
        }

        Ok(address as usize)
    }

    fn validate_write(&self, address: u32, size: u32) -> Result<usize> {
        let index = self.validate_range(address, size)?;

        let write_start = address as u64;
        let write_end = write_start + size as u64;

        for &(start, length) in &self.read_only_regions {
            let region_start = start as u64;
            let region_end = region_start + length as u64;

            if write_start < region_end && write_end > region_start {
                return Err(Error::ReadOnlyViolation {
                    address,
                    size,
                    start,
                    end: region_end as u32,
                });
            }
        }

        Ok(index)
    }

    /// Reads one byte
    pub fn read_byte(&self, address: u32) -> Result<u8> {
        let index = self.validate_range(address, 1)?;
        Ok(self.bytes[index])
    }

    /// Reads a big-endian 16-bit word
    pub fn read_word(&self, address: u32) -> Result<u16> {
        let index = self.validate_range(address, 2)?;
        Ok(u16::from_be_bytes([self.bytes[index], self.bytes[index + 1]]))
    }

    /// Reads a big-endian 32-bit dword
    pub fn read_dword(&self, address: u32) -> Result<u32> {
        let index = self.validate_range(address, 4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.bytes[index..index + 4]);
        Ok(u32::from_be_bytes(buf))
    }

    /// Writes one byte
    pub fn write_byte(&mut self, address: u32, value: u8) -> Result<()> {
        let index = self.validate_write(address, 1)?;
        self.bytes[index] = value;
        Ok(())
    }

    /// Writes a big-endian 16-bit word
    pub fn write_word(&mut self, address: u32, value: u16) -> Result<()> {
        let index = self.validate_write(address, 2)?;
        self.bytes[index..index + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Writes a big-endian 32-bit dword
    pub fn write_dword(&mut self, address: u32, value: u32) -> Result<()> {
        let index = self.validate_write(address, 4)?;
        self.bytes[index..index + 4].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Raw view of the whole buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
