//! Story file header

use crate::memory::Memory;
use crate::{Error, Result};
use std::fmt;

/// `Glul` in ASCII
pub const MAGIC_NUMBER: u32 = 0x476C_756C;

/// Size of the header in bytes
pub const HEADER_SIZE: u32 = 36;

/// Offset of the checksum field, which is excluded from its own sum
pub const CHECKSUM_OFFSET: u32 = 0x20;

/// Glulx format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlulxVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u8,
    /// Sub-minor version
    pub sub_minor: u8,
}

impl GlulxVersion {
    /// Creates a version
    pub fn new(major: u16, minor: u8, sub_minor: u8) -> Self {
        Self {
            major,
            minor,
            sub_minor,
        }
    }
}

impl fmt::Display for GlulxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.sub_minor)
    }
}

/// Parsed image header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlulxHeader {
    /// Format version
    pub version: GlulxVersion,
    /// First writable address
    pub ram_start: u32,
    /// Length of the image file
    pub ext_start: u32,
    /// Memory size after loading
    pub end_mem: u32,
    /// Value stack size in bytes
    pub stack_size: u32,
    /// Address of the function to call at startup
    pub start_func: u32,
    /// Address of the string decoding table
    pub decoding_tbl: u32,
    /// Stored checksum
    pub checksum: u32,
}

impl GlulxHeader {
    /// Reads the header from the start of `memory`
    pub fn read(memory: &Memory) -> Result<Self> {
        if memory.size() < HEADER_SIZE {
            return Err(Error::malformed(format!(
                "image is {} bytes, smaller than the {}-byte header",
                memory.size(),
                HEADER_SIZE
            )));
        }

        let mut scanner = memory.scanner(0);

        let magic = scanner.next_dword()?;
        if magic != MAGIC_NUMBER {
            return Err(Error::malformed(format!(
                "not a glulx file (magic number 0x{:08x})",
                magic
            )));
        }

        let version = GlulxVersion::new(
            scanner.next_word()?,
            scanner.next_byte()?,
            scanner.next_byte()?,
        );

        Ok(Self {
            version,
            ram_start: scanner.next_dword()?,
            ext_start: scanner.next_dword()?,
            end_mem: scanner.next_dword()?,
            stack_size: scanner.next_dword()?,
            start_func: scanner.next_dword()?,
            decoding_tbl: scanner.next_dword()?,
            checksum: scanner.next_dword()?,
        })
    }
}

/// Wrapping sum of every dword in memory, skipping the checksum field
pub fn compute_checksum(memory: &Memory) -> u32 {
    let mut scanner = memory.scanner(0);
    let mut checksum = 0u32;

    while scanner.can_read_dword() {
        if scanner.address() == CHECKSUM_OFFSET {
            scanner.skip_dword();
            continue;
        }

        // can_read_dword guarantees the read succeeds
        checksum = checksum.wrapping_add(scanner.next_dword().unwrap_or(0));
    }

    checksum
}
