//! Uncompressed string objects

use crate::memory::Memory;
use crate::{Error, Result};

/// NUL-terminated Latin-1 string
pub const STRING_E0: u8 = 0xE0;

/// Huffman-compressed string; needs the decoding table
pub const STRING_E1: u8 = 0xE1;

/// NUL-terminated sequence of 32-bit code points
pub const STRING_E2: u8 = 0xE2;

/// Reads the string object at `address`.
///
/// Code points that are not valid `char`s become U+FFFD.
pub fn read_string(memory: &Memory, address: u32) -> Result<String> {
    let mut scanner = memory.scanner(address);
    let mut text = String::new();

    match scanner.next_byte()? {
        STRING_E0 => loop {
            let byte = scanner.next_byte()?;
            if byte == 0 {
                break;
            }
            text.push(char::from(byte));
        },
        STRING_E2 => {
            for _ in 0..3 {
                scanner.next_byte()?;
            }
            loop {
                let code = scanner.next_dword()?;
                if code == 0 {
                    break;
                }
                text.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
        type_byte => return Err(Error::UnsupportedStringType { address, type_byte }),
    }

    Ok(text)
}
