//! Shared helpers for integration tests: a tiny Glulx assembler and an
//! image builder that fills in the header and checksum.

#![allow(dead_code)]

use ifvm::glulx::{compute_checksum, CHECKSUM_OFFSET, HEADER_SIZE, MAGIC_NUMBER};
use ifvm::memory::Memory;
use ifvm::{GlulxMachine, MachineConfig, RecordingHost};

pub use ifvm::glulx::opcodes::op;

/// Byte that is not an opcode; ends a function's instruction stream
pub const STOP: u8 = 0x7F;

/// Instruction operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    /// Constant, encoded in the smallest width that holds it
    Const(i32),
    /// Constant always encoded in four bytes
    Wide(i32),
    /// Absolute memory address
    Addr(u32),
    /// Push or pop the value stack
    Stack,
    /// Frame address of a local
    Local(u32),
    /// Offset from RAM start
    Ram(u32),
}

/// Store target that throws the result away
pub const DISCARD: Arg = Arg::Const(0);

impl Arg {
    fn encode(self) -> (u8, Vec<u8>) {
        match self {
            Arg::Const(0) => (0x0, vec![]),
            Arg::Const(v) if v as i8 as i32 == v => (0x1, vec![v as u8]),
            Arg::Const(v) if v as i16 as i32 == v => (0x2, (v as i16).to_be_bytes().to_vec()),
            Arg::Const(v) | Arg::Wide(v) => (0x3, v.to_be_bytes().to_vec()),
            Arg::Addr(address) => unsigned(0x5, address),
            Arg::Stack => (0x8, vec![]),
            Arg::Local(address) => unsigned(0x9, address),
            Arg::Ram(offset) => unsigned(0xD, offset),
        }
    }
}

fn unsigned(mode: u8, value: u32) -> (u8, Vec<u8>) {
    if value <= 0xFF {
        (mode, vec![value as u8])
    } else if value <= 0xFFFF {
        (mode + 1, (value as u16).to_be_bytes().to_vec())
    } else {
        (mode + 2, value.to_be_bytes().to_vec())
    }
}

fn opcode_bytes(number: u32) -> Vec<u8> {
    if number < 0x80 {
        vec![number as u8]
    } else if number < 0x4000 {
        ((number | 0x8000) as u16).to_be_bytes().to_vec()
    } else {
        (number | 0xC000_0000).to_be_bytes().to_vec()
    }
}

/// A jump offset waiting for its target
#[derive(Debug)]
#[must_use]
pub struct Fixup {
    at: usize,
    next: u32,
}

/// Emits code starting at a fixed address
#[derive(Debug, Clone)]
pub struct Assembler {
    base: u32,
    bytes: Vec<u8>,
}

impl Assembler {
    /// Assembler for code placed right after the image header
    pub fn new() -> Self {
        Self::at(HEADER_SIZE)
    }

    /// Assembler for code placed at `base`
    pub fn at(base: u32) -> Self {
        Self {
            base,
            bytes: Vec::new(),
        }
    }

    /// Address of the next byte emitted
    pub fn address(&self) -> u32 {
        self.base + self.bytes.len() as u32
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Starts a stack-argument function; returns its address
    pub fn stack_function(&mut self, locals: &[(u8, u8)]) -> u32 {
        self.function(0xC0, locals)
    }

    /// Starts a local-argument function; returns its address
    pub fn local_function(&mut self, locals: &[(u8, u8)]) -> u32 {
        self.function(0xC1, locals)
    }

    fn function(&mut self, kind: u8, locals: &[(u8, u8)]) -> u32 {
        let address = self.address();
        self.bytes.push(kind);
        for &(size, count) in locals {
            self.bytes.extend_from_slice(&[size, count]);
        }
        self.bytes.extend_from_slice(&[0, 0]);
        address
    }

    /// Ends the current function
    pub fn end(&mut self) -> &mut Self {
        self.bytes.push(STOP);
        self
    }

    /// Emits raw bytes; returns their address
    pub fn raw(&mut self, bytes: &[u8]) -> u32 {
        let address = self.address();
        self.bytes.extend_from_slice(bytes);
        address
    }

    /// Emits a Latin-1 string object; returns its address
    pub fn string(&mut self, text: &str) -> u32 {
        let address = self.raw(&[0xE0]);
        self.bytes.extend(text.chars().map(|c| c as u8));
        self.bytes.push(0);
        address
    }

    /// Emits one instruction
    pub fn op(&mut self, number: u32, args: &[Arg]) -> &mut Self {
        self.bytes.extend(opcode_bytes(number));

        let encoded: Vec<(u8, Vec<u8>)> = args.iter().map(|arg| arg.encode()).collect();
        for pair in encoded.chunks(2) {
            let low = pair[0].0;
            let high = pair.get(1).map_or(0, |(mode, _)| *mode);
            self.bytes.push(low | (high << 4));
        }
        for (_, data) in encoded {
            self.bytes.extend(data);
        }
        self
    }

    /// Emits a jump-family instruction whose final operand is a branch
    /// offset to be patched later
    pub fn branch(&mut self, number: u32, args: &[Arg]) -> Fixup {
        let mut args = args.to_vec();
        args.push(Arg::Wide(0));
        self.op(number, &args);
        Fixup {
            at: self.bytes.len() - 4,
            next: self.address(),
        }
    }

    /// Points `fixup` at the next instruction emitted
    pub fn bind(&mut self, fixup: Fixup) {
        let target = self.address();
        self.patch(fixup, target);
    }

    /// Points `fixup` at `target`
    pub fn patch(&mut self, fixup: Fixup, target: u32) {
        let offset = target.wrapping_sub(fixup.next).wrapping_add(2);
        self.bytes[fixup.at..fixup.at + 4].copy_from_slice(&offset.to_be_bytes());
    }

    /// Memory holding only this code, starting at address 0 when `base` is 0
    pub fn memory(&self) -> Memory {
        let mut bytes = vec![0; self.base as usize];
        bytes.extend_from_slice(&self.bytes);
        Memory::new(bytes)
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

fn round_up(value: u32) -> u32 {
    value.div_ceil(256) * 256
}

/// A finished story file
#[derive(Debug, Clone)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub ram_start: u32,
    pub ext_start: u32,
    pub end_mem: u32,
}

/// Lays out header, code (ROM) and `ram`, each padded to 256 bytes, with
/// 256 bytes of zeroed memory past the end of the file
pub fn build_image(code: &Assembler, start_func: u32, ram: &[u8], stack_size: u32) -> Image {
    let ram_start = round_up(HEADER_SIZE + code.bytes().len() as u32);
    let ext_start = ram_start + round_up(ram.len().max(1) as u32);
    let end_mem = ext_start + 256;

    let mut bytes = Vec::with_capacity(ext_start as usize);
    for value in [
        MAGIC_NUMBER,
        0x0003_0102,
        ram_start,
        ext_start,
        end_mem,
        stack_size,
        start_func,
        0,
        0,
    ] {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    bytes.extend_from_slice(code.bytes());
    bytes.resize(ram_start as usize, 0);
    bytes.extend_from_slice(ram);
    bytes.resize(ext_start as usize, 0);

    let checksum = compute_checksum(&Memory::new(bytes.clone()));
    let at = CHECKSUM_OFFSET as usize;
    bytes[at..at + 4].copy_from_slice(&checksum.to_be_bytes());

    Image {
        bytes,
        ram_start,
        ext_start,
        end_mem,
    }
}

/// Image whose only RAM is zeroes and whose stack holds 1 KiB
pub fn simple_image(code: &Assembler, start_func: u32) -> Image {
    build_image(code, start_func, &[], 1024)
}

/// Loads `image` with a recording host; returns the machine and a handle to the host's log
pub fn load(image: &Image) -> (GlulxMachine, RecordingHost) {
    load_with(image, RecordingHost::new(), MachineConfig::default())
}

pub fn load_with(
    image: &Image,
    host: RecordingHost,
    config: MachineConfig,
) -> (GlulxMachine, RecordingHost) {
    let vm = GlulxMachine::new(image.bytes.clone(), Box::new(host.clone()), config)
        .expect("image should load");
    (vm, host)
}
