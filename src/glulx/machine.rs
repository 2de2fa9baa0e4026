//! Loading an image into a runnable machine

use super::header::{compute_checksum, GlulxHeader};
use crate::host::Host;
use crate::machine::{Function, Machine, MachineConfig};
use crate::memory::{Memory, ValueStack};
use crate::{Error, Result};
use std::rc::Rc;

/// A loaded story file
#[derive(Debug)]
pub struct GlulxMachine {
    header: GlulxHeader,
    machine: Machine,
    start_function: Rc<Function>,
}

impl GlulxMachine {
    /// Validates `image`, lays out memory and decodes the start function
    pub fn new(image: Vec<u8>, host: Box<dyn Host>, config: MachineConfig) -> Result<Self> {
        let mut memory = Memory::new(image);
        let header = GlulxHeader::read(&memory)?;

        if memory.size() != header.ext_start {
            return Err(Error::malformed(format!(
                "image is {} bytes but ExtStart is {}",
                memory.size(),
                header.ext_start
            )));
        }

        let checksum = compute_checksum(&memory);
        if checksum != header.checksum {
            return Err(Error::malformed(format!(
                "checksum mismatch: computed 0x{:08x}, header says 0x{:08x}",
                checksum, header.checksum
            )));
        }

        if header.stack_size % 256 != 0 {
            return Err(Error::malformed(format!(
                "stack size {} is not a multiple of 256",
                header.stack_size
            )));
        }

        memory.expand(header.end_mem).map_err(|_| {
            Error::malformed(format!(
                "EndMem 0x{:x} is below ExtStart 0x{:x}",
                header.end_mem, header.ext_start
            ))
        })?;
        memory.add_read_only_region(0, header.ram_start);

        tracing::debug!(
            "Loading glulx {} image: RAM at 0x{:x}, {} bytes of memory, {} byte stack",
            header.version,
            header.ram_start,
            header.end_mem,
            header.stack_size
        );

        let stack = ValueStack::new(header.stack_size);
        let mut machine = Machine::with_config(memory, stack, header.ram_start, host, config);
        let start_function = machine.function(header.start_func)?;

        Ok(Self {
            header,
            machine,
            start_function,
        })
    }

    /// Parsed header
    pub fn header(&self) -> &GlulxHeader {
        &self.header
    }

    /// Function at StartFunc
    pub fn start_function(&self) -> &Function {
        &self.start_function
    }

    /// Decodes (or fetches from cache) the function at `address`
    pub fn function(&mut self, address: u32) -> Result<Rc<Function>> {
        self.machine.function(address)
    }

    /// Underlying machine
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Underlying machine, mutably
    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// Calls the start function with no arguments
    pub fn run(&mut self) -> Result<u32> {
        self.machine.call_function(self.header.start_func, &[])
    }
}
