use crate::ast::Local;
use crate::{Error, Result};

/// Local storage for one function invocation
#[derive(Debug, Clone)]
pub struct CallFrame {
    locals: Vec<Local>,
    values: Vec<u32>,
    stack_pointer: u32,
}

impl CallFrame {
    /// Creates a frame with every local zeroed
    pub fn new(locals: &[Local], stack_pointer: u32) -> Self {
        Self {
            locals: locals.to_vec(),
            values: vec![0; locals.len()],
            stack_pointer,
        }
    }

    /// Value-stack pointer when the frame was created
    pub fn stack_pointer(&self) -> u32 {
        self.stack_pointer
    }

    /// Number of locals
    pub fn local_count(&self) -> usize {
        self.values.len()
    }

    /// Reads a local
    pub fn read(&self, index: usize) -> Result<u32> {
        self.values
            .get(index)
            .copied()
            .ok_or(Error::LocalOutOfRange {
                index,
                count: self.values.len(),
            })
    }

    /// Writes a local, truncating to its declared width
    pub fn write(&mut self, index: usize, value: u32) -> Result<()> {
        let count = self.values.len();
        match (self.locals.get(index), self.values.get_mut(index)) {
            (Some(local), Some(slot)) => {
                *slot = local.size.convert(value, false);
                Ok(())
            }
            _ => Err(Error::LocalOutOfRange { index, count }),
        }
    }
}
