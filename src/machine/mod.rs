//! # Machine state
//!
//! [`Machine`] owns everything a running program touches: memory, the value
//! stack, the call-frame stack, the decoded-function cache and the host.
//! [`Machine::call_function`] decodes the callee on first use and runs it
//! with an [`Interpreter`](crate::execution::Interpreter), which pushes and
//! pops frames here as guest calls come and go.

mod call_frame;
mod config;
mod function;

pub use call_frame::CallFrame;
pub use config::MachineConfig;
pub use function::{Function, FunctionKind};

use crate::execution::Interpreter;
use crate::glulx::read_function;
use crate::host::Host;
use crate::memory::{Memory, ValueStack};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Execution state shared by every function invocation
pub struct Machine {
    memory: Memory,
    stack: ValueStack,
    ram_start: u32,
    functions: HashMap<u32, Rc<Function>>,
    frames: Vec<CallFrame>,
    host: Box<dyn Host>,
    config: MachineConfig,
    steps: u64,
    halted: bool,
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("memory_size", &self.memory.size())
            .field("stack_pointer", &self.stack.pointer())
            .field("ram_start", &self.ram_start)
            .field("functions", &self.functions.len())
            .field("call_depth", &self.frames.len())
            .field("config", &self.config)
            .field("steps", &self.steps)
            .field("halted", &self.halted)
            .finish()
    }
}

impl Machine {
    /// Creates a machine with default limits
    pub fn new(memory: Memory, stack: ValueStack, ram_start: u32, host: Box<dyn Host>) -> Self {
        Self::with_config(memory, stack, ram_start, host, MachineConfig::default())
    }

    /// Creates a machine with custom limits
    pub fn with_config(
        memory: Memory,
        stack: ValueStack,
        ram_start: u32,
        host: Box<dyn Host>,
        config: MachineConfig,
    ) -> Self {
        Self {
            memory,
            stack,
            ram_start,
            functions: HashMap::new(),
            frames: Vec::new(),
            host,
            config,
            steps: 0,
            halted: false,
        }
    }

    /// Guest memory
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Guest memory, mutably
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Value stack
    pub fn stack(&self) -> &ValueStack {
        &self.stack
    }

    /// Value stack, mutably
    pub fn stack_mut(&mut self) -> &mut ValueStack {
        &mut self.stack
    }

    /// Start of writable memory; RAM-relative operands are offset by this
    pub fn ram_start(&self) -> u32 {
        self.ram_start
    }

    /// Host capabilities
    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    /// Execution limits
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Number of active call frames
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    /// Blocks dispatched so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// True once the guest executed `quit`
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Stops the machine; running functions unwind without executing further statements
    pub fn halt(&mut self) {
        if !self.halted {
            tracing::warn!("Machine halted after {} steps", self.steps);
        }
        self.halted = true;
    }

    /// Innermost call frame
    pub fn current_frame(&self) -> Result<&CallFrame> {
        self.frames
            .last()
            .ok_or_else(|| Error::invariant("no active call frame"))
    }

    /// Innermost call frame, mutably
    pub fn current_frame_mut(&mut self) -> Result<&mut CallFrame> {
        self.frames
            .last_mut()
            .ok_or_else(|| Error::invariant("no active call frame"))
    }

    /// True if the function at `address` has been decoded
    pub fn is_cached(&self, address: u32) -> bool {
        self.functions.contains_key(&address)
    }

    /// Returns the function at `address`, decoding and caching it on first use
    pub fn function(&mut self, address: u32) -> Result<Rc<Function>> {
        if let Some(function) = self.functions.get(&address) {
            return Ok(Rc::clone(function));
        }

        let function = Rc::new(read_function(&self.memory, address, self.ram_start)?);
        tracing::debug!(
            "Decoded {} function at 0x{:x}: {} statements, {} labels",
            function.kind(),
            address,
            function.body().statements().len(),
            function.body().label_count()
        );

        self.functions.insert(address, Rc::clone(&function));
        Ok(function)
    }

    /// Counts one block dispatch against the step budget
    pub(crate) fn count_step(&mut self) -> Result<()> {
        self.steps += 1;
        if let Some(limit) = self.config.max_steps {
            if self.steps > limit {
                tracing::warn!("Step limit of {} blocks exceeded", limit);
                return Err(Error::StepLimitExceeded { limit });
            }
        }
        Ok(())
    }

    /// Calls the guest function at `address` and returns its result
    pub fn call_function(&mut self, address: u32, args: &[u32]) -> Result<u32> {
        Interpreter::new(self).call(address, args)
    }

    /// Pushes a call frame for the function at `address` and passes `args`
    /// according to its calling convention
    pub(crate) fn enter(&mut self, address: u32, args: &[u32]) -> Result<Rc<Function>> {
        if self.frames.len() >= self.config.max_call_depth {
            tracing::warn!(
                "Call depth limit of {} exceeded calling 0x{:x}",
                self.config.max_call_depth,
                address
            );
            return Err(Error::CallDepthExceeded {
                limit: self.config.max_call_depth,
            });
        }

        let function = self.function(address)?;
        let stack_pointer = self.stack.pointer();
        let mut frame = CallFrame::new(function.body().locals(), stack_pointer);

        match function.kind() {
            FunctionKind::StackArgument => {
                let pushed = args
                    .iter()
                    .rev()
                    .copied()
                    .chain([args.len() as u32])
                    .try_for_each(|value| self.stack.push_dword(value));
                if let Err(error) = pushed {
                    self.stack.restore_pointer(stack_pointer)?;
                    return Err(error);
                }
            }
            FunctionKind::LocalArgument => {
                let count = frame.local_count().min(args.len());
                for (index, &arg) in args[..count].iter().enumerate() {
                    frame.write(index, arg)?;
                }
            }
        }

        tracing::trace!("Enter 0x{:x} with {} args", address, args.len());
        self.frames.push(frame);
        Ok(function)
    }

    /// Pops the innermost call frame and drops everything its function left
    /// on the value stack
    pub(crate) fn leave(&mut self) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| Error::invariant("no call frame to leave"))?;
        self.stack.restore_pointer(frame.stack_pointer())
    }
}
