//! Postfix execution with an explicit activation stack
//!
//! A guest call suspends the caller's [`Activation`] (its program counter and
//! the partial results of the expression it was evaluating) and starts the
//! callee in the same loop. Guest recursion therefore grows a `Vec`, never the
//! host stack, and the call-depth limit is the only bound.

use super::code::{Code, Op};
use super::evaluate::{arithmetic, compare, pop_stack_args, read_sized, write_sized};
use crate::ast::{DispatchFunction, Expression};
use crate::glulx::read_string;
use crate::machine::Machine;
use crate::{Error, Result};
use std::rc::Rc;

/// A running function or standalone expression
#[derive(Debug)]
struct Activation {
    code: Rc<Code>,
    pc: usize,
    values: Vec<u32>,
    /// Address of the function whose call frame this activation owns
    function: Option<u32>,
}

impl Activation {
    fn new(code: Rc<Code>, function: Option<u32>) -> Self {
        Self {
            code,
            pc: 0,
            values: Vec::new(),
            function,
        }
    }

    fn pop(&mut self) -> Result<u32> {
        self.values
            .pop()
            .ok_or_else(|| Error::invariant("expression operand missing"))
    }

    fn pop_many(&mut self, count: usize) -> Result<Vec<u32>> {
        let start = self
            .values
            .len()
            .checked_sub(count)
            .ok_or_else(|| Error::invariant("expression operands missing"))?;
        Ok(self.values.split_off(start))
    }

    fn jump(&mut self, label: usize) -> Result<()> {
        self.pc = self.code.block_start(label)?;
        Ok(())
    }
}

/// Why the op loop handed control back to the activation stack
#[derive(Debug)]
enum Transfer {
    /// Start a guest function
    Call { address: u32, args: Vec<u32> },
    /// Leave the current activation with a value
    Return(u32),
    /// The machine stopped; unwind
    Halt,
}

/// Runs guest code against a [`Machine`].
///
/// [`Machine::call_function`] creates one per outermost call.
pub struct Interpreter<'m> {
    machine: &'m mut Machine,
    suspended: Vec<Activation>,
}

impl<'m> Interpreter<'m> {
    /// Creates an interpreter over `machine`
    pub fn new(machine: &'m mut Machine) -> Self {
        Self {
            machine,
            suspended: Vec::new(),
        }
    }

    /// Calls the guest function at `address` and runs it to completion.
    ///
    /// Frames entered here are popped again on every exit path, so the call
    /// depth and the value stack pointer match what they were before the call.
    pub fn call(&mut self, address: u32, args: &[u32]) -> Result<u32> {
        if self.machine.is_halted() {
            return Ok(0);
        }

        let base = self.machine.call_depth();
        let function = self.machine.enter(address, args)?;
        let activation = Activation::new(Rc::clone(function.code()), Some(address));
        self.run(activation, base)
    }

    /// Evaluates `expression` in the machine's current frame
    pub fn evaluate(&mut self, expression: &Expression) -> Result<u32> {
        let base = self.machine.call_depth();
        let activation = Activation::new(Rc::new(Code::for_expression(expression)), None);
        self.run(activation, base)
    }

    fn run(&mut self, activation: Activation, base: usize) -> Result<u32> {
        let result = self.drive(activation);
        self.suspended.clear();

        if result.is_err() || self.machine.is_halted() {
            // Leave every frame entered since `base`, innermost first
            while self.machine.call_depth() > base {
                if let Err(error) = self.machine.leave() {
                    tracing::warn!("Failed to unwind call frame: {}", error);
                    break;
                }
            }
        }

        match result {
            Ok(_) if self.machine.is_halted() => Ok(0),
            other => other,
        }
    }

    fn drive(&mut self, mut current: Activation) -> Result<u32> {
        loop {
            match self.execute(&mut current)? {
                Transfer::Call { address, args } => {
                    let function = self.machine.enter(address, &args)?;
                    let callee = Activation::new(Rc::clone(function.code()), Some(address));
                    self.suspended.push(std::mem::replace(&mut current, callee));
                }
                Transfer::Return(value) => {
                    if let Some(address) = current.function {
                        self.machine.leave()?;
                        tracing::trace!("Leave 0x{:x} returning {}", address, value);
                    }
                    match self.suspended.pop() {
                        Some(caller) => {
                            current = caller;
                            current.values.push(value);
                        }
                        None => return Ok(value),
                    }
                }
                Transfer::Halt => return Ok(0),
            }
        }
    }

    /// Runs ops until the activation calls, returns or halts
    fn execute(&mut self, activation: &mut Activation) -> Result<Transfer> {
        loop {
            // Running off the last block returns 0
            let Some(&op) = activation.code.ops().get(activation.pc) else {
                return Ok(Transfer::Return(0));
            };
            activation.pc += 1;

            match op {
                Op::Constant(value) => activation.values.push(value),
                Op::ReadLocal(index) => {
                    let value = self.machine.current_frame()?.read(index)?;
                    activation.values.push(value);
                }
                Op::ReadMemory(size) => {
                    let address = activation.pop()?;
                    activation.values.push(read_sized(self.machine, address, size)?);
                }
                Op::Arithmetic(op) => {
                    let right = activation.pop()?;
                    let left = activation.pop()?;
                    activation.values.push(arithmetic(op, left, right)?);
                }
                Op::Comparison(op) => {
                    let right = activation.pop()? as i32;
                    let left = activation.pop()? as i32;
                    activation.values.push(u32::from(compare(op, left, right)));
                }
                Op::Conversion { size, signed } => {
                    let value = activation.pop()?;
                    activation.values.push(size.convert(value, signed));
                }
                Op::Call { arguments } => {
                    let args = activation.pop_many(arguments)?;
                    let address = activation.pop()?;
                    return Ok(Transfer::Call { address, args });
                }
                Op::CallWithArgCount => {
                    let count = activation.pop()?;
                    let address = activation.pop()?;
                    let args = pop_stack_args(self.machine, count)?;
                    return Ok(Transfer::Call { address, args });
                }
                Op::StackPop => {
                    let value = self.machine.stack_mut().pop_dword()?;
                    activation.values.push(value);
                }
                Op::Dispatch {
                    function,
                    arguments,
                } => {
                    let args = activation.pop_many(arguments)?;
                    let value = self.dispatch(function, &args)?;
                    activation.values.push(value);
                }
                Op::GetMemorySize => activation.values.push(self.machine.memory().size()),

                Op::Enter(_) => self.machine.count_step()?,
                Op::Discard => {
                    activation.pop()?;
                }
                Op::WriteLocal(index) => {
                    let value = activation.pop()?;
                    self.machine.current_frame_mut()?.write(index, value)?;
                }
                Op::WriteMemory(size) => {
                    let value = activation.pop()?;
                    let address = activation.pop()?;
                    write_sized(self.machine, address, value, size)?;
                }
                Op::StackPush => {
                    let value = activation.pop()?;
                    self.machine.stack_mut().push_dword(value)?;
                }
                Op::StackCopy => {
                    let count = activation.pop()?;
                    self.machine.stack_mut().copy_dwords(count)?;
                }
                Op::Jump(label) => activation.jump(label)?,
                Op::JumpIf(label) => {
                    if activation.pop()? != 0 {
                        activation.jump(label)?;
                    }
                }
                Op::SkipUnless(target) => {
                    if activation.pop()? == 0 {
                        activation.pc = target;
                    }
                }
                Op::Return => return Ok(Transfer::Return(activation.pop()?)),
                Op::Quit => {
                    self.machine.halt();
                    return Ok(Transfer::Halt);
                }
                Op::OutputChar => {
                    let ch = activation.pop()?;
                    self.machine.host_mut().stream_char(ch);
                }
                Op::OutputNumber => {
                    let number = activation.pop()?;
                    self.machine.host_mut().stream_number(number as i32);
                }
                Op::OutputString => {
                    let address = activation.pop()?;
                    let text = read_string(self.machine.memory(), address)?;
                    self.machine.host_mut().stream_string(&text);
                }
                Op::RestoreUndo => self.machine.host_mut().restore_undo()?,
            }
        }
    }

    fn dispatch(&mut self, function: DispatchFunction, args: &[u32]) -> Result<u32> {
        match function {
            DispatchFunction::Glk => match args {
                [selector, count] => {
                    let glk_args = pop_stack_args(self.machine, *count)?;
                    self.machine.host_mut().glk(*selector, &glk_args)
                }
                _ => Err(Error::invariant(format!(
                    "glk dispatch expects 2 arguments, got {}",
                    args.len()
                ))),
            },
        }
    }
}

/// Evaluates a standalone expression in the machine's current frame
pub fn evaluate_expression(machine: &mut Machine, expression: &Expression) -> Result<u32> {
    Interpreter::new(machine).evaluate(expression)
}
