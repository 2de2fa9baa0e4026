//! Flat postfix form of a function body
//!
//! Each block of the control flow graph is laid out in label order, so
//! falling off the end of one block runs straight into the next. Expressions
//! are flattened children-first, which lets the interpreter suspend a caller
//! in the middle of an expression when it reaches a guest call and resume it
//! later from a saved program counter.

use crate::ast::{
    ArithmeticOp, Body, ComparisonOp, DispatchFunction, Expression, Statement, ValueSize,
};
use crate::flow::{BlockId, ControlFlowGraph};
use crate::{Error, Result};

/// One postfix instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Push a constant
    Constant(u32),
    /// Push a local of the current frame
    ReadLocal(usize),
    /// Pop an address, push the value loaded from it
    ReadMemory(ValueSize),
    /// Pop right then left, push the result
    Arithmetic(ArithmeticOp),
    /// Pop right then left, push 1 or 0
    Comparison(ComparisonOp),
    /// Pop a value, push it truncated and optionally sign-extended
    Conversion {
        /// Target width
        size: ValueSize,
        /// Sign-extend back to 32 bits
        signed: bool,
    },
    /// Pop the arguments then the address, call the guest function
    Call {
        /// Number of arguments
        arguments: usize,
    },
    /// Pop a count then an address; the arguments come off the value stack
    CallWithArgCount,
    /// Push a dword popped from the value stack
    StackPop,
    /// Pop the arguments and call the host
    Dispatch {
        /// Host capability
        function: DispatchFunction,
        /// Number of arguments
        arguments: usize,
    },
    /// Push the memory size
    GetMemorySize,

    /// Start of the block for this label; counts one step
    Enter(usize),
    /// Drop the top value
    Discard,
    /// Pop a value into a local
    WriteLocal(usize),
    /// Pop a value then an address, store the value
    WriteMemory(ValueSize),
    /// Pop a value onto the value stack
    StackPush,
    /// Pop a count, duplicate that many dwords on the value stack
    StackCopy,
    /// Continue at the block for this label
    Jump(usize),
    /// Pop a condition, jump to the label's block if it is non-zero
    JumpIf(usize),
    /// Pop a condition, continue at this op index if it is zero
    SkipUnless(usize),
    /// Pop the return value and leave the function
    Return,
    /// Halt the machine
    Quit,
    /// Pop a code point and print it
    OutputChar,
    /// Pop a number and print it
    OutputNumber,
    /// Pop a string address and print the string
    OutputString,
    /// Ask the host to restore undo state
    RestoreUndo,
}

/// Postfix program for one function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Code {
    ops: Vec<Op>,
    /// Op index of each label's block
    blocks: Vec<usize>,
}

enum Task<'a> {
    Visit(&'a Expression),
    Emit(&'a Expression),
}

impl Code {
    /// Lays out every block of `graph` in label order
    pub fn compile(body: &Body, graph: &ControlFlowGraph) -> Result<Self> {
        let mut code = Code {
            ops: Vec::new(),
            blocks: vec![0; body.label_count()],
        };

        for block in graph.blocks() {
            let BlockId::Label(index) = block.id else {
                continue;
            };

            let start = code.ops.len();
            let slot = code
                .blocks
                .get_mut(index)
                .ok_or_else(|| Error::invariant(format!("block {} has no label", block.id)))?;
            *slot = start;

            let statements = body
                .statements()
                .get(block.statements.clone())
                .ok_or_else(|| Error::invariant(format!("block {} is out of range", block.id)))?;
            for statement in statements {
                code.statement(statement)?;
            }
        }

        Ok(code)
    }

    /// Program that evaluates `expression` and returns its value
    pub fn for_expression(expression: &Expression) -> Self {
        let mut code = Code::default();
        code.expression(expression);
        code.ops.push(Op::Return);
        code
    }

    /// All ops
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Op index where the block for `label` begins
    pub fn block_start(&self, label: usize) -> Result<usize> {
        self.blocks
            .get(label)
            .copied()
            .ok_or_else(|| Error::invariant(format!("jump to missing label {}", label)))
    }

    fn statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Label(label) => self.ops.push(Op::Enter(label.index())),
            Statement::Expression(value) => {
                self.expression(value);
                self.ops.push(Op::Discard);
            }
            Statement::WriteLocal { local, value } => {
                self.expression(value);
                self.ops.push(Op::WriteLocal(local.index));
            }
            Statement::WriteMemory {
                address,
                value,
                size,
            } => {
                self.expression(address);
                self.expression(value);
                self.ops.push(Op::WriteMemory(*size));
            }
            Statement::StackPush(value) => {
                self.expression(value);
                self.ops.push(Op::StackPush);
            }
            Statement::StackCopy(count) => {
                self.expression(count);
                self.ops.push(Op::StackCopy);
            }
            Statement::Jump(label) => self.ops.push(Op::Jump(label.index())),
            Statement::Branch {
                condition,
                statement,
            } => {
                self.expression(condition);
                match statement.as_ref() {
                    Statement::Jump(label) => self.ops.push(Op::JumpIf(label.index())),
                    Statement::Return(value) => {
                        let skip = self.ops.len();
                        self.ops.push(Op::SkipUnless(0));
                        self.expression(value);
                        self.ops.push(Op::Return);
                        self.ops[skip] = Op::SkipUnless(self.ops.len());
                    }
                    other => {
                        return Err(Error::invariant(format!(
                            "branch guards {:?}, expected a jump or return",
                            other
                        )))
                    }
                }
            }
            Statement::Return(value) => {
                self.expression(value);
                self.ops.push(Op::Return);
            }
            Statement::Quit => self.ops.push(Op::Quit),
            Statement::OutputChar(value) => {
                self.expression(value);
                self.ops.push(Op::OutputChar);
            }
            Statement::OutputNumber(value) => {
                self.expression(value);
                self.ops.push(Op::OutputNumber);
            }
            Statement::OutputString(address) => {
                self.expression(address);
                self.ops.push(Op::OutputString);
            }
            Statement::RestoreUndo => self.ops.push(Op::RestoreUndo),
        }
        Ok(())
    }

    /// Flattens an expression tree without recursing
    fn expression(&mut self, expression: &Expression) {
        let mut tasks = vec![Task::Visit(expression)];

        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit(node) => {
                    tasks.push(Task::Emit(node));
                    // Right-to-left so the leftmost child is emitted first
                    for child in node.children().into_iter().rev() {
                        tasks.push(Task::Visit(child));
                    }
                }
                Task::Emit(node) => self.ops.push(value_op(node)),
            }
        }
    }
}

fn value_op(node: &Expression) -> Op {
    match node {
        Expression::Constant(value) => Op::Constant(*value as u32),
        Expression::ReadLocal(local) => Op::ReadLocal(local.index),
        Expression::ReadMemory { size, .. } => Op::ReadMemory(*size),
        Expression::Arithmetic { op, .. } => Op::Arithmetic(*op),
        Expression::Comparison { op, .. } => Op::Comparison(*op),
        Expression::Conversion { size, signed, .. } => Op::Conversion {
            size: *size,
            signed: *signed,
        },
        Expression::Call { arguments, .. } => Op::Call {
            arguments: arguments.len(),
        },
        Expression::CallWithArgCount { .. } => Op::CallWithArgCount,
        Expression::StackPop => Op::StackPop,
        Expression::Dispatch {
            function,
            arguments,
        } => Op::Dispatch {
            function: *function,
            arguments: arguments.len(),
        },
        Expression::GetMemorySize => Op::GetMemorySize,
    }
}
