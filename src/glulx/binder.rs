//! Binds decoded instructions to IR statements

use super::opcodes::{op, Opcode};
use super::operand::{Operand, OperandType};
use crate::ast::{
    ArithmeticOp, Body, BodyBuilder, ComparisonOp, DispatchFunction, Expression, Label, Local, Statement,
    ValueSize,
};
use crate::{DecodeError, Error, Result};
use std::collections::HashMap;

/// Largest constant `call` argument count bound as individual stack pops
const MAX_INLINE_ARGUMENTS: u32 = 256;

/// Translates instructions one at a time into a [`BodyBuilder`].
///
/// Every instruction address gets a label; jumps create labels for their
/// targets on demand. Labels nobody jumps to are pruned when the body is
/// finished.
pub struct InstructionBinder {
    function: u32,
    ram_start: u32,
    builder: BodyBuilder,
    locals: HashMap<u32, Local>,
    labels: HashMap<u32, Label>,
}

impl InstructionBinder {
    /// Creates a binder for the function at `function`.
    ///
    /// `locals` maps frame addresses to the locals declared in `builder`.
    pub fn new(
        function: u32,
        ram_start: u32,
        builder: BodyBuilder,
        locals: HashMap<u32, Local>,
    ) -> Self {
        Self {
            function,
            ram_start,
            builder,
            locals,
            labels: HashMap::new(),
        }
    }

    /// Finishes the body once every instruction has been bound.
    ///
    /// Fails if a jump targets an address where no instruction was decoded,
    /// such as the middle of an instruction or past the end of the function.
    pub fn into_body(self) -> Result<Body> {
        let stray = self
            .labels
            .iter()
            .filter(|(_, &label)| !self.builder.is_marked(label))
            .map(|(&address, _)| address)
            .min();

        match stray {
            Some(target) => Err(self.fail(DecodeError::InvalidBranchTarget(target))),
            None => self.builder.into_body(),
        }
    }

    fn fail(&self, error: DecodeError) -> Error {
        Error::decode(self.function, error)
    }

    fn label_at(&mut self, address: u32) -> Label {
        if let Some(&label) = self.labels.get(&address) {
            return label;
        }

        let label = self.builder.new_label();
        self.labels.insert(address, label);
        label
    }

    /// Binds one instruction located at `address`, whose successor starts at `next`
    pub fn bind(
        &mut self,
        opcode: &Opcode,
        loads: &[Operand],
        stores: &[Operand],
        address: u32,
        next: u32,
    ) -> Result<()> {
        let label = self.label_at(address);
        self.builder.mark_label(label)?;

        match (opcode.number, loads, stores) {
            (op::NOP, [], []) => Ok(()),

            (op::ADD, [l, r], [s]) => self.bind_arithmetic(ArithmeticOp::Add, l, r, s),
            (op::SUB, [l, r], [s]) => self.bind_arithmetic(ArithmeticOp::Sub, l, r, s),
            (op::MUL, [l, r], [s]) => self.bind_arithmetic(ArithmeticOp::Mul, l, r, s),
            (op::DIV, [l, r], [s]) => self.bind_arithmetic(ArithmeticOp::Div, l, r, s),
            (op::MOD, [l, r], [s]) => self.bind_arithmetic(ArithmeticOp::Mod, l, r, s),
            (op::NEG, [value], [s]) => {
                let value = self.load(value, ValueSize::DWord)?;
                self.store(s, Expression::constant(0).minus(value), ValueSize::DWord)
            }

            (op::JUMP, [offset], []) => {
                let jump = self.jump_statement(offset, next)?;
                self.builder.add_statement(jump);
                Ok(())
            }
            (op::JZ, [value, offset], []) => {
                self.bind_branch_zero(ComparisonOp::Eq, value, offset, next)
            }
            (op::JNZ, [value, offset], []) => {
                self.bind_branch_zero(ComparisonOp::Ne, value, offset, next)
            }
            (op::JEQ, [l, r, offset], []) => self.bind_branch(ComparisonOp::Eq, l, r, offset, next),
            (op::JNE, [l, r, offset], []) => self.bind_branch(ComparisonOp::Ne, l, r, offset, next),
            (op::JLT, [l, r, offset], []) => self.bind_branch(ComparisonOp::Lt, l, r, offset, next),
            (op::JGE, [l, r, offset], []) => self.bind_branch(ComparisonOp::Ge, l, r, offset, next),
            (op::JGT, [l, r, offset], []) => self.bind_branch(ComparisonOp::Gt, l, r, offset, next),
            (op::JLE, [l, r, offset], []) => self.bind_branch(ComparisonOp::Le, l, r, offset, next),

            (op::CALL, [address, count], [s]) => self.bind_call(address, count, s),
            (op::CALLF, [address], [s]) => self.bind_call_fixed(address, &[], s),
            (op::CALLFI, [address, args @ ..], [s]) if args.len() == 1 => {
                self.bind_call_fixed(address, args, s)
            }
            (op::CALLFII, [address, args @ ..], [s]) if args.len() == 2 => {
                self.bind_call_fixed(address, args, s)
            }
            (op::CALLFIII, [address, args @ ..], [s]) if args.len() == 3 => {
                self.bind_call_fixed(address, args, s)
            }
            (op::RETURN, [value], []) => {
                let value = self.load(value, ValueSize::DWord)?;
                self.builder.add_statement(Statement::Return(value));
                Ok(())
            }

            (op::COPY, [source], [s]) => self.bind_copy(source, s, ValueSize::DWord),
            (op::COPYS, [source], [s]) => self.bind_copy(source, s, ValueSize::Word),
            (op::COPYB, [source], [s]) => self.bind_copy(source, s, ValueSize::Byte),
            (op::SEXS, [source], [s]) => self.bind_sign_extend(source, s, ValueSize::Word),
            (op::SEXB, [source], [s]) => self.bind_sign_extend(source, s, ValueSize::Byte),

            (op::ALOAD, [base, offset], [s]) => self.bind_read(base, offset, s, ValueSize::DWord),
            (op::ALOADS, [base, offset], [s]) => self.bind_read(base, offset, s, ValueSize::Word),
            (op::ALOADB, [base, offset], [s]) => self.bind_read(base, offset, s, ValueSize::Byte),
            (op::ASTORE, [base, offset, value], []) => {
                self.bind_write(base, offset, value, ValueSize::DWord)
            }
            (op::ASTORES, [base, offset, value], []) => {
                self.bind_write(base, offset, value, ValueSize::Word)
            }
            (op::ASTOREB, [base, offset, value], []) => {
                self.bind_write(base, offset, value, ValueSize::Byte)
            }

            (op::STKCOPY, [count], []) => {
                let count = self.load(count, ValueSize::DWord)?;
                self.builder.add_statement(Statement::StackCopy(count));
                Ok(())
            }

            (op::STREAMCHAR | op::STREAMUNICHAR, [ch], []) => {
                let ch = self.load(ch, ValueSize::DWord)?;
                self.builder.add_statement(Statement::OutputChar(ch));
                Ok(())
            }
            (op::STREAMNUM, [number], []) => {
                let number = self.load(number, ValueSize::DWord)?;
                self.builder.add_statement(Statement::OutputNumber(number));
                Ok(())
            }
            (op::STREAMSTR, [address], []) => {
                let address = self.load(address, ValueSize::DWord)?;
                self.builder.add_statement(Statement::OutputString(address));
                Ok(())
            }

            (op::GETMEMSIZE, [], [s]) => self.store(s, Expression::GetMemorySize, ValueSize::DWord),
            (op::QUIT, [], []) => {
                self.builder.add_statement(Statement::Quit);
                Ok(())
            }
            // The result operand is only written when the restore fails, which the host reports as an error
            (op::RESTOREUNDO, [], [_]) => {
                self.builder.add_statement(Statement::RestoreUndo);
                Ok(())
            }
            (op::GLK, [selector, count], [s]) => {
                let selector = self.load(selector, ValueSize::DWord)?;
                let count = self.load(count, ValueSize::DWord)?;
                let dispatch = Expression::Dispatch {
                    function: DispatchFunction::Glk,
                    arguments: vec![selector, count],
                };
                self.store(s, dispatch, ValueSize::DWord)
            }

            _ => Err(self.fail(DecodeError::UnsupportedOpcode {
                name: opcode.name,
                number: opcode.number,
            })),
        }
    }

    fn load(&self, operand: &Operand, size: ValueSize) -> Result<Expression> {
        let value = operand.value;
        Ok(match operand.kind {
            OperandType::Constant => Expression::constant_u32(value),
            OperandType::Address => Expression::read_memory(Expression::constant_u32(value), size),
            OperandType::Stack => Expression::StackPop,
            OperandType::LocalAddress => Expression::ReadLocal(self.local(value)?),
            OperandType::RamAddress => Expression::read_memory(self.ram_address(value), size),
        })
    }

    fn store(&mut self, operand: &Operand, value: Expression, size: ValueSize) -> Result<()> {
        let statement = match operand.kind {
            OperandType::Constant if operand.value == 0 => Statement::Expression(value),
            OperandType::Constant => {
                return Err(self.fail(DecodeError::InvalidStoreTarget(operand.value)))
            }
            OperandType::Address => Statement::WriteMemory {
                address: Expression::constant_u32(operand.value),
                value,
                size,
            },
            OperandType::Stack => Statement::StackPush(value),
            OperandType::LocalAddress => Statement::WriteLocal {
                local: self.local(operand.value)?,
                value,
            },
            OperandType::RamAddress => Statement::WriteMemory {
                address: self.ram_address(operand.value),
                value,
                size,
            },
        };

        self.builder.add_statement(statement);
        Ok(())
    }

    fn local(&self, address: u32) -> Result<Local> {
        self.locals
            .get(&address)
            .copied()
            .ok_or_else(|| self.fail(DecodeError::UnknownLocal(address)))
    }

    fn ram_address(&self, offset: u32) -> Expression {
        Expression::constant_u32(self.ram_start).plus(Expression::constant_u32(offset))
    }

    /// Builds the statement a branch offset stands for: offsets 0 and 1 return
    /// that value, anything else jumps relative to the next instruction
    fn jump_statement(&mut self, offset: &Operand, next: u32) -> Result<Statement> {
        if offset.kind != OperandType::Constant {
            return Err(self.fail(DecodeError::NonConstantJumpOffset(offset.kind.name())));
        }

        match offset.value {
            0 | 1 => Ok(Statement::Return(Expression::constant_u32(offset.value))),
            value => {
                let target = next.wrapping_add(value).wrapping_sub(2);
                Ok(Statement::Jump(self.label_at(target)))
            }
        }
    }

    fn bind_arithmetic(
        &mut self,
        op: ArithmeticOp,
        left: &Operand,
        right: &Operand,
        store: &Operand,
    ) -> Result<()> {
        let left = self.load(left, ValueSize::DWord)?;
        let right = self.load(right, ValueSize::DWord)?;
        self.store(
            store,
            Expression::arithmetic(op, left, right),
            ValueSize::DWord,
        )
    }

    fn bind_branch(
        &mut self,
        op: ComparisonOp,
        left: &Operand,
        right: &Operand,
        offset: &Operand,
        next: u32,
    ) -> Result<()> {
        let left = self.load(left, ValueSize::DWord)?;
        let right = self.load(right, ValueSize::DWord)?;
        let statement = self.jump_statement(offset, next)?;
        self.builder.add_statement(Statement::branch(
            Expression::comparison(op, left, right),
            statement,
        ));
        Ok(())
    }

    fn bind_branch_zero(
        &mut self,
        op: ComparisonOp,
        value: &Operand,
        offset: &Operand,
        next: u32,
    ) -> Result<()> {
        let value = self.load(value, ValueSize::DWord)?;
        let statement = self.jump_statement(offset, next)?;
        self.builder.add_statement(Statement::branch(
            Expression::comparison(op, value, Expression::constant(0)),
            statement,
        ));
        Ok(())
    }

    fn bind_call(&mut self, address: &Operand, count: &Operand, store: &Operand) -> Result<()> {
        // Larger constant counts are checked against the stack when the call runs
        let inline = count.kind == OperandType::Constant && count.value <= MAX_INLINE_ARGUMENTS;
        let call = if inline {
            let arguments = (0..count.value).map(|_| Expression::StackPop).collect();
            Expression::call(self.load(address, ValueSize::DWord)?, arguments)
        } else {
            Expression::call_with_arg_count(
                self.load(address, ValueSize::DWord)?,
                self.load(count, ValueSize::DWord)?,
            )
        };
        self.store(store, call, ValueSize::DWord)
    }

    fn bind_call_fixed(
        &mut self,
        address: &Operand,
        args: &[Operand],
        store: &Operand,
    ) -> Result<()> {
        let address = self.load(address, ValueSize::DWord)?;
        let arguments = args
            .iter()
            .map(|arg| self.load(arg, ValueSize::DWord))
            .collect::<Result<Vec<_>>>()?;
        self.store(store, Expression::call(address, arguments), ValueSize::DWord)
    }

    fn bind_copy(&mut self, source: &Operand, store: &Operand, size: ValueSize) -> Result<()> {
        let value = self.load(source, size)?;
        let needs_conversion = match &value {
            Expression::ReadLocal(local) => local.size != size,
            _ => size != ValueSize::DWord,
        };
        let value = if needs_conversion {
            Expression::conversion(value, size, false)
        } else {
            value
        };
        self.store(store, value, size)
    }

    fn bind_sign_extend(&mut self, source: &Operand, store: &Operand, size: ValueSize) -> Result<()> {
        let value = self.load(source, ValueSize::DWord)?;
        self.store(
            store,
            Expression::conversion(value, size, true),
            ValueSize::DWord,
        )
    }

    fn element_address(base: Expression, offset: Expression, size: ValueSize) -> Expression {
        match size {
            ValueSize::Byte => base.plus(offset),
            _ => base.plus(offset.times(Expression::constant_u32(size.bytes()))),
        }
    }

    fn bind_read(
        &mut self,
        base: &Operand,
        offset: &Operand,
        store: &Operand,
        size: ValueSize,
    ) -> Result<()> {
        let base = self.load(base, ValueSize::DWord)?;
        let offset = self.load(offset, ValueSize::DWord)?;
        let address = Self::element_address(base, offset, size);
        self.store(
            store,
            Expression::read_memory(address, size),
            ValueSize::DWord,
        )
    }

    fn bind_write(
        &mut self,
        base: &Operand,
        offset: &Operand,
        value: &Operand,
        size: ValueSize,
    ) -> Result<()> {
        let base = self.load(base, ValueSize::DWord)?;
        let offset = self.load(offset, ValueSize::DWord)?;
        let value = self.load(value, ValueSize::DWord)?;
        self.builder.add_statement(Statement::WriteMemory {
            address: Self::element_address(base, offset, size),
            value,
            size,
        });
        Ok(())
    }
}
