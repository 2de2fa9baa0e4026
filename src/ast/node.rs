//! IR node definitions

use serde::{Deserialize, Serialize};

/// Width of a memory access, local or conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueSize {
    /// 8-bit
    Byte,
    /// 16-bit
    Word,
    /// 32-bit
    DWord,
}

impl ValueSize {
    /// Size in bytes
    pub fn bytes(self) -> u32 {
        match self {
            ValueSize::Byte => 1,
            ValueSize::Word => 2,
            ValueSize::DWord => 4,
        }
    }

    /// Parses a locals-layout size byte
    pub fn from_bytes(size: u8) -> Option<Self> {
        match size {
            1 => Some(ValueSize::Byte),
            2 => Some(ValueSize::Word),
            4 => Some(ValueSize::DWord),
            _ => None,
        }
    }

    /// Truncates `value` to this width, optionally sign-extending back to 32 bits
    pub fn convert(self, value: u32, signed: bool) -> u32 {
        match (self, signed) {
            (ValueSize::Byte, false) => value & 0xff,
            (ValueSize::Byte, true) => value as u8 as i8 as i32 as u32,
            (ValueSize::Word, false) => value & 0xffff,
            (ValueSize::Word, true) => value as u16 as i16 as i32 as u32,
            (ValueSize::DWord, _) => value,
        }
    }
}

/// Jump target: a dense index into the owning body's label table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub usize);

impl Label {
    /// Position in the label table
    pub fn index(self) -> usize {
        self.0
    }
}

/// Function-local variable slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Local {
    /// Slot number within the call frame
    pub index: usize,
    /// Declared width
    pub size: ValueSize,
}

/// Two-operand arithmetic on 32-bit values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    /// Wrapping addition
    Add,
    /// Wrapping subtraction
    Sub,
    /// Wrapping multiplication
    Mul,
    /// Signed division truncating toward zero
    Div,
    /// Signed remainder (sign follows the dividend)
    Mod,
}

/// Signed comparison producing 1 or 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// left == right
    Eq,
    /// left != right
    Ne,
    /// left < right
    Lt,
    /// left <= right
    Le,
    /// left > right
    Gt,
    /// left >= right
    Ge,
}

/// External capability targeted by a dispatch expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchFunction {
    /// Glk I/O call: arguments are the selector and the argument count
    Glk,
}

/// IR expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// 32-bit constant
    Constant(i32),
    /// Value of a local in the current frame
    ReadLocal(Local),
    /// Memory load
    ReadMemory {
        /// Address expression
        address: Box<Expression>,
        /// Access width
        size: ValueSize,
    },
    /// Arithmetic
    Arithmetic {
        /// Operator
        op: ArithmeticOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },
    /// Comparison
    Comparison {
        /// Operator
        op: ComparisonOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },
    /// Truncation to `size`, zero- or sign-extended back to 32 bits
    Conversion {
        /// Value to convert
        value: Box<Expression>,
        /// Target width
        size: ValueSize,
        /// Sign-extend instead of zero-extend
        signed: bool,
    },
    /// Guest call with a fixed argument list
    Call {
        /// Function address
        address: Box<Expression>,
        /// Arguments, first argument first
        arguments: Vec<Expression>,
    },
    /// Guest call whose arguments are popped from the value stack at run time
    CallWithArgCount {
        /// Function address
        address: Box<Expression>,
        /// Number of stack arguments
        count: Box<Expression>,
    },
    /// Pops a dword from the value stack
    StackPop,
    /// Call into a host capability
    Dispatch {
        /// Capability
        function: DispatchFunction,
        /// Arguments, first argument first
        arguments: Vec<Expression>,
    },
    /// Current memory size
    GetMemorySize,
}

impl Expression {
    /// Constant expression
    pub fn constant(value: i32) -> Self {
        Expression::Constant(value)
    }

    /// Constant from an unsigned bit pattern
    pub fn constant_u32(value: u32) -> Self {
        Expression::Constant(value as i32)
    }

    /// Memory load
    pub fn read_memory(address: Expression, size: ValueSize) -> Self {
        Expression::ReadMemory {
            address: Box::new(address),
            size,
        }
    }

    /// Arithmetic node
    pub fn arithmetic(op: ArithmeticOp, left: Expression, right: Expression) -> Self {
        Expression::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Comparison node
    pub fn comparison(op: ComparisonOp, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Conversion node
    pub fn conversion(value: Expression, size: ValueSize, signed: bool) -> Self {
        Expression::Conversion {
            value: Box::new(value),
            size,
            signed,
        }
    }

    /// Fixed-arity call
    pub fn call(address: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Call {
            address: Box::new(address),
            arguments,
        }
    }

    /// Variable-arity call
    pub fn call_with_arg_count(address: Expression, count: Expression) -> Self {
        Expression::CallWithArgCount {
            address: Box::new(address),
            count: Box::new(count),
        }
    }

    /// `self + other`
    pub fn plus(self, other: Expression) -> Self {
        Expression::arithmetic(ArithmeticOp::Add, self, other)
    }

    /// `self - other`
    pub fn minus(self, other: Expression) -> Self {
        Expression::arithmetic(ArithmeticOp::Sub, self, other)
    }

    /// `self * other`
    pub fn times(self, other: Expression) -> Self {
        Expression::arithmetic(ArithmeticOp::Mul, self, other)
    }

    /// `self / other`
    pub fn divided_by(self, other: Expression) -> Self {
        Expression::arithmetic(ArithmeticOp::Div, self, other)
    }

    /// `self % other`
    pub fn modulo(self, other: Expression) -> Self {
        Expression::arithmetic(ArithmeticOp::Mod, self, other)
    }

    /// Direct sub-expressions in evaluation order
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Constant(_)
            | Expression::ReadLocal(_)
            | Expression::StackPop
            | Expression::GetMemorySize => Vec::new(),
            Expression::ReadMemory { address, .. } => vec![address],
            Expression::Arithmetic { left, right, .. }
            | Expression::Comparison { left, right, .. } => vec![left, right],
            Expression::Conversion { value, .. } => vec![value],
            Expression::Call { address, arguments } => {
                let mut children = Vec::with_capacity(arguments.len() + 1);
                children.push(address.as_ref());
                children.extend(arguments.iter());
                children
            }
            Expression::CallWithArgCount { address, count } => vec![address, count],
            Expression::Dispatch { arguments, .. } => arguments.iter().collect(),
        }
    }
}

/// IR statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Position of a label
    Label(Label),
    /// Evaluate and discard
    Expression(Expression),
    /// Assign a local
    WriteLocal {
        /// Target local
        local: Local,
        /// Value to store
        value: Expression,
    },
    /// Memory store
    WriteMemory {
        /// Address expression
        address: Expression,
        /// Value to store
        value: Expression,
        /// Access width
        size: ValueSize,
    },
    /// Push a dword on the value stack
    StackPush(Expression),
    /// Duplicate the top N dwords of the value stack
    StackCopy(Expression),
    /// Unconditional jump
    Jump(Label),
    /// Conditional: when `condition` is nonzero, behave like `statement`
    Branch {
        /// Condition
        condition: Expression,
        /// Guarded statement, always a `Jump` or a `Return`
        statement: Box<Statement>,
    },
    /// Return from the function
    Return(Expression),
    /// Halt the machine
    Quit,
    /// Print a character
    OutputChar(Expression),
    /// Print a signed decimal number
    OutputNumber(Expression),
    /// Print the string object at an address
    OutputString(Expression),
    /// Ask the host to restore the last undo state
    RestoreUndo,
}

impl Statement {
    /// Conditional statement
    pub fn branch(condition: Expression, statement: Statement) -> Self {
        Statement::Branch {
            condition,
            statement: Box::new(statement),
        }
    }

    /// True if control never falls through to the next statement
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Statement::Jump(_) | Statement::Return(_) | Statement::Quit
        )
    }
}
