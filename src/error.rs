//! Error types for the ifvm virtual machine

use thiserror::Error;

/// Reasons a function could not be decoded from memory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Type byte lies in the function range (0xC0-0xDF) but is not a known calling convention
    #[error("Unknown function type: 0x{0:02x}")]
    UnknownFunctionType(u8),

    /// Type byte does not introduce a function at all
    #[error("Non-function: 0x{0:02x}")]
    NotAFunction(u8),

    /// Locals layout declared a size other than 1, 2 or 4 bytes
    #[error("Invalid value for local size: {0}")]
    InvalidLocalSize(u8),

    /// Operand mode nibble has no meaning
    #[error("Invalid operand mode: 0x{0:x}")]
    InvalidOperandMode(u8),

    /// Opcode exists in the table but cannot be bound to IR
    #[error("Unsupported opcode: {name} (0x{number:x})")]
    UnsupportedOpcode {
        /// Opcode mnemonic
        name: &'static str,
        /// Opcode number
        number: u32,
    },

    /// Branch offsets must be encoded as constants
    #[error("Unexpected operand kind for jump offset: {0}")]
    NonConstantJumpOffset(&'static str),

    /// Store operand was a non-zero constant
    #[error("Store operand cannot be a non-zero constant: {0}")]
    InvalidStoreTarget(u32),

    /// Operand referenced a local-frame address with no declared local
    #[error("No local declared at frame address {0}")]
    UnknownLocal(u32),

    /// A jump lands somewhere no decoded instruction starts
    #[error("Branch target 0x{0:x} is not the start of an instruction")]
    InvalidBranchTarget(u32),
}

impl DecodeError {
    /// True when the byte at the function address was not a recognized calling convention
    pub fn is_bad_function_type(&self) -> bool {
        matches!(
            self,
            DecodeError::UnknownFunctionType(_) | DecodeError::NotAFunction(_)
        )
    }
}

/// Virtual machine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Image errors
    /// Story file image is not loadable
    ///
    /// **Triggered by:** bad magic number, checksum mismatch, ExtStart not equal to the
    /// image length, or a stack size that is not a multiple of 256
    #[error("Malformed image: {reason}")]
    MalformedImage {
        /// What was wrong with the image
        reason: String,
    },

    /// Function at `address` could not be decoded
    #[error("Failed to decode function at 0x{address:x}: {error}")]
    Decode {
        /// Address of the function being decoded
        address: u32,
        /// Underlying decode failure
        #[source]
        error: DecodeError,
    },

    // Memory errors
    /// Access outside the valid memory range
    #[error("Address 0x{address:x} (size {size}) is out of range for memory of length {length}")]
    OutOfRange {
        /// Requested address
        address: u32,
        /// Access width in bytes
        size: u32,
        /// Current memory length
        length: u32,
    },

    /// Write intersecting a write-protected region
    #[error("Write to 0x{address:x} (size {size}) overlaps read-only region [0x{start:x}, 0x{end:x})")]
    ReadOnlyViolation {
        /// Requested address
        address: u32,
        /// Access width in bytes
        size: u32,
        /// Protected region start
        start: u32,
        /// Protected region end (exclusive)
        end: u32,
    },

    /// Memory can only grow
    #[error("New memory size {requested} is less than the current size {current}")]
    InvalidMemorySize {
        /// Requested size
        requested: u32,
        /// Current size
        current: u32,
    },

    // Value stack errors
    /// Push past the stack capacity
    #[error("Stack overflow: pushing {size} bytes at pointer {pointer} (capacity {capacity})")]
    StackOverflow {
        /// Stack pointer before the push
        pointer: u32,
        /// Number of bytes pushed
        size: u32,
        /// Stack capacity
        capacity: u32,
    },

    /// Pop below the bottom of the stack
    #[error("Stack underflow: popping {size} bytes at pointer {pointer}")]
    StackUnderflow {
        /// Stack pointer before the pop
        pointer: u32,
        /// Number of bytes popped
        size: u32,
    },

    // Builder misuse
    /// Label allocated but never bound to a position
    #[error("Label {0} has not been marked")]
    UnmarkedLabel(usize),

    /// Label bound twice
    #[error("Label {0} is already marked")]
    LabelAlreadyMarked(usize),

    /// Label does not belong to this builder
    #[error("Label {0} was not created by this body builder")]
    ForeignLabel(usize),

    // Execution errors
    /// A structural guarantee was broken
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Local index outside the current frame
    #[error("Local {index} is out of range (frame has {count} locals)")]
    LocalOutOfRange {
        /// Requested local index
        index: usize,
        /// Number of locals in the frame
        count: usize,
    },

    /// Division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// String object type the interpreter cannot print
    #[error("Unsupported string type 0x{type_byte:02x} at 0x{address:x}")]
    UnsupportedStringType {
        /// Address of the string object
        address: u32,
        /// Its type byte
        type_byte: u8,
    },

    /// Host capability failed
    #[error("Host error: {0}")]
    HostError(String),

    // Resource errors
    /// Guest recursion went past the configured depth
    #[error("Call depth exceeded (limit: {limit})")]
    CallDepthExceeded {
        /// Maximum allowed call depth
        limit: usize,
    },

    /// Too many blocks dispatched
    #[error("Step limit exceeded (max: {limit} blocks)")]
    StepLimitExceeded {
        /// Maximum allowed block dispatches
        limit: u64,
    },

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Image could not be loaded
    MalformedImage,
    /// Machine code could not be decoded
    Decode,
    /// Memory or local access out of bounds
    OutOfRange,
    /// Write to protected memory
    ReadOnlyViolation,
    /// Value stack overflow or underflow
    StackImbalance,
    /// Body builder used incorrectly
    BuilderMisuse,
    /// Internal guarantee broken or guest arithmetic fault
    Invariant,
    /// Host capability failure
    Host,
    /// Execution limit tripped
    Limit,
}

impl Error {
    /// Create a malformed-image error with a reason
    pub fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedImage {
            reason: reason.into(),
        }
    }

    /// Create a decode error for the function at `address`
    pub fn decode(address: u32, error: DecodeError) -> Self {
        Error::Decode { address, error }
    }

    /// Create an invariant violation with a message
    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedImage { .. } | Error::InvalidConfig(_) => ErrorKind::MalformedImage,
            Error::Decode { .. } => ErrorKind::Decode,

            Error::OutOfRange { .. }
            | Error::InvalidMemorySize { .. }
            | Error::LocalOutOfRange { .. } => ErrorKind::OutOfRange,
            Error::ReadOnlyViolation { .. } => ErrorKind::ReadOnlyViolation,

            Error::StackOverflow { .. } | Error::StackUnderflow { .. } => {
                ErrorKind::StackImbalance
            }

            Error::UnmarkedLabel(_) | Error::LabelAlreadyMarked(_) | Error::ForeignLabel(_) => {
                ErrorKind::BuilderMisuse
            }

            Error::InvariantViolation(_)
            | Error::DivisionByZero
            | Error::UnsupportedStringType { .. } => ErrorKind::Invariant,
            Error::HostError(_) => ErrorKind::Host,

            Error::CallDepthExceeded { .. } | Error::StepLimitExceeded { .. } => ErrorKind::Limit,
        }
    }
}

/// Result type for ifvm operations
pub type Result<T> = std::result::Result<T, Error>;
