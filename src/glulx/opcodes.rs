//! Glulx opcode table
//!
//! Every opcode the decoder recognizes, with the load/store role of each
//! operand. Decoding stops at the first opcode number missing from this
//! table; opcodes present here but without an IR binding fail with
//! [`DecodeError::UnsupportedOpcode`](crate::DecodeError::UnsupportedOpcode).

use std::collections::HashMap;
use std::fmt;

/// Role of an operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Read by the instruction
    Load,
    /// Written by the instruction
    Store,
}

use OperandKind::{Load as L, Store as S};

/// Opcode numbers, named after their mnemonics
pub mod op {
    #![allow(missing_docs)]

    pub const NOP: u32 = 0x00;
    pub const ADD: u32 = 0x10;
    pub const SUB: u32 = 0x11;
    pub const MUL: u32 = 0x12;
    pub const DIV: u32 = 0x13;
    pub const MOD: u32 = 0x14;
    pub const NEG: u32 = 0x15;
    pub const BITAND: u32 = 0x18;
    pub const BITOR: u32 = 0x19;
    pub const BITXOR: u32 = 0x1a;
    pub const BITNOT: u32 = 0x1b;
    pub const SHIFTL: u32 = 0x1c;
    pub const SSHIFTR: u32 = 0x1d;
    pub const USHIFTR: u32 = 0x1e;
    pub const JUMP: u32 = 0x20;
    pub const JZ: u32 = 0x22;
    pub const JNZ: u32 = 0x23;
    pub const JEQ: u32 = 0x24;
    pub const JNE: u32 = 0x25;
    pub const JLT: u32 = 0x26;
    pub const JGE: u32 = 0x27;
    pub const JGT: u32 = 0x28;
    pub const JLE: u32 = 0x29;
    pub const JLTU: u32 = 0x2a;
    pub const JGEU: u32 = 0x2b;
    pub const JGTU: u32 = 0x2c;
    pub const JLEU: u32 = 0x2d;
    pub const CALL: u32 = 0x30;
    pub const RETURN: u32 = 0x31;
    pub const CATCH: u32 = 0x32;
    pub const THROW: u32 = 0x33;
    pub const TAILCALL: u32 = 0x34;
    pub const COPY: u32 = 0x40;
    pub const COPYS: u32 = 0x41;
    pub const COPYB: u32 = 0x42;
    pub const SEXS: u32 = 0x44;
    pub const SEXB: u32 = 0x45;
    pub const ALOAD: u32 = 0x48;
    pub const ALOADS: u32 = 0x49;
    pub const ALOADB: u32 = 0x4a;
    pub const ALOADBIT: u32 = 0x4b;
    pub const ASTORE: u32 = 0x4c;
    pub const ASTORES: u32 = 0x4d;
    pub const ASTOREB: u32 = 0x4e;
    pub const ASTOREBIT: u32 = 0x4f;
    pub const STKCOUNT: u32 = 0x50;
    pub const STKPEEK: u32 = 0x51;
    pub const STKSWAP: u32 = 0x52;
    pub const STKROLL: u32 = 0x53;
    pub const STKCOPY: u32 = 0x54;
    pub const STREAMCHAR: u32 = 0x70;
    pub const STREAMNUM: u32 = 0x71;
    pub const STREAMSTR: u32 = 0x72;
    pub const STREAMUNICHAR: u32 = 0x73;
    pub const GESTALT: u32 = 0x100;
    pub const DEBUGTRAP: u32 = 0x101;
    pub const GETMEMSIZE: u32 = 0x102;
    pub const SETMEMSIZE: u32 = 0x103;
    pub const JUMPABS: u32 = 0x104;
    pub const RANDOM: u32 = 0x110;
    pub const SETRANDOM: u32 = 0x111;
    pub const QUIT: u32 = 0x120;
    pub const VERIFY: u32 = 0x121;
    pub const RESTART: u32 = 0x122;
    pub const SAVE: u32 = 0x123;
    pub const RESTORE: u32 = 0x124;
    pub const SAVEUNDO: u32 = 0x125;
    pub const RESTOREUNDO: u32 = 0x126;
    pub const PROTECT: u32 = 0x127;
    pub const GLK: u32 = 0x130;
    pub const GETSTRINGTBL: u32 = 0x140;
    pub const SETSTRINGTBL: u32 = 0x141;
    pub const GETIOSYS: u32 = 0x148;
    pub const SETIOSYS: u32 = 0x149;
    pub const LINEARSEARCH: u32 = 0x150;
    pub const BINARYSEARCH: u32 = 0x151;
    pub const LINKEDSEARCH: u32 = 0x152;
    pub const CALLF: u32 = 0x160;
    pub const CALLFI: u32 = 0x161;
    pub const CALLFII: u32 = 0x162;
    pub const CALLFIII: u32 = 0x163;
    pub const MZERO: u32 = 0x170;
    pub const MCOPY: u32 = 0x171;
    pub const MALLOC: u32 = 0x178;
    pub const MFREE: u32 = 0x179;
    pub const ACCELFUNC: u32 = 0x180;
    pub const ACCELPARAM: u32 = 0x181;
    pub const NUMTOF: u32 = 0x190;
    pub const FTONUMZ: u32 = 0x191;
    pub const FTONUMN: u32 = 0x192;
    pub const CEIL: u32 = 0x198;
    pub const FLOOR: u32 = 0x199;
    pub const FADD: u32 = 0x1a0;
    pub const FSUB: u32 = 0x1a1;
    pub const FMUL: u32 = 0x1a2;
    pub const FDIV: u32 = 0x1a3;
    pub const FMOD: u32 = 0x1a4;
    pub const SQRT: u32 = 0x1a8;
    pub const EXP: u32 = 0x1a9;
    pub const LOG: u32 = 0x1aa;
    pub const POW: u32 = 0x1ab;
    pub const SIN: u32 = 0x1b0;
    pub const COS: u32 = 0x1b1;
    pub const TAN: u32 = 0x1b2;
    pub const ASIN: u32 = 0x1b3;
    pub const ACOS: u32 = 0x1b4;
    pub const ATAN: u32 = 0x1b5;
    pub const ATAN2: u32 = 0x1b6;
    pub const JFEQ: u32 = 0x1c0;
    pub const JFNE: u32 = 0x1c1;
    pub const JFLT: u32 = 0x1c2;
    pub const JFLE: u32 = 0x1c3;
    pub const JFGT: u32 = 0x1c4;
    pub const JFGE: u32 = 0x1c5;
    pub const JISNAN: u32 = 0x1c8;
    pub const JISINF: u32 = 0x1c9;
}

/// Static description of one opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    /// Opcode number
    pub number: u32,
    /// Mnemonic
    pub name: &'static str,
    /// Operand roles in encoding order
    pub operands: &'static [OperandKind],
}

impl Opcode {
    const fn new(number: u32, name: &'static str, operands: &'static [OperandKind]) -> Self {
        Self {
            number,
            name,
            operands,
        }
    }

    /// Number of operands
    pub fn operand_count(&self) -> usize {
        self.operands.len()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:x})", self.name, self.number)
    }
}

static OPCODES: &[Opcode] = &[
    Opcode::new(op::NOP, "nop", &[]),
    Opcode::new(op::ADD, "add", &[L, L, S]),
    Opcode::new(op::SUB, "sub", &[L, L, S]),
    Opcode::new(op::MUL, "mul", &[L, L, S]),
    Opcode::new(op::DIV, "div", &[L, L, S]),
    Opcode::new(op::MOD, "mod", &[L, L, S]),
    Opcode::new(op::NEG, "neg", &[L, S]),
    Opcode::new(op::BITAND, "bitand", &[L, L, S]),
    Opcode::new(op::BITOR, "bitor", &[L, L, S]),
    Opcode::new(op::BITXOR, "bitxor", &[L, L, S]),
    Opcode::new(op::BITNOT, "bitnot", &[L, S]),
    Opcode::new(op::SHIFTL, "shiftl", &[L, L, S]),
    Opcode::new(op::SSHIFTR, "sshiftr", &[L, L, S]),
    Opcode::new(op::USHIFTR, "ushiftr", &[L, L, S]),
    Opcode::new(op::JUMP, "jump", &[L]),
    Opcode::new(op::JZ, "jz", &[L, L]),
    Opcode::new(op::JNZ, "jnz", &[L, L]),
    Opcode::new(op::JEQ, "jeq", &[L, L, L]),
    Opcode::new(op::JNE, "jne", &[L, L, L]),
    Opcode::new(op::JLT, "jlt", &[L, L, L]),
    Opcode::new(op::JGE, "jge", &[L, L, L]),
    Opcode::new(op::JGT, "jgt", &[L, L, L]),
    Opcode::new(op::JLE, "jle", &[L, L, L]),
    Opcode::new(op::JLTU, "jltu", &[L, L, L]),
    Opcode::new(op::JGEU, "jgeu", &[L, L, L]),
    Opcode::new(op::JGTU, "jgtu", &[L, L, L]),
    Opcode::new(op::JLEU, "jleu", &[L, L, L]),
    Opcode::new(op::CALL, "call", &[L, L, S]),
    Opcode::new(op::RETURN, "return", &[L]),
    Opcode::new(op::CATCH, "catch", &[S, L]),
    Opcode::new(op::THROW, "throw", &[L, L]),
    Opcode::new(op::TAILCALL, "tailcall", &[L, L]),
    Opcode::new(op::COPY, "copy", &[L, S]),
    Opcode::new(op::COPYS, "copys", &[L, S]),
    Opcode::new(op::COPYB, "copyb", &[L, S]),
    Opcode::new(op::SEXS, "sexs", &[L, S]),
    Opcode::new(op::SEXB, "sexb", &[L, S]),
    Opcode::new(op::ALOAD, "aload", &[L, L, S]),
    Opcode::new(op::ALOADS, "aloads", &[L, L, S]),
    Opcode::new(op::ALOADB, "aloadb", &[L, L, S]),
    Opcode::new(op::ALOADBIT, "aloadbit", &[L, L, S]),
    Opcode::new(op::ASTORE, "astore", &[L, L, L]),
    Opcode::new(op::ASTORES, "astores", &[L, L, L]),
    Opcode::new(op::ASTOREB, "astoreb", &[L, L, L]),
    Opcode::new(op::ASTOREBIT, "astorebit", &[L, L, L]),
    Opcode::new(op::STKCOUNT, "stkcount", &[S]),
    Opcode::new(op::STKPEEK, "stkpeek", &[L, S]),
    Opcode::new(op::STKSWAP, "stkswap", &[]),
    Opcode::new(op::STKROLL, "stkroll", &[L, L]),
    Opcode::new(op::STKCOPY, "stkcopy", &[L]),
    Opcode::new(op::STREAMCHAR, "streamchar", &[L]),
    Opcode::new(op::STREAMNUM, "streamnum", &[L]),
    Opcode::new(op::STREAMSTR, "streamstr", &[L]),
    Opcode::new(op::STREAMUNICHAR, "streamunichar", &[L]),
    Opcode::new(op::GESTALT, "gestalt", &[L, L, S]),
    Opcode::new(op::DEBUGTRAP, "debugtrap", &[L]),
    Opcode::new(op::GETMEMSIZE, "getmemsize", &[S]),
    Opcode::new(op::SETMEMSIZE, "setmemsize", &[L, S]),
    Opcode::new(op::JUMPABS, "jumpabs", &[L]),
    Opcode::new(op::RANDOM, "random", &[L, S]),
    Opcode::new(op::SETRANDOM, "setrandom", &[L]),
    Opcode::new(op::QUIT, "quit", &[]),
    Opcode::new(op::VERIFY, "verify", &[S]),
    Opcode::new(op::RESTART, "restart", &[]),
    Opcode::new(op::SAVE, "save", &[L, S]),
    Opcode::new(op::RESTORE, "restore", &[L, S]),
    Opcode::new(op::SAVEUNDO, "saveundo", &[S]),
    Opcode::new(op::RESTOREUNDO, "restoreundo", &[S]),
    Opcode::new(op::PROTECT, "protect", &[L, L]),
    Opcode::new(op::GLK, "glk", &[L, L, S]),
    Opcode::new(op::GETSTRINGTBL, "getstringtbl", &[S]),
    Opcode::new(op::SETSTRINGTBL, "setstringtbl", &[L]),
    Opcode::new(op::GETIOSYS, "getiosys", &[S, S]),
    Opcode::new(op::SETIOSYS, "setiosys", &[L, L]),
    Opcode::new(op::LINEARSEARCH, "linearsearch", &[L, L, L, L, L, L, L, S]),
    Opcode::new(op::BINARYSEARCH, "binarysearch", &[L, L, L, L, L, L, L, S]),
    Opcode::new(op::LINKEDSEARCH, "linkedsearch", &[L, L, L, L, L, L, S]),
    Opcode::new(op::CALLF, "callf", &[L, S]),
    Opcode::new(op::CALLFI, "callfi", &[L, L, S]),
    Opcode::new(op::CALLFII, "callfii", &[L, L, L, S]),
    Opcode::new(op::CALLFIII, "callfiii", &[L, L, L, L, S]),
    Opcode::new(op::MZERO, "mzero", &[L, L]),
    Opcode::new(op::MCOPY, "mcopy", &[L, L, L]),
    Opcode::new(op::MALLOC, "malloc", &[L, S]),
    Opcode::new(op::MFREE, "mfree", &[L]),
    Opcode::new(op::ACCELFUNC, "accelfunc", &[L, L]),
    Opcode::new(op::ACCELPARAM, "accelparam", &[L, L]),
    Opcode::new(op::NUMTOF, "numtof", &[L, S]),
    Opcode::new(op::FTONUMZ, "ftonumz", &[L, S]),
    Opcode::new(op::FTONUMN, "ftonumn", &[L, S]),
    Opcode::new(op::CEIL, "ceil", &[L, S]),
    Opcode::new(op::FLOOR, "floor", &[L, S]),
    Opcode::new(op::FADD, "fadd", &[L, L, S]),
    Opcode::new(op::FSUB, "fsub", &[L, L, S]),
    Opcode::new(op::FMUL, "fmul", &[L, L, S]),
    Opcode::new(op::FDIV, "fdiv", &[L, L, S]),
    Opcode::new(op::FMOD, "fmod", &[L, L, S, S]),
    Opcode::new(op::SQRT, "sqrt", &[L, S]),
    Opcode::new(op::EXP, "exp", &[L, S]),
    Opcode::new(op::LOG, "log", &[L, S]),
    Opcode::new(op::POW, "pow", &[L, L, S]),
    Opcode::new(op::SIN, "sin", &[L, S]),
    Opcode::new(op::COS, "cos", &[L, S]),
    Opcode::new(op::TAN, "tan", &[L, S]),
    Opcode::new(op::ASIN, "asin", &[L, S]),
    Opcode::new(op::ACOS, "acos", &[L, S]),
    Opcode::new(op::ATAN, "atan", &[L, S]),
    Opcode::new(op::ATAN2, "atan2", &[L, L, S]),
    Opcode::new(op::JFEQ, "jfeq", &[L, L, L, L]),
    Opcode::new(op::JFNE, "jfne", &[L, L, L, L]),
    Opcode::new(op::JFLT, "jflt", &[L, L, L]),
    Opcode::new(op::JFLE, "jfle", &[L, L, L]),
    Opcode::new(op::JFGT, "jfgt", &[L, L, L]),
    Opcode::new(op::JFGE, "jfge", &[L, L, L]),
    Opcode::new(op::JISNAN, "jisnan", &[L, L]),
    Opcode::new(op::JISINF, "jisinf", &[L, L]),
];

lazy_static::lazy_static! {
    static ref OPCODE_TABLE: HashMap<u32, &'static Opcode> =
        OPCODES.iter().map(|opcode| (opcode.number, opcode)).collect();
}

/// Looks up an opcode by number
pub fn lookup(number: u32) -> Option<&'static Opcode> {
    OPCODE_TABLE.get(&number).copied()
}
