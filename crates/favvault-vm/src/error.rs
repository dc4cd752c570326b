use thiserror::Error;

/// Rejection of a textual program before anything executes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("Program too long: more than {limit} lines")]
    TooManyInstructions { limit: usize },

    #[error("Line {line}: unknown instruction \"{mnemonic}\"")]
    UnknownInstruction { line: usize, mnemonic: String },

    #[error("Line {line}: {mnemonic} is missing its {operand}")]
    MissingOperand {
        line: usize,
        mnemonic: &'static str,
        operand: &'static str,
    },

    #[error("Line {line}: {operand} is {len} bytes, max {max}")]
    OperandTooLong {
        line: usize,
        operand: &'static str,
        len: usize,
        max: usize,
    },
}

/// Structural failure while encoding or decoding bytecode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VmError {
    #[error("Malformed bytecode at offset {offset}: need {needed} bytes, {remaining} remaining")]
    MalformedBytecode {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Operand at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },

    #[error("Operand is {len} bytes, max {max}")]
    OperandTooLong { len: usize, max: usize },

    #[error("Unknown opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
}
