//! Textual program compiler.
//!
//! One instruction per line. `//` starts a comment anywhere on a line, blank
//! lines are skipped, tokens are split on whitespace and the mnemonic is
//! case-insensitive:
//!
//! ```text
//! STOREFAV <key> <value...>   // value is the rest of the line
//! LOADFAV  <key> [target]     // target is parsed but not encoded
//! DELFAV   <key>
//! ```

use crate::bytecode::{Instruction, MAX_OPERAND_LEN};
use crate::error::CompileError;
use crate::opcode::Opcode;

/// Line limit guarding against pathological input.
pub const DEFAULT_MAX_LINES: usize = 10_000;

const COMMENT: &str = "//";

/// Compile with the default line limit.
pub fn compile(source: &str) -> Result<Vec<u8>, CompileError> {
    Compiler::default().compile(source)
}

/// Parse with the default line limit.
pub fn parse(source: &str) -> Result<Vec<Instruction>, CompileError> {
    Compiler::default().parse(source)
}

#[derive(Debug, Clone, Copy)]
pub struct Compiler {
    max_lines: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
        }
    }
}

impl Compiler {
    pub fn with_max_lines(max_lines: usize) -> Self {
        Self { max_lines }
    }

    /// Parse and encode `source` into one flat program.
    pub fn compile(&self, source: &str) -> Result<Vec<u8>, CompileError> {
        let mut out = Vec::new();
        // parse_line has already checked every operand length
        for instruction in self.parse(source)? {
            instruction.write_unchecked(&mut out);
        }
        Ok(out)
    }

    /// Parse `source` into instructions without encoding them.
    pub fn parse(&self, source: &str) -> Result<Vec<Instruction>, CompileError> {
        if source.lines().count() > self.max_lines {
            return Err(CompileError::TooManyInstructions {
                limit: self.max_lines,
            });
        }

        let mut instructions = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            if let Some(instruction) = parse_line(line, raw)? {
                instructions.push(instruction);
            }
        }
        Ok(instructions)
    }
}

fn parse_line(line: usize, raw: &str) -> Result<Option<Instruction>, CompileError> {
    let code = match raw.find(COMMENT) {
        Some(at) => &raw[..at],
        None => raw,
    };
    let mut tokens = code.split_whitespace();
    let Some(mnemonic) = tokens.next() else {
        return Ok(None);
    };

    let opcode =
        Opcode::from_mnemonic(mnemonic).ok_or_else(|| CompileError::UnknownInstruction {
            line,
            mnemonic: mnemonic.to_string(),
        })?;

    let key = tokens.next().ok_or(CompileError::MissingOperand {
        line,
        mnemonic: opcode.mnemonic(),
        operand: "key",
    })?;
    check_len(line, "key", key)?;

    let instruction = match opcode {
        Opcode::Store => {
            let value = tokens.collect::<Vec<_>>().join(" ");
            check_len(line, "value", &value)?;
            Instruction::store(key, value)
        }
        Opcode::Load => Instruction::Load {
            key: key.to_string(),
            target: tokens.next().map(str::to_string),
        },
        Opcode::Delete => Instruction::delete(key),
    };
    Ok(Some(instruction))
}

fn check_len(line: usize, operand: &'static str, text: &str) -> Result<(), CompileError> {
    if text.len() > MAX_OPERAND_LEN {
        return Err(CompileError::OperandTooLong {
            line,
            operand,
            len: text.len(),
            max: MAX_OPERAND_LEN,
        });
    }
    Ok(())
}
