//! Length-prefixed bytecode encoding.
//!
//! Format: `[opcode:1][key_len:2 BE][key UTF-8]([value_len:2 BE][value UTF-8])?`
//! repeated until the end of the buffer. Only STORE carries a value.
//!
//! Every length-prefixed read is bounds-checked; an overrun is a
//! [`VmError::MalformedBytecode`], never an out-of-bounds read.

use crate::error::VmError;
use crate::opcode::Opcode;

/// Size of an operand length prefix (u16 big-endian).
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest operand the length prefix can describe.
pub const MAX_OPERAND_LEN: usize = u16::MAX as usize;

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Store { key: String, value: String },
    /// `target` is a parse-time annotation only; it is not encoded.
    Load { key: String, target: Option<String> },
    Delete { key: String },
}

impl Instruction {
    pub fn store(key: impl Into<String>, value: impl Into<String>) -> Self {
        Instruction::Store {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn load(key: impl Into<String>) -> Self {
        Instruction::Load {
            key: key.into(),
            target: None,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Instruction::Delete { key: key.into() }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Store { .. } => Opcode::Store,
            Instruction::Load { .. } => Opcode::Load,
            Instruction::Delete { .. } => Opcode::Delete,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Instruction::Store { key, .. }
            | Instruction::Load { key, .. }
            | Instruction::Delete { key } => key,
        }
    }

    /// Append this instruction's bytes to `out`.
    ///
    /// On error `out` is left unchanged.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), VmError> {
        check_operand(self.key())?;
        if let Instruction::Store { value, .. } = self {
            check_operand(value)?;
        }

        self.write_unchecked(out);
        Ok(())
    }

    /// Append without the length check. Callers must already have checked
    /// every operand against [`MAX_OPERAND_LEN`].
    pub(crate) fn write_unchecked(&self, out: &mut Vec<u8>) {
        out.push(self.opcode().into());
        write_operand(out, self.key());
        if let Instruction::Store { value, .. } = self {
            write_operand(out, value);
        }
    }

    /// Encode this instruction as a single-instruction program.
    pub fn encode(&self) -> Result<Vec<u8>, VmError> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out)?;
        Ok(out)
    }

    fn encoded_len(&self) -> usize {
        let value_len = match self {
            Instruction::Store { value, .. } => LENGTH_PREFIX_SIZE + value.len(),
            _ => 0,
        };
        1 + LENGTH_PREFIX_SIZE + self.key().len() + value_len
    }
}

/// Encode a sequence of instructions into one flat program.
pub fn encode_program(instructions: &[Instruction]) -> Result<Vec<u8>, VmError> {
    let mut out = Vec::with_capacity(instructions.iter().map(Instruction::encoded_len).sum());
    for instruction in instructions {
        instruction.encode_into(&mut out)?;
    }
    Ok(out)
}

/// Strictly decode a whole program. Unlike the interpreter, an unknown
/// opcode is an error here rather than a halt.
pub fn decode_program(bytecode: &[u8]) -> Result<Vec<Instruction>, VmError> {
    let mut cursor = Cursor::new(bytecode);
    let mut instructions = Vec::new();
    while !cursor.is_at_end() {
        let offset = cursor.position();
        let byte = cursor.read_u8()?;
        let opcode =
            Opcode::try_from(byte).map_err(|opcode| VmError::UnknownOpcode { opcode, offset })?;
        instructions.push(cursor.read_instruction(opcode)?);
    }
    Ok(instructions)
}

fn check_operand(operand: &str) -> Result<(), VmError> {
    if operand.len() > MAX_OPERAND_LEN {
        return Err(VmError::OperandTooLong {
            len: operand.len(),
            max: MAX_OPERAND_LEN,
        });
    }
    Ok(())
}

fn write_operand(out: &mut Vec<u8>, operand: &str) {
    out.extend_from_slice(&(operand.len() as u16).to_be_bytes());
    out.extend_from_slice(operand.as_bytes());
}

/// Forward-only reader over a bytecode buffer.
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], VmError> {
        if needed > self.remaining() {
            return Err(VmError::MalformedBytecode {
                offset: self.pos,
                needed,
                remaining: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, VmError> {
        Ok(self.take(1)?[0])
    }

    /// Read a length-prefixed UTF-8 operand.
    pub(crate) fn read_operand(&mut self) -> Result<String, VmError> {
        let prefix = self.take(LENGTH_PREFIX_SIZE)?;
        let len = u16::from_be_bytes([prefix[0], prefix[1]]) as usize;
        let offset = self.pos;
        let raw = self.take(len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| VmError::InvalidUtf8 { offset })
    }

    /// Read the operands that follow an already-consumed opcode byte.
    pub(crate) fn read_instruction(&mut self, opcode: Opcode) -> Result<Instruction, VmError> {
        let key = self.read_operand()?;
        Ok(match opcode {
            Opcode::Store => {
                let value = self.read_operand()?;
                Instruction::Store { key, value }
            }
            Opcode::Load => Instruction::Load { key, target: None },
            Opcode::Delete => Instruction::Delete { key },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_layout() {
        let bytes = Instruction::store("k", "vv").encode().unwrap();
        assert_eq!(hex::encode(&bytes), "2000016b00027676");
    }

    #[test]
    fn load_and_delete_layout() {
        assert_eq!(
            hex::encode(Instruction::load("ab").encode().unwrap()),
            "2100026162"
        );
        assert_eq!(
            hex::encode(Instruction::delete("").encode().unwrap()),
            "220000"
        );
    }

    #[test]
    fn program_decodes_in_order() {
        let program = vec![
            Instruction::store("demoKey", "hello world."),
            Instruction::load("demoKey"),
            Instruction::delete("demoKey"),
        ];
        let bytes = encode_program(&program).unwrap();
        assert_eq!(decode_program(&bytes).unwrap(), program);
    }

    #[test]
    fn operand_over_cap_rejected() {
        let long = "x".repeat(MAX_OPERAND_LEN + 1);
        let mut out = vec![0xaa];
        let err = Instruction::store("k", long).encode_into(&mut out).unwrap_err();
        assert_eq!(
            err,
            VmError::OperandTooLong {
                len: MAX_OPERAND_LEN + 1,
                max: MAX_OPERAND_LEN
            }
        );
        assert_eq!(out, vec![0xaa], "failed encode must not leave partial bytes");
    }

    #[test]
    fn operand_at_cap_accepted() {
        let max = "y".repeat(MAX_OPERAND_LEN);
        let bytes = Instruction::load(max.clone()).encode().unwrap();
        assert_eq!(decode_program(&bytes).unwrap(), vec![Instruction::load(max)]);
    }

    #[test]
    fn overrunning_length_is_malformed() {
        // LOAD with a key length of 5 but only 2 key bytes
        let bytes = [0x21, 0x00, 0x05, b'a', b'b'];
        assert_eq!(
            decode_program(&bytes).unwrap_err(),
            VmError::MalformedBytecode {
                offset: 3,
                needed: 5,
                remaining: 2
            }
        );
    }

    #[test]
    fn truncated_length_prefix_is_malformed() {
        let bytes = [0x22, 0x00];
        assert!(matches!(
            decode_program(&bytes),
            Err(VmError::MalformedBytecode { offset: 1, .. })
        ));
    }

    #[test]
    fn invalid_utf8_operand() {
        let bytes = [0x22, 0x00, 0x02, 0xc3, 0x28];
        assert_eq!(
            decode_program(&bytes).unwrap_err(),
            VmError::InvalidUtf8 { offset: 3 }
        );
    }

    #[test]
    fn strict_decode_rejects_unknown_opcode() {
        let mut bytes = Instruction::delete("k").encode().unwrap();
        let offset = bytes.len();
        bytes.push(0x7f);
        assert_eq!(
            decode_program(&bytes).unwrap_err(),
            VmError::UnknownOpcode {
                opcode: 0x7f,
                offset
            }
        );
    }

    #[test]
    fn empty_program() {
        assert!(decode_program(&[]).unwrap().is_empty());
        assert!(encode_program(&[]).unwrap().is_empty());
    }
}
