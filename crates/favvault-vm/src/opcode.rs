//! Instruction set.
//!
//! | Byte | Mnemonic   | Operands      |
//! |------|------------|---------------|
//! | 0x20 | `STOREFAV` | key, value    |
//! | 0x21 | `LOADFAV`  | key [target]  |
//! | 0x22 | `DELFAV`   | key           |

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Store = 0x20,
    Load = 0x21,
    Delete = 0x22,
}

impl Opcode {
    /// Look up a mnemonic, ignoring case.
    pub fn from_mnemonic(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("STOREFAV") {
            Some(Opcode::Store)
        } else if token.eq_ignore_ascii_case("LOADFAV") {
            Some(Opcode::Load)
        } else if token.eq_ignore_ascii_case("DELFAV") {
            Some(Opcode::Delete)
        } else {
            None
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Store => "STOREFAV",
            Opcode::Load => "LOADFAV",
            Opcode::Delete => "DELFAV",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x20 => Ok(Opcode::Store),
            0x21 => Ok(Opcode::Load),
            0x22 => Ok(Opcode::Delete),
            other => Err(other),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}
