//! favvault bytecode: opcodes, length-prefixed encoding, the textual
//! compiler, and the interpreter that runs programs against a [`Store`].

pub mod bytecode;
pub mod compiler;
pub mod error;
pub mod interpreter;
pub mod opcode;
pub mod store;

pub use bytecode::{decode_program, encode_program, Instruction, MAX_OPERAND_LEN};
pub use compiler::{compile, parse, Compiler, DEFAULT_MAX_LINES};
pub use error::{CompileError, VmError};
pub use interpreter::{execute, Execution, Halt, LoadResult};
pub use opcode::Opcode;
pub use store::Store;
