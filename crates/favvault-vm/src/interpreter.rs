//! Single-pass bytecode interpreter.
//!
//! The instruction pointer only moves forward. Execution ends normally at the
//! end of the buffer, or halts (without error) at the first byte that is not a
//! known opcode. LOAD results are handed to the `on_load` continuation passed
//! to each call; there is no shared pending-read state.

use tracing::{trace, warn};

use crate::bytecode::{Cursor, Instruction};
use crate::error::VmError;
use crate::opcode::Opcode;
use crate::store::Store;

/// Outcome of a LOAD, delivered to the caller's continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub key: String,
    /// `None` on a miss.
    pub value: Option<String>,
}

/// Where and why execution stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt {
    pub offset: usize,
    pub opcode: u8,
}

/// Summary of one `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Execution {
    /// Instructions fully executed.
    pub executed: usize,
    /// Set when an unknown opcode stopped the run.
    pub halted: Option<Halt>,
}

impl Execution {
    pub fn completed(&self) -> bool {
        self.halted.is_none()
    }
}

/// Run `bytecode` against `store`.
///
/// A malformed operand returns an error; instructions before it stay applied.
pub fn execute<F>(bytecode: &[u8], store: &mut Store, mut on_load: F) -> Result<Execution, VmError>
where
    F: FnMut(LoadResult),
{
    let mut cursor = Cursor::new(bytecode);
    let mut execution = Execution::default();

    while !cursor.is_at_end() {
        let offset = cursor.position();
        let byte = cursor.read_u8()?;
        let opcode = match Opcode::try_from(byte) {
            Ok(opcode) => opcode,
            Err(opcode) => {
                warn!(opcode, offset, "unknown opcode, halting");
                execution.halted = Some(Halt { offset, opcode });
                break;
            }
        };

        match cursor.read_instruction(opcode)? {
            Instruction::Store { key, value } => {
                trace!(%key, offset, "STORE");
                store.upsert(key, value);
            }
            Instruction::Load { key, .. } => {
                trace!(%key, offset, "LOAD");
                let value = store.get(&key).map(str::to_owned);
                on_load(LoadResult { key, value });
            }
            Instruction::Delete { key } => {
                trace!(%key, offset, "DELETE");
                store.remove(&key);
            }
        }
        execution.executed += 1;
    }

    Ok(execution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::encode_program;

    fn run(program: &[Instruction], store: &mut Store) -> (Execution, Vec<LoadResult>) {
        let bytes = encode_program(program).unwrap();
        let mut loads = Vec::new();
        let execution = execute(&bytes, store, |r| loads.push(r)).unwrap();
        (execution, loads)
    }

    #[test]
    fn store_then_load() {
        let mut store = Store::new();
        let (execution, loads) = run(
            &[Instruction::store("a", "1"), Instruction::load("a")],
            &mut store,
        );
        assert_eq!(execution.executed, 2);
        assert!(execution.completed());
        assert_eq!(
            loads,
            vec![LoadResult {
                key: "a".into(),
                value: Some("1".into())
            }]
        );
    }

    #[test]
    fn load_miss_delivers_none() {
        let mut store = Store::new();
        let (_, loads) = run(&[Instruction::load("ghost")], &mut store);
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].value, None);
    }

    #[test]
    fn delete_then_load() {
        let mut store = Store::new();
        let (_, loads) = run(
            &[
                Instruction::store("k", "v"),
                Instruction::delete("k"),
                Instruction::delete("k"),
                Instruction::load("k"),
            ],
            &mut store,
        );
        assert_eq!(loads[0].value, None);
        assert!(store.is_empty());
    }

    #[test]
    fn overwrite_is_last_write_wins() {
        let mut store = Store::new();
        let (_, loads) = run(
            &[
                Instruction::store("k", "v1"),
                Instruction::store("k", "v2"),
                Instruction::load("k"),
            ],
            &mut store,
        );
        assert_eq!(loads[0].value.as_deref(), Some("v2"));
    }

    #[test]
    fn unknown_opcode_halts_without_consuming_rest() {
        let mut store = Store::new();
        let mut bytes = Instruction::store("a", "1").encode().unwrap();
        let offset = bytes.len();
        bytes.push(0x99);
        bytes.extend(Instruction::store("b", "2").encode().unwrap());

        let execution = execute(&bytes, &mut store, |_| {}).unwrap();
        assert_eq!(execution.executed, 1);
        assert_eq!(
            execution.halted,
            Some(Halt {
                offset,
                opcode: 0x99
            })
        );
        assert!(store.contains_key("a"));
        assert!(!store.contains_key("b"));
    }

    #[test]
    fn malformed_operand_is_error_and_keeps_prior_effects() {
        let mut store = Store::new();
        let mut bytes = Instruction::store("a", "1").encode().unwrap();
        bytes.extend_from_slice(&[0x20, 0x00, 0x01, b'b', 0x00, 0x09, b'x']);

        let err = execute(&bytes, &mut store, |_| {}).unwrap_err();
        assert!(matches!(err, VmError::MalformedBytecode { needed: 9, .. }));
        assert_eq!(store.get("a"), Some("1"));
        assert!(!store.contains_key("b"));
    }

    #[test]
    fn empty_program_is_noop() {
        let mut store = Store::new();
        let execution = execute(&[], &mut store, |_| panic!("no loads")).unwrap();
        assert_eq!(execution, Execution::default());
    }
}
