use std::time::Duration;

use thiserror::Error;

use crate::restore::RestoreError;
use favvault_crypto::CryptoError;
use favvault_vm::{CompileError, VmError};

/// Failure of a single queued command. Caught and logged at the pipeline
/// boundary; never affects other commands.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Bytecode error: {0}")]
    Vm(#[from] VmError),

    #[error("Baseline restore failed: {0}")]
    Restore(#[from] RestoreError),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Command queue is closed")]
    Closed,

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl VaultError {
    /// The stored value exists but cannot be opened with this session's key.
    pub fn is_unrecoverable_value(&self) -> bool {
        matches!(self, VaultError::Crypto(e) if e.is_authentication_failure())
    }
}
