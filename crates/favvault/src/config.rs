//! Vault configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::VaultError;
use favvault_vm::DEFAULT_MAX_LINES;

/// Default bound on each awaited step of a command.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;

/// Runtime settings for a [`Vault`](crate::Vault).
///
/// Deserializes from JSON with every field optional:
/// `{"operation_timeout_ms": 2000, "max_script_lines": 500}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Upper bound for each encrypt, decrypt and clear step. A step that
    /// exceeds it fails that one command instead of stalling the queue.
    pub operation_timeout_ms: u64,
    /// Line limit for scripts passed to `run_script`.
    pub max_script_lines: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            max_script_lines: DEFAULT_MAX_LINES,
        }
    }
}

impl VaultConfig {
    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_script_lines(mut self, lines: usize) -> Self {
        self.max_script_lines = lines;
        self
    }
}
