//! The clear collaborator.
//!
//! `clear` runs no bytecode. It asks a [`BaselineRestorer`] to return the host
//! to its baseline state; recreating the store is that collaborator's side
//! effect, not the pipeline's.

use async_trait::async_trait;
use tracing::debug;

use favvault_vm::Store;

/// User-provided hook invoked for `clear`.
///
/// Implementations restore whatever baseline the host cares about (for a
/// browser host, the original page icon) and are expected to recreate
/// `store` while doing so.
#[async_trait]
pub trait BaselineRestorer: Send + Sync {
    async fn restore_baseline(&self, store: &mut Store) -> Result<(), RestoreError>;
}

/// Restorer that only recreates the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResetStore;

#[async_trait]
impl BaselineRestorer for ResetStore {
    async fn restore_baseline(&self, store: &mut Store) -> Result<(), RestoreError> {
        debug!(entries = store.len(), "recreating store");
        *store = Store::new();
        Ok(())
    }
}

/// Restorer-level error (wraps arbitrary messages from the host).
#[derive(Debug, Clone)]
pub struct RestoreError {
    pub message: String,
}

impl RestoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RestoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RestoreError {}
