//! The caller-facing handle.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::pipeline::{Command, Pipeline};
use crate::restore::{BaselineRestorer, ResetStore};
use favvault_vm::LoadResult;

/// Cloneable handle to one vault session.
///
/// Each `Vault` created with [`Vault::new`] or [`Vault::with_restorer`] owns
/// its own store, session key and drain task. Clones share them. When the
/// last clone is dropped the queue closes, the drain task finishes what was
/// already queued and the session (key included) is dropped.
#[derive(Clone)]
pub struct Vault {
    queue: mpsc::UnboundedSender<Command>,
}

impl Vault {
    /// Start a vault whose `clear` only recreates the store.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: VaultConfig) -> Self {
        Self::with_restorer(config, Arc::new(ResetStore))
    }

    /// Start a vault with a custom clear collaborator.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_restorer(config: VaultConfig, restorer: Arc<dyn BaselineRestorer>) -> Self {
        let (queue, commands) = mpsc::unbounded_channel();
        tokio::spawn(Pipeline::new(&config, restorer).run(commands));
        Self { queue }
    }

    /// Queue an encrypted write. Returns as soon as the command is queued.
    pub fn set_item(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), VaultError> {
        self.enqueue(Command::Set {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Read and decrypt a value.
    ///
    /// The read is queued when this is called, not when the returned future
    /// is first polled, so it observes exactly the commands queued before it.
    /// Resolves to `None` when the key is absent, the value cannot be
    /// decrypted, or the read failed for any other reason (already logged by
    /// the pipeline).
    pub fn get_item(&self, key: impl Into<String>) -> impl Future<Output = Option<String>> {
        let key = key.into();
        let (reply, response) = oneshot::channel();
        let queued = self.enqueue(Command::Get {
            key: key.clone(),
            reply,
        });
        if let Err(e) = &queued {
            warn!(error = %e, %key, "get on closed vault");
        }
        let queued = queued.is_ok();
        async move {
            if !queued {
                return None;
            }
            response.await.ok().flatten()
        }
    }

    /// Queue a delete. Removing an absent key is not an error.
    pub fn remove_item(&self, key: impl Into<String>) -> Result<(), VaultError> {
        self.enqueue(Command::Delete { key: key.into() })
    }

    /// Queue a baseline restore, which discards every stored value.
    pub fn clear(&self) -> Result<(), VaultError> {
        self.enqueue(Command::Clear)
    }

    /// Wait until every command queued before this call has been processed.
    pub fn flush(&self) -> impl Future<Output = Result<(), VaultError>> {
        let (reply, done) = oneshot::channel();
        let queued = self.enqueue(Command::Flush { reply });
        async move {
            match queued {
                Ok(()) => done.await.map_err(|_| VaultError::Closed),
                Err(e) => Err(e),
            }
        }
    }

    /// Compile and run a textual program as one queued command.
    ///
    /// Queued when called, like [`Vault::get_item`]. `STOREFAV` values are
    /// encrypted and `LOADFAV` results decrypted exactly as with the
    /// single-key calls. Returns the loads in program order.
    pub fn run_script(
        &self,
        source: impl Into<String>,
    ) -> impl Future<Output = Result<Vec<LoadResult>, VaultError>> {
        let (reply, response) = oneshot::channel();
        let queued = self.enqueue(Command::Script {
            source: source.into(),
            reply,
        });
        async move {
            match queued {
                Ok(()) => response.await.unwrap_or(Err(VaultError::Closed)),
                Err(e) => Err(e),
            }
        }
    }

    /// Whether the drain task has stopped.
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    fn enqueue(&self, command: Command) -> Result<(), VaultError> {
        self.queue.send(command).map_err(|_| VaultError::Closed)
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("closed", &self.is_closed())
            .finish()
    }
}
