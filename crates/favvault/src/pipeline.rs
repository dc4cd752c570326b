//! Serial command pipeline.
//!
//! One drain task owns the store, the session cipher and the restorer. It
//! takes commands off the queue strictly in arrival order and runs each to
//! completion before looking at the next. A failing or panicking command is
//! logged and answered with `None`/an error; the loop always moves on.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::restore::BaselineRestorer;
use favvault_crypto::SessionCipher;
use favvault_vm::{execute, Compiler, Instruction, LoadResult, Store};

/// A request waiting in the queue.
pub(crate) enum Command {
    Set {
        key: String,
        value: String,
    },
    Get {
        key: String,
        reply: oneshot::Sender<Option<String>>,
    },
    Delete {
        key: String,
    },
    Clear,
    Script {
        source: String,
        reply: oneshot::Sender<Result<Vec<LoadResult>, VaultError>>,
    },
    /// Answers once everything queued before it has drained.
    Flush {
        reply: oneshot::Sender<()>,
    },
}

impl Command {
    fn kind(&self) -> &'static str {
        match self {
            Command::Set { .. } => "set",
            Command::Get { .. } => "get",
            Command::Delete { .. } => "delete",
            Command::Clear => "clear",
            Command::Script { .. } => "script",
            Command::Flush { .. } => "flush",
        }
    }
}

pub(crate) struct Pipeline {
    store: Store,
    cipher: SessionCipher,
    compiler: Compiler,
    restorer: Arc<dyn BaselineRestorer>,
    timeout: Duration,
}

impl Pipeline {
    pub(crate) fn new(config: &VaultConfig, restorer: Arc<dyn BaselineRestorer>) -> Self {
        Self {
            store: Store::new(),
            cipher: SessionCipher::new(),
            compiler: Compiler::with_max_lines(config.max_script_lines),
            restorer,
            timeout: config.operation_timeout(),
        }
    }

    /// Drain the queue until every sender is gone.
    pub(crate) async fn run(mut self, mut queue: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = queue.recv().await {
            let kind = command.kind();
            // A panic fails only its own command. Reply channels it held are
            // dropped, so waiting callers see `None` or `Closed`.
            if let Err(panic) = AssertUnwindSafe(self.dispatch(command)).catch_unwind().await {
                error!(
                    command = kind,
                    panic = panic_message(&*panic),
                    "command panicked"
                );
            }
        }
        debug!(entries = self.store.len(), "command queue closed, dropping session");
    }

    async fn dispatch(&mut self, command: Command) {
        let kind = command.kind();
        debug!(command = kind, "dispatch");

        match command {
            Command::Set { key, value } => {
                if let Err(e) = self.set(&key, &value).await {
                    error!(error = %e, command = kind, %key, "command failed");
                }
            }
            Command::Get { key, reply } => {
                let value = match self.get(&key).await {
                    Ok(value) => value,
                    Err(e) => {
                        report_read_failure(&e, &key);
                        None
                    }
                };
                // The caller may have stopped waiting.
                let _ = reply.send(value);
            }
            Command::Delete { key } => {
                if let Err(e) = self.delete(&key) {
                    error!(error = %e, command = kind, %key, "command failed");
                }
            }
            Command::Clear => {
                if let Err(e) = self.clear().await {
                    error!(error = %e, command = kind, "command failed");
                }
            }
            Command::Script { source, reply } => {
                let result = self.script(&source).await;
                if let Err(e) = &result {
                    error!(error = %e, command = kind, "command failed");
                }
                let _ = reply.send(result);
            }
            Command::Flush { reply } => {
                let _ = reply.send(());
            }
        }
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<(), VaultError> {
        let envelope = within(self.timeout, "encrypt", self.cipher.encrypt(value)).await?;
        let bytecode = Instruction::store(key, envelope).encode()?;
        execute(&bytecode, &mut self.store, |_| {})?;
        Ok(())
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>, VaultError> {
        let bytecode = Instruction::load(key).encode()?;
        let mut delivered = None;
        execute(&bytecode, &mut self.store, |result| delivered = result.value)?;

        match delivered {
            Some(envelope) => {
                let plaintext =
                    within(self.timeout, "decrypt", self.cipher.decrypt(&envelope)).await?;
                Ok(Some(plaintext))
            }
            None => Ok(None),
        }
    }

    fn delete(&mut self, key: &str) -> Result<(), VaultError> {
        let bytecode = Instruction::delete(key).encode()?;
        execute(&bytecode, &mut self.store, |_| {})?;
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), VaultError> {
        within(
            self.timeout,
            "restore baseline",
            self.restorer.restore_baseline(&mut self.store),
        )
        .await
    }

    /// Run a textual program through the same cipher boundary as the
    /// single-key calls. Stops at the first failing instruction; earlier
    /// instructions stay applied.
    async fn script(&mut self, source: &str) -> Result<Vec<LoadResult>, VaultError> {
        let instructions = self.compiler.parse(source)?;
        let mut loads = Vec::new();

        for instruction in instructions {
            match instruction {
                Instruction::Store { key, value } => self.set(&key, &value).await?,
                Instruction::Load { key, .. } => {
                    let value = match self.get(&key).await {
                        Ok(value) => value,
                        Err(e) if e.is_unrecoverable_value() => {
                            report_read_failure(&e, &key);
                            None
                        }
                        Err(e) => return Err(e),
                    };
                    loads.push(LoadResult { key, value });
                }
                Instruction::Delete { key } => self.delete(&key)?,
            }
        }
        Ok(loads)
    }
}

fn report_read_failure(e: &VaultError, key: &str) {
    if e.is_unrecoverable_value() {
        warn!(error = %e, %key, "stored value not recoverable");
    } else {
        error!(error = %e, command = "get", %key, "command failed");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Bound one awaited step so a hung collaborator fails its command instead
/// of stalling the queue.
async fn within<T, E, F>(limit: Duration, operation: &'static str, step: F) -> Result<T, VaultError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<VaultError>,
{
    match tokio::time::timeout(limit, step).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(VaultError::Timeout {
            operation,
            after: limit,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restore::ResetStore;

    fn pipeline() -> Pipeline {
        Pipeline::new(&VaultConfig::default(), Arc::new(ResetStore))
    }

    #[tokio::test]
    async fn stores_envelopes_not_plaintext() {
        let mut p = pipeline();
        p.set("k", "plain secret").await.unwrap();
        let stored = p.store.get("k").unwrap();
        assert!(!stored.contains("plain secret"));
        assert_eq!(p.cipher.decrypt(stored).await.unwrap(), "plain secret");
    }

    #[tokio::test]
    async fn keys_are_stored_in_clear() {
        let mut p = pipeline();
        p.set("visible-key", "v").await.unwrap();
        assert!(p.store.contains_key("visible-key"));
    }

    #[tokio::test]
    async fn envelope_from_other_session_reads_as_unrecoverable() {
        let mut p = pipeline();
        let previous_session = SessionCipher::new();
        let foreign = previous_session.encrypt("old value").await.unwrap();
        p.store.upsert("k".into(), foreign);

        let err = p.get("k").await.unwrap_err();
        assert!(err.is_unrecoverable_value());
    }

    #[tokio::test]
    async fn corrupted_envelope_reads_as_none_through_dispatch() {
        let mut p = pipeline();
        p.set("k", "v").await.unwrap();
        p.store.upsert("k".into(), "AAAA".into());

        let (tx, rx) = oneshot::channel();
        p.dispatch(Command::Get {
            key: "k".into(),
            reply: tx,
        })
        .await;
        assert_eq!(rx.await.unwrap(), None);
    }

    #[tokio::test]
    async fn script_runs_through_cipher_boundary() {
        let mut p = pipeline();
        let loads = p
            .script("STOREFAV a first value\nLOADFAV a out\nDELFAV a\nLOADFAV a")
            .await
            .unwrap();
        assert_eq!(
            loads,
            vec![
                LoadResult {
                    key: "a".into(),
                    value: Some("first value".into())
                },
                LoadResult {
                    key: "a".into(),
                    value: None
                },
            ]
        );
    }

    #[tokio::test]
    async fn script_compile_error_changes_nothing() {
        let mut p = pipeline();
        let err = p.script("STOREFAV a 1\nBOGUS").await.unwrap_err();
        assert!(matches!(err, VaultError::Compile(_)));
        assert!(p.store.is_empty());
    }

    #[test]
    fn panic_payloads_are_readable() {
        let literal: Box<dyn Any + Send> = Box::new("static message");
        let formatted: Box<dyn Any + Send> = Box::new(String::from("formatted message"));
        let other: Box<dyn Any + Send> = Box::new(7_u32);
        assert_eq!(panic_message(&*literal), "static message");
        assert_eq!(panic_message(&*formatted), "formatted message");
        assert_eq!(panic_message(&*other), "non-string panic payload");
    }

    #[tokio::test]
    async fn timeout_converts_to_error() {
        let result: Result<(), VaultError> = within(
            Duration::from_millis(10),
            "slow step",
            std::future::pending::<Result<(), VaultError>>(),
        )
        .await;
        assert!(matches!(
            result,
            Err(VaultError::Timeout {
                operation: "slow step",
                ..
            })
        ));
    }
}
