//! favvault: an ephemeral, encrypted key-value store.
//!
//! Values are sealed under a per-session AES-256-GCM key, then written into
//! an in-memory store by a tiny bytecode interpreter. All requests go through
//! one FIFO command queue drained by a single task, so callers may be
//! arbitrarily concurrent while the store sees one command at a time.
//!
//! ```no_run
//! # async fn demo() -> Result<(), favvault::VaultError> {
//! use favvault::{Vault, VaultConfig};
//!
//! let vault = Vault::new(VaultConfig::default());
//! vault.set_item("demoKey", "hello world.")?;
//! assert_eq!(vault.get_item("demoKey").await.as_deref(), Some("hello world."));
//! vault.remove_item("demoKey")?;
//! assert_eq!(vault.get_item("demoKey").await, None);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod pipeline;
pub mod restore;
pub mod vault;

pub use config::VaultConfig;
pub use error::VaultError;
pub use restore::{BaselineRestorer, ResetStore, RestoreError};
pub use vault::Vault;

pub use favvault_crypto::{CryptoError, SessionCipher};
pub use favvault_vm::{CompileError, LoadResult, Store, VmError};
