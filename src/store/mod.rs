//! Account balance storage.
//!
//! The controller only talks to [`BalanceStore`]. Writes replace the balance
//! atomically; every accepted write is pushed to subscribers through a
//! `watch` channel so readers always see the latest value.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::watch;

use crate::Amount;

mod document;
mod memory;

pub use document::DocumentStore;
pub use memory::MemoryStore;

pub const DEFAULT_STARTING_BALANCE: Amount = Amount::from_rupees(5000);
pub const DEFAULT_PIN: &str = "1234";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read account document {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write account document {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("account document {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode account document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("negative balance {0} rejected")]
    NegativeBalance(Amount),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persisted account document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub balance: Amount,
    /// PIN recorded at provisioning. Cards are checked against the configured
    /// PIN ([`crate::controller::Rules::pin`]); a different stored value is
    /// only reported when the document is opened.
    pub pin: String,
    pub created_at: DateTime<Utc>,
}

/// Values used when an account has to be provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDefaults {
    pub starting_balance: Amount,
    pub pin: String,
}

impl Default for AccountDefaults {
    fn default() -> Self {
        Self {
            starting_balance: DEFAULT_STARTING_BALANCE,
            pin: DEFAULT_PIN.to_string(),
        }
    }
}

impl AccountDefaults {
    pub fn provision(&self) -> AccountRecord {
        AccountRecord {
            balance: self.starting_balance,
            pin: self.pin.clone(),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait BalanceStore: Send + Sync {
    async fn read_balance(&self) -> Result<Amount, StoreError>;

    /// Replace the balance. Subscribers see the new value once this returns `Ok`.
    async fn write_balance(&self, balance: Amount) -> Result<(), StoreError>;

    /// Receiver that always holds the most recently stored balance.
    fn subscribe(&self) -> watch::Receiver<Amount>;
}
