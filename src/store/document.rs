use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::{AccountDefaults, AccountRecord, BalanceStore, StoreError};
use crate::Amount;

/// Account kept as a JSON document on disk.
///
/// Writes go to a sibling temp file which is then renamed over the document,
/// so a reader never sees a half-written record.
pub struct DocumentStore {
    path: PathBuf,
    record: Mutex<AccountRecord>,
    balance: watch::Sender<Amount>,
}

impl DocumentStore {
    /// Open the document at `path`, provisioning it from `defaults` when it does not exist.
    pub async fn open(
        path: impl Into<PathBuf>,
        defaults: &AccountDefaults,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let record = match fs::read(&path).await {
            Ok(bytes) => {
                let record: AccountRecord =
                    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                if record.balance < Amount::ZERO {
                    return Err(StoreError::NegativeBalance(record.balance));
                }
                if record.pin != defaults.pin {
                    warn!(
                        path = %path.display(),
                        "stored PIN differs from the configured PIN, the configured PIN is used"
                    );
                }
                debug!(
                    path = %path.display(),
                    balance = %record.balance,
                    "account document loaded"
                );
                record
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let record = defaults.provision();
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .await
                        .map_err(|source| StoreError::Write {
                            path: path.clone(),
                            source,
                        })?;
                }
                persist(&path, &record).await?;
                info!(
                    path = %path.display(),
                    balance = %record.balance,
                    "new account created"
                );
                record
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        let (balance, _) = watch::channel(record.balance);
        Ok(Self {
            path,
            record: Mutex::new(record),
            balance,
        })
    }

    pub async fn record(&self) -> AccountRecord {
        self.record.lock().await.clone()
    }
}

async fn persist(path: &Path, record: &AccountRecord) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(record)?;
    let tmp = path.with_extension("json.tmp");
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, &bytes).await.map_err(write_err)?;
    fs::rename(&tmp, path).await.map_err(write_err)?;
    Ok(())
}

#[async_trait]
impl BalanceStore for DocumentStore {
    async fn read_balance(&self) -> Result<Amount, StoreError> {
        Ok(self.record.lock().await.balance)
    }

    async fn write_balance(&self, balance: Amount) -> Result<(), StoreError> {
        if balance < Amount::ZERO {
            return Err(StoreError::NegativeBalance(balance));
        }

        let mut record = self.record.lock().await;
        let updated = AccountRecord {
            balance,
            ..record.clone()
        };
        persist(&self.path, &updated).await?;
        *record = updated;
        self.balance.send_replace(balance);

        debug!(path = %self.path.display(), balance = %balance, "balance written");
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Amount> {
        self.balance.subscribe()
    }
}
