use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::{AccountDefaults, AccountRecord, BalanceStore, StoreError};
use crate::Amount;

/// Balance store that lives only as long as the process.
pub struct MemoryStore {
    record: Mutex<AccountRecord>,
    balance: watch::Sender<Amount>,
}

impl MemoryStore {
    pub fn new(record: AccountRecord) -> Self {
        let (balance, _) = watch::channel(record.balance);
        Self {
            record: Mutex::new(record),
            balance,
        }
    }

    pub fn with_balance(balance: Amount) -> Self {
        Self::new(AccountDefaults {
            starting_balance: balance,
            ..AccountDefaults::default()
        }
        .provision())
    }

    pub fn record(&self) -> AccountRecord {
        self.lock().clone()
    }

    /// Change the balance as if another client had written it.
    pub fn push_external(&self, balance: Amount) {
        self.lock().balance = balance;
        self.balance.send_replace(balance);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AccountRecord> {
        // a poisoned lock still holds a consistent record
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(AccountDefaults::default().provision())
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn read_balance(&self) -> Result<Amount, StoreError> {
        Ok(self.lock().balance)
    }

    async fn write_balance(&self, balance: Amount) -> Result<(), StoreError> {
        if balance < Amount::ZERO {
            return Err(StoreError::NegativeBalance(balance));
        }
        self.lock().balance = balance;
        self.balance.send_replace(balance);
        debug!(balance = %balance, "balance stored in memory");
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Amount> {
        self.balance.subscribe()
    }
}
