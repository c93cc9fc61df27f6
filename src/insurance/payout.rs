use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::primitives::{Address, Amount};

/// Outbound value transfer performed by the host ledger when a passenger withdraws.
///
/// The pool always zeroes the passenger's credit before calling `transfer`, and a
/// returned error reverts the whole withdrawal.
#[cfg_attr(test, mockall::automock)]
pub trait PayoutSink: Send + Sync {
    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), String>;
}

#[derive(Debug, Default)]
struct PayoutLedger {
    balances: HashMap<Address, Amount>,
    transfers: Vec<(Address, Amount)>,
}

/// In-memory sink that credits recipient balances and keeps a transfer log.
///
/// Clones share the same ledger, so a caller can keep a handle after moving one
/// into the facade.
#[derive(Debug, Clone, Default)]
pub struct RecordingPayoutSink {
    inner: Arc<Mutex<PayoutLedger>>,
}

impl RecordingPayoutSink {
    pub fn new() -> Self {
        RecordingPayoutSink::default()
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.inner.lock().balances.get(account).copied().unwrap_or(0)
    }

    pub fn transfers(&self) -> Vec<(Address, Amount)> {
        self.inner.lock().transfers.clone()
    }

    pub fn total_transferred(&self) -> Amount {
        self.inner.lock().transfers.iter().map(|(_, amount)| amount).sum()
    }
}

impl PayoutSink for RecordingPayoutSink {
    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), String> {
        let mut ledger = self.inner.lock();
        let balance = ledger.balances.entry(*to).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| format!("balance overflow for {}", to))?;
        ledger.transfers.push((*to, amount));
        Ok(())
    }
}
