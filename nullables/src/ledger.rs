//! Nullable asset ledger: thread-safe in-memory balances for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use timelock_ports::{AssetTransfer, PortError};
use timelock_types::{Address, Amount};

/// An in-memory balance sheet for one asset.
///
/// Every transfer is all-or-nothing. Outbound payments can be made to fail on
/// demand with [`NullLedger::fail_payouts`] to exercise rollback paths.
pub struct NullLedger {
    balances: Mutex<HashMap<Address, Amount>>,
    fail_payouts: AtomicBool,
    transfers: Mutex<Vec<(Address, Address, Amount)>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            fail_payouts: AtomicBool::new(false),
            transfers: Mutex::new(Vec::new()),
        }
    }

    /// Credit `amount` to `holder` out of thin air.
    ///
    /// Panics if the holder's balance would overflow.
    pub fn mint(&self, holder: &Address, amount: u128) {
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(holder.clone()).or_default();
        *balance = balance
            .checked_add(Amount::new(amount))
            .expect("minted balance overflows u128");
    }

    /// Make every subsequent `transfer` (payout from custody) fail.
    pub fn fail_payouts(&self, fail: bool) {
        self.fail_payouts.store(fail, Ordering::SeqCst);
    }

    /// Every successful movement as `(from, to, amount)`, in order.
    pub fn transfers(&self) -> Vec<(Address, Address, Amount)> {
        self.transfers.lock().unwrap().clone()
    }

    fn move_funds(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), PortError> {
        let mut balances = self.balances.lock().unwrap();
        let available = balances.get(from).copied().unwrap_or_default();
        let debited = available
            .checked_sub(amount)
            .ok_or(PortError::InsufficientFunds {
                needed: amount.raw(),
                available: available.raw(),
            })?;
        // A self-transfer is a no-op; both sides name the same entry.
        if from != to {
            let credited = balances
                .get(to)
                .copied()
                .unwrap_or_default()
                .checked_add(amount)
                .ok_or(PortError::Overflow)?;
            balances.insert(from.clone(), debited);
            balances.insert(to.clone(), credited);
        }
        drop(balances);
        self.transfers
            .lock()
            .unwrap()
            .push((from.clone(), to.clone(), amount));
        Ok(())
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetTransfer for NullLedger {
    fn transfer_from(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), PortError> {
        self.move_funds(from, to, amount)
    }

    fn transfer(&self, custody: &Address, to: &Address, amount: Amount) -> Result<(), PortError> {
        if self.fail_payouts.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("payouts disabled".into()));
        }
        self.move_funds(custody, to, amount)
    }

    fn balance_of(&self, holder: &Address) -> Amount {
        self.balances
            .lock()
            .unwrap()
            .get(holder)
            .copied()
            .unwrap_or_default()
    }
}
