//! Nullable fee collector: burns from an in-memory fee-asset balance sheet.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use timelock_ports::{FeeCollector, PortError};
use timelock_types::{Address, Amount};

/// A fee collector backed by in-memory balances of the fee asset.
pub struct NullFeeCollector {
    balances: Mutex<HashMap<Address, Amount>>,
    burned: Mutex<Amount>,
    fail_reimburse: AtomicBool,
}

impl NullFeeCollector {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            burned: Mutex::new(Amount::ZERO),
            fail_reimburse: AtomicBool::new(false),
        }
    }

    /// Give `holder` some of the fee asset.
    ///
    /// Panics if the holder's balance would overflow.
    pub fn mint(&self, holder: &Address, amount: u128) {
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(holder.clone()).or_default();
        *balance = balance
            .checked_add(Amount::new(amount))
            .expect("minted fee balance overflows u128");
    }

    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.balances
            .lock()
            .unwrap()
            .get(holder)
            .copied()
            .unwrap_or_default()
            .raw()
    }

    /// Total destroyed so far, net of reimbursements.
    pub fn total_burned(&self) -> u128 {
        self.burned.lock().unwrap().raw()
    }

    /// Make every subsequent reimbursement fail.
    pub fn fail_reimburse(&self, fail: bool) {
        self.fail_reimburse.store(fail, Ordering::SeqCst);
    }
}

impl Default for NullFeeCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl FeeCollector for NullFeeCollector {
    fn burn(&self, payer: &Address, amount: Amount) -> Result<(), PortError> {
        let mut balances = self.balances.lock().unwrap();
        let available = balances.get(payer).copied().unwrap_or_default();
        let remaining = available
            .checked_sub(amount)
            .ok_or(PortError::InsufficientFunds {
                needed: amount.raw(),
                available: available.raw(),
            })?;
        let mut burned = self.burned.lock().unwrap();
        *burned = burned.checked_add(amount).ok_or(PortError::Overflow)?;
        balances.insert(payer.clone(), remaining);
        Ok(())
    }

    fn reimburse(&self, payer: &Address, amount: Amount) -> Result<(), PortError> {
        if self.fail_reimburse.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("reimbursement disabled".into()));
        }
        let mut balances = self.balances.lock().unwrap();
        let mut burned = self.burned.lock().unwrap();
        let left = burned.checked_sub(amount).ok_or_else(|| {
            PortError::Rejected(format!("cannot reimburse {} more than burned", amount))
        })?;
        let balance = balances.entry(payer.clone()).or_default();
        *balance = balance.checked_add(amount).ok_or(PortError::Overflow)?;
        *burned = left;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burn_requires_balance() {
        let fees = NullFeeCollector::new();
        let payer = Address::new("alice");
        fees.mint(&payer, 200);
        assert!(fees.burn(&payer, Amount::new(300)).is_err());
        assert_eq!(fees.balance_of(&payer), 200);
        assert_eq!(fees.total_burned(), 0);

        fees.burn(&payer, Amount::new(150)).unwrap();
        assert_eq!(fees.balance_of(&payer), 50);
        assert_eq!(fees.total_burned(), 150);
    }

    #[test]
    fn reimburse_restores_burned_fee() {
        let fees = NullFeeCollector::new();
        let payer = Address::new("alice");
        fees.mint(&payer, 100);
        fees.burn(&payer, Amount::new(100)).unwrap();
        fees.reimburse(&payer, Amount::new(100)).unwrap();
        assert_eq!(fees.balance_of(&payer), 100);
        assert_eq!(fees.total_burned(), 0);
    }

    #[test]
    fn failing_reimbursement_keeps_fee_burned() {
        let fees = NullFeeCollector::new();
        let payer = Address::new("alice");
        fees.mint(&payer, 10);
        fees.burn(&payer, Amount::new(10)).unwrap();
        fees.fail_reimburse(true);
        assert!(fees.reimburse(&payer, Amount::new(10)).is_err());
        assert_eq!(fees.total_burned(), 10);
        fees.fail_reimburse(false);
        fees.reimburse(&payer, Amount::new(10)).unwrap();
        assert_eq!(fees.balance_of(&payer), 10);
    }

    #[test]
    fn cannot_reimburse_more_than_burned() {
        let fees = NullFeeCollector::new();
        let payer = Address::new("alice");
        assert!(matches!(
            fees.reimburse(&payer, Amount::new(1)),
            Err(PortError::Rejected(_))
        ));
        assert_eq!(fees.balance_of(&payer), 0);
    }
}
