//! Fee collector port.

use crate::PortError;
use timelock_types::{Address, Amount};

/// Validates and destroys the creation fee, paid in a separate fungible asset.
///
/// The factory treats it as a pass/fail oracle.
pub trait FeeCollector: Send + Sync {
    /// Burn `amount` of the fee asset held by `payer`.
    fn burn(&self, payer: &Address, amount: Amount) -> Result<(), PortError>;

    /// Restore a fee burned for a creation that was subsequently rolled back.
    fn reimburse(&self, payer: &Address, amount: Amount) -> Result<(), PortError>;
}
