//! Asset transfer port.

use crate::PortError;
use timelock_types::{Address, Amount};

/// Moves one asset between accounts and reports balances.
///
/// For the native currency the value attached to a call is modelled as a
/// `transfer_from` out of the caller; for a fungible token it is the
/// allowance-style pull. Either way a failed call must leave every balance
/// untouched.
pub trait AssetTransfer: Send + Sync {
    /// Pull `amount` from `from` into `to`.
    fn transfer_from(&self, from: &Address, to: &Address, amount: Amount) -> Result<(), PortError>;

    /// Pay `amount` out of the custody account `custody` to `to`.
    fn transfer(&self, custody: &Address, to: &Address, amount: Amount) -> Result<(), PortError>;

    /// Current balance of `holder`.
    fn balance_of(&self, holder: &Address) -> Amount;
}
