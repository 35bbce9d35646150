//! Composable precondition checks, applied at the top of each operation.
//!
//! Time guards read the clock themselves so no two guards share a stale `now`.

use timelock_ports::Clock;
use timelock_types::{Address, Amount};

use crate::error::EscrowError;
use crate::instance::{EscrowState, EscrowStatus};

pub(crate) fn not_disposed(state: &EscrowState) -> Result<(), EscrowError> {
    if state.disposed {
        return Err(EscrowError::Disposed);
    }
    Ok(())
}

pub(crate) fn not_deposited(state: &EscrowState) -> Result<(), EscrowError> {
    if state.already_deposited {
        return Err(EscrowError::AlreadyDeposited);
    }
    Ok(())
}

pub(crate) fn not_terminated(state: &EscrowState) -> Result<(), EscrowError> {
    if state.status.is_terminal() {
        return Err(EscrowError::Terminated);
    }
    Ok(())
}

pub(crate) fn non_zero(amount: Amount) -> Result<(), EscrowError> {
    if amount.is_zero() {
        return Err(EscrowError::ZeroAmount);
    }
    Ok(())
}

pub(crate) fn only(expected: &Address, caller: &Address) -> Result<(), EscrowError> {
    if expected != caller {
        return Err(EscrowError::NotAuthorized);
    }
    Ok(())
}

pub(crate) fn revocable(revocable: bool) -> Result<(), EscrowError> {
    if !revocable {
        return Err(EscrowError::NotRevocable);
    }
    Ok(())
}

/// `now < expiration`.
pub(crate) fn before_expiration(state: &EscrowState, clock: &dyn Clock) -> Result<(), EscrowError> {
    if clock.now() >= state.expiration {
        return Err(EscrowError::AlreadyExpired);
    }
    Ok(())
}

/// `now > expiration`.
pub(crate) fn after_expiration(state: &EscrowState, clock: &dyn Clock) -> Result<(), EscrowError> {
    if clock.now() <= state.expiration {
        return Err(EscrowError::NotYetExpired);
    }
    Ok(())
}

/// The escrow is funded and still holds its deposit. Returns the held amount.
pub(crate) fn funded(state: &EscrowState) -> Result<Amount, EscrowError> {
    if state.status != EscrowStatus::Funded || state.deposited_amount.is_zero() {
        return Err(EscrowError::NothingToWithdraw);
    }
    Ok(state.deposited_amount)
}

pub(crate) fn valid_beneficiary(beneficiary: &Address) -> Result<(), EscrowError> {
    if !beneficiary.is_valid() {
        return Err(EscrowError::InvalidBeneficiary(beneficiary.as_str().to_string()));
    }
    Ok(())
}
