//! Escrow-specific errors.
//!
//! Every variant aborts the operation with no state change, no asset
//! movement and no event record.

use thiserror::Error;
use timelock_ports::PortError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("escrow has already received its deposit")]
    AlreadyDeposited,

    #[error("escrow has not expired yet")]
    NotYetExpired,

    #[error("escrow has already expired")]
    AlreadyExpired,

    #[error("caller is not authorized for this operation")]
    NotAuthorized,

    #[error("escrow is not revocable")]
    NotRevocable,

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("asset transfer failed: {0}")]
    TransferFailed(#[source] PortError),

    #[error("escrow holds nothing to disburse")]
    NothingToWithdraw,

    #[error("escrow has reached a terminal state")]
    Terminated,

    #[error("invalid beneficiary: {0:?}")]
    InvalidBeneficiary(String),

    #[error("arithmetic overflow in escrow computation")]
    Overflow,

    #[error("escrow has been disposed")]
    Disposed,

    #[error("unsolicited transfer of {amount} from {from} rejected")]
    UnexpectedTransfer { from: String, amount: u128 },

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl From<PortError> for EscrowError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::InsufficientFunds { needed, available } => {
                EscrowError::InsufficientBalance { needed, available }
            }
            other => EscrowError::TransferFailed(other),
        }
    }
}
