//! Factory-specific errors.

use thiserror::Error;
use timelock_escrow::EscrowError;
use timelock_ports::PortError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FactoryError {
    #[error("factory is closed to new escrows")]
    FactoryClosed,

    #[error("caller is not the factory owner")]
    NotOwner,

    #[error("creation fee burn failed: {0}")]
    FeeBurnFailed(#[source] PortError),

    #[error(transparent)]
    Escrow(#[from] EscrowError),

    #[error("creation failed ({cause}) and the fee could not be reimbursed: {rollback}")]
    RollbackFailed { cause: EscrowError, rollback: PortError },

    #[error("escrow identifier space exhausted")]
    Overflow,

    #[error("configuration error: {0}")]
    Config(String),
}
