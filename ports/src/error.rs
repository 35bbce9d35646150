use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u128, available: u128 },

    #[error("balance overflow")]
    Overflow,

    #[error("operation rejected by collaborator: {0}")]
    Rejected(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}
