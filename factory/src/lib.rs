//! Escrow factory.
//!
//! The only way to create an escrow: burns the creation fee, constructs the
//! instance, forwards the caller's deposit into it and records a `NewTrust`
//! event, all as one unit. The owner can adjust the fee and permanently close
//! the factory to new creations; existing escrows are unaffected.

pub mod config;
pub mod error;
pub mod factory;

pub use config::FactoryConfig;
pub use error::FactoryError;
pub use factory::{CreateEscrow, EscrowFactory};
