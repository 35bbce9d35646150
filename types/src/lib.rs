//! Fundamental types for the timelock escrow workspace.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! addresses, amounts, timestamps, escrow identifiers, and asset descriptors.

pub mod address;
pub mod amount;
pub mod asset;
pub mod error;
pub mod id;
pub mod time;

pub use address::Address;
pub use amount::Amount;
pub use asset::{AssetKind, DisposalPolicy};
pub use error::TypesError;
pub use id::EscrowId;
pub use time::Timestamp;
