//! Abstract collaborator traits for the timelock escrow.
//!
//! The escrow never moves value or reads the time itself. Every asset
//! system (native currency, fungible token, in-memory for testing) and every
//! fee collector implements these traits; the rest of the workspace depends
//! only on the traits.

pub mod asset;
pub mod clock;
pub mod error;
pub mod fee;

pub use asset::AssetTransfer;
pub use clock::{Clock, SystemClock};
pub use error::PortError;
pub use fee::FeeCollector;
