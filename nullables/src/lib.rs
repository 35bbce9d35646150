//! Nullable infrastructure for deterministic testing.
//!
//! All external collaborators of the escrow (clock, asset ledger, fee
//! collector) are abstracted behind traits in `timelock-ports`. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod fee;
pub mod ledger;

pub use clock::NullClock;
pub use fee::NullFeeCollector;
pub use ledger::NullLedger;
