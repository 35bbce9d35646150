//! Time-locked, single-beneficiary escrow.
//!
//! A trustor deposits value once; the beneficiary can claim it only strictly
//! after the expiration instant. A revocable escrow lets the trustor, strictly
//! before expiration, take the value back, retarget the beneficiary or
//! reschedule the expiration.
//!
//! ```text
//! Created ──deposit──▶ Funded ──revoke (pre-expiration)──▶ Revoked
//!                        │
//!                        └──withdraw (post-expiration)──▶ Withdrawn
//! ```
//!
//! Every instance serialises its transitions behind its own lock, applies
//! its effects before calling the asset port, and rolls them back if the
//! port refuses the transfer.

pub mod error;
pub mod event;
mod guard;
pub mod instance;
pub mod snapshot;

pub use error::EscrowError;
pub use event::{EscrowEvent, EventLog, EventRecord};
pub use instance::{EscrowContext, EscrowInstance, EscrowParams, EscrowStatus, EscrowView};
pub use snapshot::EscrowSnapshot;
