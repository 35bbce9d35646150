//! Escrow instance identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Address;

/// Sequential identifier of an escrow instance, assigned by the factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscrowId(u64);

impl EscrowId {
    pub const FIRST: Self = Self(1);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// The identifier after this one, or `None` once the id space is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// The account that holds this escrow's deposit in the asset system.
    pub fn custody_address(&self) -> Address {
        Address::new(format!("escrow:{}", self.0))
    }
}

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "escrow:{}", self.0)
    }
}
