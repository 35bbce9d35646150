//! Asset descriptors and the terminal disposal policy tied to them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Address;

/// Which asset an escrow holds. Fixed when the escrow is constructed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// The native currency of the transfer system; value is attached to the call.
    Native,
    /// A fungible token identified by its contract reference.
    Token(Address),
}

impl AssetKind {
    /// The disposal policy an instance of this asset kind uses unless overridden.
    ///
    /// Native escrows self-destruct on revoke; token escrows stay behind as a
    /// zeroed, inert record.
    pub fn default_disposal(&self) -> DisposalPolicy {
        match self {
            AssetKind::Native => DisposalPolicy::Destroy,
            AssetKind::Token(_) => DisposalPolicy::Retain,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Native => write!(f, "native"),
            AssetKind::Token(token) => write!(f, "token:{}", token),
        }
    }
}

/// What happens to an escrow's storage after a successful revoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposalPolicy {
    /// Sweep the whole custody balance to the trustor and deallocate the record.
    Destroy,
    /// Leave a zeroed, permanently inert record.
    Retain,
}
