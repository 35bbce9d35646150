//! Party identity used for trustors, beneficiaries, owners and custody accounts.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TypesError;

/// An opaque party identity.
///
/// The empty string is the null identity; it is never a valid escrow
/// participant.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create an address from a raw string without validating it.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Create an address, rejecting the null identity and embedded whitespace.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypesError> {
        let address = Self(raw.into());
        if address.is_valid() {
            Ok(address)
        } else {
            Err(TypesError::InvalidAddress(address.0))
        }
    }

    /// The null identity.
    pub fn null() -> Self {
        Self(String::new())
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate that this address is well-formed.
    pub fn is_valid(&self) -> bool {
        !self.is_null() && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
