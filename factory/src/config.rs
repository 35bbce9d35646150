//! Factory configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use timelock_types::{Address, Amount, AssetKind, DisposalPolicy};
use timelock_utils::LogFormat;

use crate::FactoryError;

/// Configuration owned by one [`EscrowFactory`](crate::EscrowFactory).
///
/// Can be loaded from a TOML file via [`FactoryConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
///
/// ```toml
/// owner = "operator"
/// creation_fee = 250
/// asset = { token = "usdc" }
/// disposal = "retain"
/// log_format = "json"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Fixed for the factory's lifetime; there is no ownership transfer.
    pub owner: Address,

    /// Fee burned from the creator, in raw units of the fee asset.
    ///
    /// TOML integers stop at `i64::MAX`; larger fees are written as a
    /// decimal string (`creation_fee = "340282366920938463463374607431768211455"`).
    #[serde(default, with = "fee_repr")]
    pub creation_fee: Amount,

    /// Overrides the asset kind's default disposal policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposal: Option<DisposalPolicy>,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Asset every escrow from this factory holds.
    // Kept last: a token reference serializes as a TOML table.
    #[serde(default = "default_asset")]
    pub asset: AssetKind,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_asset() -> AssetKind {
    AssetKind::Native
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Integer when TOML can hold it, decimal string otherwise.
mod fee_repr {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use timelock_types::Amount;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(fee: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        match i64::try_from(fee.raw()) {
            Ok(int) => Repr::Int(int),
            Err(_) => Repr::Text(fee.raw().to_string()),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Int(int) => u128::try_from(int)
                .map(Amount::new)
                .map_err(|_| de::Error::custom(format!("negative creation fee {int}"))),
            Repr::Text(text) => text
                .trim()
                .parse::<u128>()
                .map(Amount::new)
                .map_err(|e| de::Error::custom(format!("invalid creation fee {text:?}: {e}"))),
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl FactoryConfig {
    /// A native-currency factory with no fee.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            creation_fee: Amount::ZERO,
            disposal: None,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            asset: default_asset(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, FactoryError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| FactoryError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, FactoryError> {
        let config: Self = toml::from_str(s).map_err(|e| FactoryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, FactoryError> {
        toml::to_string_pretty(self).map_err(|e| FactoryError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), FactoryError> {
        if !self.owner.is_valid() {
            return Err(FactoryError::Config(format!("invalid owner {:?}", self.owner.as_str())));
        }
        if let AssetKind::Token(token) = &self.asset {
            if !token.is_valid() {
                return Err(FactoryError::Config(format!(
                    "invalid token reference {:?}",
                    token.as_str()
                )));
            }
        }
        Ok(())
    }

    /// The disposal policy escrows from this factory will use.
    pub fn effective_disposal(&self) -> DisposalPolicy {
        self.disposal.unwrap_or_else(|| self.asset.default_disposal())
    }

    /// Install the global tracing subscriber described by this configuration.
    ///
    /// Returns `false` if a subscriber was already installed.
    pub fn init_logging(&self) -> bool {
        timelock_utils::try_init_logging(self.log_format, &self.log_level).is_ok()
    }
}
