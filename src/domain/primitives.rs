//! Domain primitives: Network, Address, PositionId, UnixSeconds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Blockchain network the portfolio spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Optimism,
    Arbitrum,
    Polygon,
}

impl Network {
    /// Every network the engine knows about, in chain-id order.
    pub const ALL: [Network; 4] = [
        Network::Ethereum,
        Network::Optimism,
        Network::Polygon,
        Network::Arbitrum,
    ];

    /// Network used when a chain id is not recognized.
    pub const BASELINE: Network = Network::Ethereum;

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Optimism => 10,
            Network::Polygon => 137,
            Network::Arbitrum => 42161,
        }
    }

    pub fn try_from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(Network::Ethereum),
            10 => Some(Network::Optimism),
            137 => Some(Network::Polygon),
            42161 => Some(Network::Arbitrum),
            _ => None,
        }
    }

    /// Resolve a chain id, falling back to [`Network::BASELINE`] for unknown ids.
    pub fn from_chain_id_or_default(chain_id: u64) -> Self {
        Self::try_from_chain_id(chain_id).unwrap_or_else(|| {
            tracing::warn!(chain_id, fallback = %Self::BASELINE, "Unknown chain id, using baseline network");
            Self::BASELINE
        })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Ethereum => "ethereum",
            Network::Optimism => "optimism",
            Network::Polygon => "polygon",
            Network::Arbitrum => "arbitrum",
        };
        write!(f, "{}", name)
    }
}

/// On-chain address (hex string), normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Create an Address, normalizing it to lowercase.
    pub fn new(addr: impl AsRef<str>) -> Self {
        Address(addr.as_ref().trim().to_ascii_lowercase())
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Address::new(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct AddressParseError(pub String);

impl FromStr for Address {
    type Err = AddressParseError;

    /// Parse a `0x`-prefixed hex address.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError(s.to_string()))?;
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError(s.to_string()));
        }
        Ok(Address::new(trimmed))
    }
}

/// Identifier of an LP position (the position NFT token id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time in seconds since Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UnixSeconds(pub i64);

impl UnixSeconds {
    pub fn new(secs: i64) -> Self {
        UnixSeconds(secs)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}
