//! ERC-20 style tokens and token-denominated amounts.

use super::primitives::{Address, Network};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A token contract on a specific network.
///
/// Two tokens are equal when they live on the same network at the same
/// (normalized) address; symbol, name and decimals are descriptive only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub network: Network,
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
}

impl Token {
    pub fn new(
        network: Network,
        address: impl AsRef<str>,
        decimals: u8,
        symbol: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            network,
            address: Address::new(address),
            decimals,
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.network == other.network && self.address == other.address
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.network.hash(state);
        self.address.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.symbol, self.address)
    }
}

/// An amount of a token in human units (raw amount divided by `10^decimals`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: Token,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl TokenAmount {
    pub fn new(token: Token, amount: Decimal) -> Self {
        Self { token, amount }
    }

    pub fn network(&self) -> Network {
        self.token.network
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.normalize(), self.token.symbol)
    }
}
