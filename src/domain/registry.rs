//! Per-network token tables used by currency normalization.
//!
//! The tables are data: a built-in default for every [`Network`], optionally
//! overridden per network from a JSON file. Adding a stable asset means adding
//! an address to `stable_equivalents`, not touching the normalizer.

use super::primitives::{Address, Network};
use super::token::Token;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Approximate MATIC/USD rate applied when Polygon has no live native price.
///
/// This is a fixed approximation, not market data.
pub const POLYGON_NATIVE_USD_FALLBACK: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

/// Display currency selected by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalCurrency {
    /// The network's stable-value reference token.
    #[default]
    Usd,
    /// The network's wrapped native asset.
    Native,
}

impl std::str::FromStr for GlobalCurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(GlobalCurrency::Usd),
            "native" | "eth" => Ok(GlobalCurrency::Native),
            other => Err(format!("must be usd or native, got {}", other)),
        }
    }
}

/// Token table for one network.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkTokens {
    pub network: Network,
    pub stable_reference: Token,
    pub wrapped_native: Token,
    /// Tokens treated as at parity with `stable_reference`. Includes it.
    pub stable_equivalents: HashSet<Address>,
    /// Used when the price collaborator has no live native price.
    pub native_price_fallback: Option<Decimal>,
    /// Symbol shown when values are denominated in the native asset.
    pub native_symbol: String,
}

impl NetworkTokens {
    pub fn is_stable(&self, token: &Token) -> bool {
        token.network == self.network && self.stable_equivalents.contains(&token.address)
    }

    pub fn is_wrapped_native(&self, token: &Token) -> bool {
        *token == self.wrapped_native
    }

    pub fn global_token(&self, currency: GlobalCurrency) -> &Token {
        match currency {
            GlobalCurrency::Usd => &self.stable_reference,
            GlobalCurrency::Native => &self.wrapped_native,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read token registry {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid token registry: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Token tables for every known network.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    // One slot per network, indexed by `slot()`.
    tables: Vec<NetworkTokens>,
}

impl TokenRegistry {
    /// Look up a network's table. Every [`Network`] has one.
    pub fn tokens(&self, network: Network) -> &NetworkTokens {
        &self.tables[slot(network)]
    }

    /// Replace a network's table.
    pub fn with_network(mut self, table: NetworkTokens) -> Self {
        let idx = slot(table.network);
        self.tables[idx] = table;
        self
    }

    /// Built-in tables overridden by the entries found in a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        let mut registry = Self::default();
        for entry in file.networks {
            let table = entry.into_table();
            tracing::debug!(network = %table.network, stables = table.stable_equivalents.len(), "Token table override loaded");
            registry = registry.with_network(table);
        }
        Ok(registry)
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        let tables = Network::ALL.iter().map(|n| builtin_table(*n)).collect();
        Self { tables }
    }
}

// Position of the network in `Network::ALL`.
fn slot(network: Network) -> usize {
    match network {
        Network::Ethereum => 0,
        Network::Optimism => 1,
        Network::Polygon => 2,
        Network::Arbitrum => 3,
    }
}

fn builtin_table(network: Network) -> NetworkTokens {
    let (stable, native, extra_stables, fallback, symbol): (
        Token,
        Token,
        &[&str],
        Option<Decimal>,
        &str,
    ) = match network {
        Network::Ethereum => (
            Token::new(network, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6, "USDC", "USD Coin"),
            Token::new(network, "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 18, "WETH", "Wrapped Ether"),
            &[
                "0x6B175474E89094C44Da98b954EedeAC495271d0F", // DAI
                "0xdAC17F958D2ee523a2206206994597C13D831ec7", // USDT
                "0x8E870D67F660D95d5be530380D0eC0bd388289E1", // PAX
                "0x956F47F50A910163D8BF957Cf5846D573E7f87CA", // FEI
            ],
            None,
            "Ξ",
        ),
        Network::Optimism => (
            Token::new(network, "0x7F5c764cBc14f9669B88837ca1490cCa17c31607", 6, "USDC", "USD Coin"),
            Token::new(network, "0x4200000000000000000000000000000000000006", 18, "WETH", "Wrapped Ether"),
            &[
                "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1",
                "0x94b008aA00579c1307B0EF2c499aD98a8ce58e58",
            ],
            None,
            "Ξ",
        ),
        Network::Arbitrum => (
            Token::new(network, "0xFF970A61A04b1cA14834A43f5dE4533eBDDB5CC8", 6, "USDC", "USD Coin"),
            Token::new(network, "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", 18, "WETH", "Wrapped Ether"),
            &[
                "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1",
                "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9",
            ],
            None,
            "Ξ",
        ),
        Network::Polygon => (
            Token::new(network, "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", 6, "USDC", "USD Coin"),
            Token::new(network, "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270", 18, "WMATIC", "Wrapped Matic"),
            &[
                "0x8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063",
                "0xc2132D05D31c914a87C6611C10748AEb04B58e8F",
            ],
            Some(POLYGON_NATIVE_USD_FALLBACK),
            "MATIC",
        ),
    };

    let mut stable_equivalents: HashSet<Address> =
        extra_stables.iter().map(Address::new).collect();
    stable_equivalents.insert(stable.address.clone());

    NetworkTokens {
        network,
        stable_reference: stable,
        wrapped_native: native,
        stable_equivalents,
        native_price_fallback: fallback,
        native_symbol: symbol.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    networks: Vec<NetworkTokensEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkTokensEntry {
    network: Network,
    stable_reference: TokenEntry,
    wrapped_native: TokenEntry,
    #[serde(default)]
    stable_equivalents: Vec<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    native_price_fallback: Option<Decimal>,
    #[serde(default = "default_native_symbol")]
    native_symbol: String,
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
    address: String,
    decimals: u8,
    symbol: String,
    #[serde(default)]
    name: String,
}

fn default_native_symbol() -> String {
    "Ξ".to_string()
}

impl TokenEntry {
    fn into_token(self, network: Network) -> Token {
        Token::new(network, self.address, self.decimals, self.symbol, self.name)
    }
}

impl NetworkTokensEntry {
    fn into_table(self) -> NetworkTokens {
        let network = self.network;
        let stable_reference = self.stable_reference.into_token(network);
        let mut stable_equivalents: HashSet<Address> =
            self.stable_equivalents.iter().map(Address::new).collect();
        stable_equivalents.insert(stable_reference.address.clone());

        NetworkTokens {
            network,
            stable_reference,
            wrapped_native: self.wrapped_native.into_token(network),
            stable_equivalents,
            native_price_fallback: self.native_price_fallback,
            native_symbol: self.native_symbol,
        }
    }
}
