//! Pools: canonical keys and on-chain contract state.

use super::primitives::{Address, Network};
use super::token::Token;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order-independent identity of a pool.
///
/// Tokens are stored sorted by address so that `(A, B, fee)` and `(B, A, fee)`
/// produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub network: Network,
    pub token_a: Address,
    pub token_b: Address,
    pub fee_tier: u32,
}

impl PoolKey {
    pub fn new(token_x: &Token, token_y: &Token, fee_tier: u32) -> Self {
        Self::from_addresses(token_x.network, &token_x.address, &token_y.address, fee_tier)
    }

    pub fn from_addresses(network: Network, x: &Address, y: &Address, fee_tier: u32) -> Self {
        let (token_a, token_b) = if x.as_str().as_bytes() <= y.as_str().as_bytes() {
            (x.clone(), y.clone())
        } else {
            (y.clone(), x.clone())
        };
        Self {
            network,
            token_a,
            token_b,
            fee_tier,
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.token_a, self.token_b, self.fee_tier)
    }
}

/// On-chain state of a pool contract.
///
/// `sqrt_price_x96` and `contract_liquidity` are kept as the raw decimal strings
/// delivered by the source; they are parsed during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub address: Address,
    pub network: Network,
    pub token0: Token,
    pub token1: Token,
    pub fee_tier: u32,
    pub tick_spacing: i32,
    pub current_tick: i32,
    pub sqrt_price_x96: String,
    pub contract_liquidity: String,
}

impl Pool {
    pub fn key(&self) -> PoolKey {
        PoolKey::new(&self.token0, &self.token1, self.fee_tier)
    }
}
