//! LP positions: the raw record as delivered and the ledger-derived position.

use super::pool::PoolKey;
use super::primitives::{Address, Network, PositionId};
use super::token::Token;
use super::transaction::Transaction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A position exactly as the fetch collaborator delivers it.
///
/// `transactions` is in the source's insertion order, which is chronological.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: PositionId,
    pub network: Network,
    pub token0: Token,
    pub token1: Token,
    pub fee_tier: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub owner: Address,
    pub pool_address: Address,
    pub transactions: Vec<Transaction>,
}

/// A position with its net liquidity reconstructed from the event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub network: Network,
    pub token0: Token,
    pub token1: Token,
    pub fee_tier: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub owner: Address,
    pub pool_address: Address,
    pub transactions: Vec<Transaction>,
    /// Signed sum of deltas. Negative means the upstream history is inconsistent.
    pub net_liquidity: i128,
}

impl Position {
    pub fn pool_key(&self) -> PoolKey {
        PoolKey::new(&self.token0, &self.token1, self.fee_tier)
    }

    /// Closed positions have had all liquidity removed.
    pub fn is_closed(&self) -> bool {
        self.net_liquidity == 0
    }

    pub fn has_valid_range(&self) -> bool {
        self.tick_lower < self.tick_upper
    }
}

/// Fees accrued to a position and not yet withdrawn, in human token units and
/// in the pool's token order.
///
/// Produced by the external fee-estimation collaborator; the engine never
/// derives these from fee-growth accounting itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncollectedFees {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount0: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount1: Decimal,
}

impl UncollectedFees {
    pub fn new(amount0: Decimal, amount1: Decimal) -> Self {
        Self { amount0, amount1 }
    }
}
