//! Liquidity events recorded against a position.

use super::primitives::UnixSeconds;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a position event.
///
/// The wire encoding is an integer code: `0` adds liquidity, `1` removes it.
/// Any other code is kept as `Unrecognized` so it can be reported and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum TxType {
    Add,
    Remove,
    Unrecognized(i64),
}

impl TxType {
    pub const ADD_CODE: i64 = 0;
    pub const REMOVE_CODE: i64 = 1;

    pub fn code(&self) -> i64 {
        match self {
            TxType::Add => Self::ADD_CODE,
            TxType::Remove => Self::REMOVE_CODE,
            TxType::Unrecognized(code) => *code,
        }
    }
}

impl From<i64> for TxType {
    fn from(code: i64) -> Self {
        match code {
            Self::ADD_CODE => TxType::Add,
            Self::REMOVE_CODE => TxType::Remove,
            other => TxType::Unrecognized(other),
        }
    }
}

impl From<TxType> for i64 {
    fn from(value: TxType) -> Self {
        value.code()
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxType::Add => write!(f, "add"),
            TxType::Remove => write!(f, "remove"),
            TxType::Unrecognized(code) => write!(f, "unrecognized({})", code),
        }
    }
}

/// A single add/remove event. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_type: TxType,
    /// Unsigned liquidity magnitude; the sign comes from `tx_type`.
    pub liquidity_delta: u128,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount0: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount1: Decimal,
    pub timestamp: UnixSeconds,
    pub tx_hash: String,
    pub gas: u64,
    pub gas_price: u128,
}

impl Transaction {
    /// Build an event with only the fields that matter for the ledger.
    pub fn new(tx_type: TxType, liquidity_delta: u128, timestamp: UnixSeconds) -> Self {
        Self {
            tx_type,
            liquidity_delta,
            amount0: Decimal::ZERO,
            amount1: Decimal::ZERO,
            timestamp,
            tx_hash: String::new(),
            gas: 0,
            gas_price: 0,
        }
    }

    pub fn add(liquidity_delta: u128, timestamp: UnixSeconds) -> Self {
        Self::new(TxType::Add, liquidity_delta, timestamp)
    }

    pub fn remove(liquidity_delta: u128, timestamp: UnixSeconds) -> Self {
        Self::new(TxType::Remove, liquidity_delta, timestamp)
    }

    /// Gas paid for this transaction in wei.
    pub fn gas_cost_wei(&self) -> Option<u128> {
        u128::from(self.gas).checked_mul(self.gas_price)
    }
}
