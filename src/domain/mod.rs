//! Domain types for the LP portfolio engine.
//!
//! This module provides:
//! - Primitives: Network, Address, PositionId, UnixSeconds
//! - Tokens and token-denominated amounts
//! - Position event history, raw position records and ledger-derived positions
//! - Canonical pool keys and pool contract state
//! - Per-network token tables driving currency normalization

pub mod pool;
pub mod position;
pub mod primitives;
pub mod registry;
pub mod token;
pub mod transaction;

pub use pool::{Pool, PoolKey};
pub use position::{Position, PositionRecord, UncollectedFees};
pub use primitives::{Address, AddressParseError, Network, PositionId, UnixSeconds};
pub use registry::{
    GlobalCurrency, NetworkTokens, RegistryError, TokenRegistry, POLYGON_NATIVE_USD_FALLBACK,
};
pub use token::{Token, TokenAmount};
pub use transaction::{Transaction, TxType};
