//! Pure computation engine for the portfolio view.
//!
//! Nothing here performs I/O or keeps state between calls; every function is a
//! derivation over the snapshots it is given.

pub mod aggregator;
pub mod combiner;
pub mod grouping;
pub mod ledger;
pub mod liquidity;
pub mod normalizer;
pub mod pipeline;

pub use aggregator::{aggregate_pools, pick_base_token, PoolState, PositionValue};
pub use combiner::{combine, CombinedPools, NetworkPools};
pub use grouping::{filter_closed, group_by_pool};
pub use ledger::{build_position, net_liquidity, PositionLedger};
pub use normalizer::{format_currency, CurrencyNormalizer, PriceSnapshot};
pub use pipeline::{derive_network, derive_portfolio, AggregationSettings, NetworkInput, Portfolio};
