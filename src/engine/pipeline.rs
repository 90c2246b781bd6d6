//! Pure re-derivation of the portfolio view from network snapshots.
//!
//! Every call starts from scratch: ledger → closed filter → grouping →
//! aggregation per network, then one cross-network combination. Nothing is
//! cached between calls.

use super::aggregator::{aggregate_pools, PoolState};
use super::combiner::{combine, NetworkPools};
use super::grouping::{filter_closed, group_by_pool};
use super::ledger::build_position;
use super::normalizer::{CurrencyNormalizer, PriceSnapshot};
use crate::domain::{
    GlobalCurrency, Network, Pool, PositionId, PositionRecord, TokenAmount, TokenRegistry,
    UncollectedFees,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// User preferences that shape a derivation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationSettings {
    pub global_currency: GlobalCurrency,
    /// Drop positions with zero net liquidity before grouping.
    pub filter_closed: bool,
}

/// Everything one network's sources currently expose.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkInput {
    pub network: Network,
    pub loading: bool,
    pub positions: Vec<PositionRecord>,
    pub pools: Vec<Pool>,
    pub fees: HashMap<PositionId, UncollectedFees>,
}

impl NetworkInput {
    /// Snapshot of a network whose fetch has not finished.
    pub fn loading(network: Network) -> Self {
        Self {
            network,
            loading: true,
            positions: Vec::new(),
            pools: Vec::new(),
            fees: HashMap::new(),
        }
    }

    /// Snapshot of a network that finished with no data (including failures).
    pub fn empty(network: Network) -> Self {
        Self {
            loading: false,
            ..Self::loading(network)
        }
    }
}

/// The combined view handed to consumers. Read-only; rebuilt on every change.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub pools: Vec<PoolState>,
    pub total_liquidity: Decimal,
    pub total_uncollected_fees: Decimal,
    pub loading: bool,
    pub empty: bool,
    normalizer: CurrencyNormalizer,
}

impl Portfolio {
    pub fn normalizer(&self) -> &CurrencyNormalizer {
        &self.normalizer
    }

    pub fn convert_to_global(&self, value: &TokenAmount) -> Decimal {
        self.normalizer.convert_to_global(value)
    }

    pub fn try_convert_to_global(&self, value: &TokenAmount) -> Option<Decimal> {
        self.normalizer.try_convert_to_global(value)
    }

    pub fn convert_to_global_formatted(&self, value: &TokenAmount) -> String {
        self.normalizer.convert_to_global_formatted(value)
    }

    pub fn format_with_symbol(&self, value: Decimal, network: Network) -> String {
        self.normalizer.format_with_symbol(value, network)
    }
}

/// Derive one network's pool states.
pub fn derive_network(
    input: NetworkInput,
    settings: &AggregationSettings,
    normalizer: &CurrencyNormalizer,
) -> NetworkPools {
    let NetworkInput {
        network,
        loading,
        positions,
        pools,
        fees,
    } = input;

    let positions: Vec<_> = positions.into_iter().map(build_position).collect();
    let total = positions.len();
    let positions = filter_closed(positions, settings.filter_closed);
    let groups = group_by_pool(positions);
    let pool_states = aggregate_pools(groups, &pools, &fees, normalizer);

    debug!(
        %network,
        loading,
        positions = total,
        pools = pool_states.len(),
        "Derived network pool states"
    );

    NetworkPools {
        network,
        loading,
        pools: pool_states,
    }
}

/// Derive the combined portfolio from every network's snapshot.
pub fn derive_portfolio(
    inputs: Vec<NetworkInput>,
    settings: &AggregationSettings,
    registry: Arc<TokenRegistry>,
    prices: PriceSnapshot,
) -> Portfolio {
    let normalizer = CurrencyNormalizer::new(registry, settings.global_currency, prices);

    let networks = inputs
        .into_iter()
        .map(|input| derive_network(input, settings, &normalizer))
        .collect();
    let combined = combine(networks, &normalizer);

    Portfolio {
        pools: combined.pools,
        total_liquidity: combined.total_liquidity,
        total_uncollected_fees: combined.total_uncollected_fees,
        loading: combined.loading,
        empty: combined.empty,
        normalizer,
    }
}
