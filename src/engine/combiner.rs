use super::aggregator::PoolState;
use super::normalizer::CurrencyNormalizer;
use crate::domain::Network;
use rust_decimal::Decimal;
use tracing::warn;

/// Aggregated pools of one network plus its source's loading flag.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkPools {
    pub network: Network,
    pub loading: bool,
    pub pools: Vec<PoolState>,
}

impl NetworkPools {
    pub fn loading(network: Network) -> Self {
        Self {
            network,
            loading: true,
            pools: Vec::new(),
        }
    }
}

/// All networks merged into one list with totals in the global currency.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedPools {
    /// Sorted by normalized liquidity value, largest first.
    pub pools: Vec<PoolState>,
    pub total_liquidity: Decimal,
    pub total_uncollected_fees: Decimal,
    /// True while any network is still loading.
    pub loading: bool,
    /// True when nothing is loading and there are no pools.
    pub empty: bool,
}

/// Merge per-network pool lists.
///
/// Pools are concatenated in input order and stable-sorted by normalized
/// liquidity descending, so ties keep their input order.
pub fn combine(networks: Vec<NetworkPools>, normalizer: &CurrencyNormalizer) -> CombinedPools {
    let loading = networks.iter().any(|n| n.loading);

    let mut keyed: Vec<(Decimal, PoolState)> = networks
        .into_iter()
        .flat_map(|n| n.pools)
        .map(|pool| (normalizer.convert_to_global(&pool.liquidity_value), pool))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));

    let mut total_liquidity = Decimal::ZERO;
    let mut total_uncollected_fees = Decimal::ZERO;
    for (value, pool) in &keyed {
        let fees = normalizer.convert_to_global(&pool.uncollected_fees_value);
        total_liquidity = saturating_total(total_liquidity, *value, "liquidity");
        total_uncollected_fees = saturating_total(total_uncollected_fees, fees, "uncollected fees");
    }

    let pools: Vec<PoolState> = keyed.into_iter().map(|(_, pool)| pool).collect();
    let empty = !loading && pools.is_empty();

    CombinedPools {
        pools,
        total_liquidity,
        total_uncollected_fees,
        loading,
        empty,
    }
}

/// Every pool stays listed, so a total past `Decimal`'s range is pinned at
/// the bound instead.
fn saturating_total(total: Decimal, value: Decimal, what: &str) -> Decimal {
    total.checked_add(value).unwrap_or_else(|| {
        warn!(total = what, "Combined total overflows, saturating");
        if value.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}
