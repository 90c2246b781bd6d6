//! Mock data source for testing without network calls.

use super::{DataSourceError, FeeRequest, PortfolioSource, PriceSource};
use crate::domain::{Address, Network, Pool, PositionId, PositionRecord, UncollectedFees};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// In-memory source that serves predefined positions, pools, fees and prices.
///
/// Networks marked failing return a `NetworkError` from every call.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    positions: Vec<PositionRecord>,
    pools: Vec<Pool>,
    fees: HashMap<PositionId, UncollectedFees>,
    prices: HashMap<Network, Decimal>,
    failing: HashSet<Network>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: PositionRecord) -> Self {
        self.positions.push(position);
        self
    }

    pub fn with_pool(mut self, pool: Pool) -> Self {
        self.pools.push(pool);
        self
    }

    pub fn with_fees(mut self, id: PositionId, fees: UncollectedFees) -> Self {
        self.fees.insert(id, fees);
        self
    }

    pub fn with_native_price(mut self, network: Network, price: Decimal) -> Self {
        self.prices.insert(network, price);
        self
    }

    /// Make every call for `network` fail.
    pub fn failing_on(mut self, network: Network) -> Self {
        self.failing.insert(network);
        self
    }

    fn check(&self, network: Network) -> Result<(), DataSourceError> {
        if self.failing.contains(&network) {
            return Err(DataSourceError::NetworkError(format!(
                "mock failure on {}",
                network
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PortfolioSource for MockDataSource {
    async fn fetch_positions(
        &self,
        network: Network,
        owners: &[Address],
    ) -> Result<Vec<PositionRecord>, DataSourceError> {
        self.check(network)?;
        Ok(self
            .positions
            .iter()
            .filter(|p| p.network == network && owners.contains(&p.owner))
            .cloned()
            .collect())
    }

    async fn fetch_pools(
        &self,
        network: Network,
        pool_addresses: &[Address],
    ) -> Result<Vec<Pool>, DataSourceError> {
        self.check(network)?;
        Ok(self
            .pools
            .iter()
            .filter(|p| p.network == network && pool_addresses.contains(&p.address))
            .cloned()
            .collect())
    }

    async fn fetch_uncollected_fees(
        &self,
        network: Network,
        requests: &[FeeRequest],
    ) -> Result<HashMap<PositionId, UncollectedFees>, DataSourceError> {
        self.check(network)?;
        Ok(requests
            .iter()
            .flat_map(|r| r.positions.iter())
            .filter_map(|p| self.fees.get(&p.id).map(|fees| (p.id, *fees)))
            .collect())
    }
}

#[async_trait]
impl PriceSource for MockDataSource {
    async fn fetch_native_price(&self, network: Network) -> Result<Option<Decimal>, DataSourceError> {
        self.check(network)?;
        Ok(self.prices.get(&network).copied())
    }
}
