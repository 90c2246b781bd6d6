use super::snapshot::PortfolioSnapshot;
use crate::datasource::{DataSourceError, FeePosition, FeeRequest, PortfolioSource, PriceSource};
use crate::domain::{Address, Network, Pool, PositionRecord};
use crate::engine::NetworkInput;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Fetches every configured network concurrently and publishes the latest
/// [`PortfolioSnapshot`].
///
/// A network is flagged loading before its fetch and always resolved after
/// it: on failure it resolves to an empty, non-loading input so the combined
/// view can settle.
#[derive(Debug)]
pub struct Orchestrator {
    source: Arc<dyn PortfolioSource>,
    prices: Arc<dyn PriceSource>,
    networks: Vec<Network>,
    owners: Vec<Address>,
    tx: watch::Sender<PortfolioSnapshot>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn PortfolioSource>,
        prices: Arc<dyn PriceSource>,
        networks: Vec<Network>,
        owners: Vec<Address>,
    ) -> Self {
        let (tx, _rx) = watch::channel(PortfolioSnapshot::loading(&networks));
        Self {
            source,
            prices,
            networks,
            owners,
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PortfolioSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> PortfolioSnapshot {
        self.tx.borrow().clone()
    }

    /// Refetch every network. Each network is published as soon as it resolves.
    pub async fn refresh(&self) {
        self.tx.send_modify(PortfolioSnapshot::mark_loading);

        join_all(self.networks.iter().map(|network| self.refresh_network(*network))).await;

        info!(networks = self.networks.len(), "Portfolio refresh complete");
    }

    async fn refresh_network(&self, network: Network) {
        let (input, price) = tokio::join!(
            self.load_network(network),
            self.prices.fetch_native_price(network)
        );

        let input = input.unwrap_or_else(|e| {
            warn!(%network, error = %e, "Network fetch failed, publishing empty result");
            NetworkInput::empty(network)
        });
        let price = match price {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(%network, error = %e, "Native price fetch failed, keeping previous price");
                None
            }
        };

        self.tx.send_modify(|snapshot| {
            if let Some(price) = price {
                snapshot.prices.set(network, price);
            }
            snapshot.resolve(input);
        });
    }

    /// Positions, then the pools they reference, then uncollected fees. Fee
    /// failures degrade to no fees rather than failing the network.
    pub async fn load_network(&self, network: Network) -> Result<NetworkInput, DataSourceError> {
        let positions = self.source.fetch_positions(network, &self.owners).await?;

        let pool_addresses = pool_addresses(&positions);
        let pools = self.source.fetch_pools(network, &pool_addresses).await?;

        let requests = fee_requests(&positions, &pools);
        let fees = match self.source.fetch_uncollected_fees(network, &requests).await {
            Ok(fees) => fees,
            Err(e) => {
                warn!(%network, error = %e, "Uncollected fee fetch failed, using none");
                HashMap::new()
            }
        };

        debug!(
            %network,
            positions = positions.len(),
            pools = pools.len(),
            fees = fees.len(),
            "Network loaded"
        );

        Ok(NetworkInput {
            network,
            loading: false,
            positions,
            pools,
            fees,
        })
    }

    /// Refresh now and then every `interval` until the task is dropped.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }
}

/// Distinct pool contracts referenced by `positions`, sorted.
fn pool_addresses(positions: &[PositionRecord]) -> Vec<Address> {
    let mut addresses: Vec<Address> = positions.iter().map(|p| p.pool_address.clone()).collect();
    addresses.sort();
    addresses.dedup();
    addresses
}

/// One fee request per fetched pool, listing the positions held in it.
fn fee_requests(positions: &[PositionRecord], pools: &[Pool]) -> Vec<FeeRequest> {
    let ticks: HashMap<&Address, i32> = pools.iter().map(|p| (&p.address, p.current_tick)).collect();

    let mut by_pool: BTreeMap<&Address, Vec<FeePosition>> = BTreeMap::new();
    for position in positions {
        if !ticks.contains_key(&position.pool_address) {
            continue;
        }
        by_pool
            .entry(&position.pool_address)
            .or_default()
            .push(FeePosition {
                id: position.id,
                tick_lower: position.tick_lower,
                tick_upper: position.tick_upper,
            });
    }

    by_pool
        .into_iter()
        .filter_map(|(address, positions)| {
            ticks.get(address).map(|tick| FeeRequest {
                address: address.clone(),
                current_tick: *tick,
                positions,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockDataSource;
    use crate::domain::{PositionId, Token, Transaction, UncollectedFees, UnixSeconds};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn usdc() -> Token {
        Token::new(Network::Arbitrum, "0xFF970A61A04b1cA14834A43f5dE4533eBDDB5CC8", 6, "USDC", "USD Coin")
    }

    fn weth() -> Token {
        Token::new(Network::Arbitrum, "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", 18, "WETH", "Wrapped Ether")
    }

    fn record(id: u64, pool: &str) -> PositionRecord {
        PositionRecord {
            id: PositionId(id),
            network: Network::Arbitrum,
            token0: weth(),
            token1: usdc(),
            fee_tier: 500,
            tick_lower: -887270,
            tick_upper: 887270,
            owner: Address::new("0xowner"),
            pool_address: Address::new(pool),
            transactions: vec![Transaction::add(1_000_000, UnixSeconds::new(1))],
        }
    }

    fn pool(address: &str, tick: i32) -> Pool {
        Pool {
            address: Address::new(address),
            network: Network::Arbitrum,
            token0: weth(),
            token1: usdc(),
            fee_tier: 500,
            tick_spacing: 10,
            current_tick: tick,
            sqrt_price_x96: "3543191142285914205922034323".to_string(),
            contract_liquidity: "1".to_string(),
        }
    }

    fn orchestrator(source: MockDataSource, networks: Vec<Network>) -> Orchestrator {
        let source = Arc::new(source);
        Orchestrator::new(
            source.clone(),
            source,
            networks,
            vec![Address::new("0xowner")],
        )
    }

    #[test]
    fn test_fee_requests_group_by_pool() {
        let positions = vec![record(1, "0xp1"), record(2, "0xp2"), record(3, "0xp1")];
        let requests = fee_requests(&positions, &[pool("0xp1", -5)]);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].current_tick, -5);
        assert_eq!(requests[0].positions.len(), 2);
    }

    #[test]
    fn test_pool_addresses_are_distinct() {
        let positions = vec![record(1, "0xp2"), record(2, "0xp1"), record(3, "0xp2")];
        assert_eq!(
            pool_addresses(&positions),
            vec![Address::new("0xp1"), Address::new("0xp2")]
        );
    }

    #[tokio::test]
    async fn test_refresh_resolves_every_network() {
        let fees = UncollectedFees::new(Decimal::ONE, Decimal::from(20));
        let source = MockDataSource::new()
            .with_position(record(1, "0xp1"))
            .with_pool(pool("0xp1", -200000))
            .with_fees(PositionId(1), fees)
            .with_native_price(Network::Arbitrum, Decimal::from(2000));
        let orchestrator = orchestrator(source, vec![Network::Arbitrum, Network::Ethereum]);
        assert!(orchestrator.snapshot().is_loading());

        orchestrator.refresh().await;

        let snapshot = orchestrator.snapshot();
        assert!(!snapshot.is_loading());
        let arbitrum = snapshot.network(Network::Arbitrum).unwrap();
        assert_eq!(arbitrum.positions.len(), 1);
        assert_eq!(arbitrum.pools.len(), 1);
        assert_eq!(arbitrum.fees.get(&PositionId(1)), Some(&fees));
        assert_eq!(snapshot.prices.get(Network::Arbitrum), Some(Decimal::from(2000)));
        assert!(snapshot.network(Network::Ethereum).unwrap().positions.is_empty());
    }

    #[tokio::test]
    async fn test_failed_network_clears_loading() {
        let source = MockDataSource::new()
            .with_position(record(1, "0xp1"))
            .with_pool(pool("0xp1", 0))
            .failing_on(Network::Optimism);
        let orchestrator = orchestrator(source, vec![Network::Optimism, Network::Arbitrum]);

        orchestrator.refresh().await;

        let snapshot = orchestrator.snapshot();
        let optimism = snapshot.network(Network::Optimism).unwrap();
        assert!(!optimism.loading);
        assert!(optimism.positions.is_empty());
        assert_eq!(snapshot.network(Network::Arbitrum).unwrap().positions.len(), 1);
    }

    /// Serves one price, then fails every later call.
    #[derive(Debug, Default)]
    struct FailsAfterFirstPrice {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for FailsAfterFirstPrice {
        async fn fetch_native_price(&self, _network: Network) -> Result<Option<Decimal>, DataSourceError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(Some(Decimal::from(2000)))
            } else {
                Err(DataSourceError::RateLimited)
            }
        }
    }

    #[tokio::test]
    async fn test_failed_price_fetch_keeps_previous_price() {
        let orchestrator = Orchestrator::new(
            Arc::new(MockDataSource::new()),
            Arc::new(FailsAfterFirstPrice::default()),
            vec![Network::Ethereum],
            vec![Address::new("0xowner")],
        );

        orchestrator.refresh().await;
        assert_eq!(orchestrator.snapshot().prices.get(Network::Ethereum), Some(Decimal::from(2000)));

        orchestrator.refresh().await;
        let snapshot = orchestrator.snapshot();
        assert!(!snapshot.is_loading());
        assert_eq!(snapshot.prices.get(Network::Ethereum), Some(Decimal::from(2000)));
    }

    #[tokio::test]
    async fn test_subscribers_see_resolved_snapshot() {
        let orchestrator = orchestrator(MockDataSource::new(), vec![Network::Ethereum]);
        let mut rx = orchestrator.subscribe();
        assert!(rx.borrow_and_update().is_loading());

        orchestrator.refresh().await;

        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_loading());
    }
}
