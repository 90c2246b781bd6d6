use crate::domain::{Network, TokenRegistry};
use crate::engine::{derive_portfolio, AggregationSettings, NetworkInput, Portfolio, PriceSnapshot};
use std::sync::Arc;

/// Latest fetched state of every configured network.
///
/// Networks keep the order they were configured in.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
    pub networks: Vec<NetworkInput>,
    pub prices: PriceSnapshot,
}

impl PortfolioSnapshot {
    /// Every network loading, nothing fetched yet.
    pub fn loading(networks: &[Network]) -> Self {
        Self {
            networks: networks.iter().map(|n| NetworkInput::loading(*n)).collect(),
            prices: PriceSnapshot::new(),
        }
    }

    pub fn network(&self, network: Network) -> Option<&NetworkInput> {
        self.networks.iter().find(|n| n.network == network)
    }

    /// Flag every network as loading while keeping its previous data.
    pub fn mark_loading(&mut self) {
        for input in &mut self.networks {
            input.loading = true;
        }
    }

    /// Replace one network's data. Unknown networks are appended.
    pub fn resolve(&mut self, input: NetworkInput) {
        match self.networks.iter_mut().find(|n| n.network == input.network) {
            Some(slot) => *slot = input,
            None => self.networks.push(input),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.networks.iter().any(|n| n.loading)
    }

    pub fn derive(&self, settings: &AggregationSettings, registry: Arc<TokenRegistry>) -> Portfolio {
        derive_portfolio(
            self.networks.clone(),
            settings,
            registry,
            self.prices.clone(),
        )
    }
}
