//! Data source abstraction for fetching positions, pool state, uncollected fees
//! and native prices from external services.

use crate::domain::{Address, Network, Pool, PositionId, PositionRecord, UncollectedFees};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub mod http;
pub mod mock;
pub mod subgraph;

pub use http::HttpDataSource;
pub use mock::MockDataSource;
pub use subgraph::SubgraphPriceSource;

/// One position whose uncollected fees are requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePosition {
    #[serde(rename = "tokenId")]
    pub id: PositionId,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

/// Fee request for all tracked positions in one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRequest {
    pub address: Address,
    pub current_tick: i32,
    pub positions: Vec<FeePosition>,
}

/// Per-network position, pool and fee fetcher.
///
/// Implementations handle retry/backoff; callers treat any error as "this
/// network has no data for now".
#[async_trait]
pub trait PortfolioSource: Send + Sync + fmt::Debug {
    /// Fetch every position owned by `owners` on `network`.
    async fn fetch_positions(
        &self,
        network: Network,
        owners: &[Address],
    ) -> Result<Vec<PositionRecord>, DataSourceError>;

    /// Fetch current on-chain state for the given pool contracts.
    async fn fetch_pools(
        &self,
        network: Network,
        pool_addresses: &[Address],
    ) -> Result<Vec<Pool>, DataSourceError>;

    /// Fetch uncollected fees, keyed by position id.
    async fn fetch_uncollected_fees(
        &self,
        network: Network,
        requests: &[FeeRequest],
    ) -> Result<HashMap<PositionId, UncollectedFees>, DataSourceError>;
}

/// Live native-asset price feed.
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// USD price of the network's native asset, or `None` when the network has
    /// no feed.
    async fn fetch_native_price(&self, network: Network) -> Result<Option<Decimal>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, Error)]
pub enum DataSourceError {
    /// Connection timeout, DNS failure and the like
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },
    /// Invalid JSON or malformed response
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Error: {0}")]
    Other(String),
}
