//! HTTP client for the position/pool/fee indexer API.

use super::{DataSourceError, FeeRequest, PortfolioSource};
use crate::domain::{
    Address, Network, Pool, PositionId, PositionRecord, Token, Transaction, TxType,
    UncollectedFees, UnixSeconds,
};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Indexer API data source.
///
/// Every endpoint takes a `POST` with a JSON body carrying `chainId`.
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: Client,
    base_url: String,
}

impl HttpDataSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post(
        &self,
        path: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, DataSourceError> {
        let url = format!("{}/{}", self.base_url, path);
        post_json(&self.client, &url, &payload).await
    }
}

/// POST `payload` and decode the JSON response, retrying rate limits and
/// server errors with exponential backoff.
pub(super) async fn post_json(
    client: &Client,
    url: &str,
    payload: &serde_json::Value,
) -> Result<serde_json::Value, DataSourceError> {
    let backoff = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(30)),
        ..Default::default()
    };

    retry(backoff, || async {
        let response = client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| backoff::Error::transient(DataSourceError::NetworkError(e.to_string())))?;

        let status = response.status();
        if status == 429 {
            return Err(backoff::Error::transient(DataSourceError::RateLimited));
        }
        if status.is_server_error() {
            return Err(backoff::Error::transient(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Server error".to_string(),
            }));
        }
        if !status.is_success() {
            return Err(backoff::Error::permanent(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Client error".to_string(),
            }));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
    })
    .await
}

#[async_trait]
impl PortfolioSource for HttpDataSource {
    async fn fetch_positions(
        &self,
        network: Network,
        owners: &[Address],
    ) -> Result<Vec<PositionRecord>, DataSourceError> {
        if owners.is_empty() {
            return Ok(Vec::new());
        }
        debug!(%network, owners = owners.len(), "Fetching positions");

        let payload = serde_json::json!({
            "chainId": network.chain_id(),
            "addresses": owners,
        });
        let response = self.post("positions", payload).await?;
        parse_positions(&response, network, owners)
    }

    async fn fetch_pools(
        &self,
        network: Network,
        pool_addresses: &[Address],
    ) -> Result<Vec<Pool>, DataSourceError> {
        if pool_addresses.is_empty() {
            return Ok(Vec::new());
        }
        debug!(%network, pools = pool_addresses.len(), "Fetching pools");

        let payload = serde_json::json!({
            "chainId": network.chain_id(),
            "addresses": pool_addresses,
        });
        let response = self.post("pools", payload).await?;
        parse_pools(&response, network)
    }

    async fn fetch_uncollected_fees(
        &self,
        network: Network,
        requests: &[FeeRequest],
    ) -> Result<HashMap<PositionId, UncollectedFees>, DataSourceError> {
        if requests.is_empty() {
            return Ok(HashMap::new());
        }
        debug!(%network, pools = requests.len(), "Fetching uncollected fees");

        let payload = serde_json::json!({
            "chainId": network.chain_id(),
            "pools": requests,
        });
        let response = self.post("fees", payload).await?;
        parse_fees(&response)
    }
}

#[derive(Debug, Deserialize)]
struct TokenDto {
    address: String,
    decimals: u8,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
}

impl TokenDto {
    fn into_token(self, network: Network) -> Token {
        Token::new(network, self.address, self.decimals, self.symbol, self.name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionDto {
    transaction_type: i64,
    liquidity: String,
    #[serde(default)]
    amount0: String,
    #[serde(default)]
    amount1: String,
    #[serde(default)]
    transaction_hash: String,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    gas: String,
    #[serde(default)]
    gas_price: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionDto {
    position_id: u64,
    tick_lower: i32,
    tick_upper: i32,
    pool: String,
    token0: TokenDto,
    token1: TokenDto,
    fee: u32,
    #[serde(default)]
    transactions: Vec<TransactionDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolDto {
    address: String,
    tick_spacing: i32,
    fee: u32,
    token0: TokenDto,
    token1: TokenDto,
    sqrt_price_x96: String,
    liquidity: String,
    tick: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeResultDto {
    token_id: u64,
    #[serde(with = "rust_decimal::serde::float")]
    amount0: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    amount1: Decimal,
}

fn decode<T: DeserializeOwned>(value: &serde_json::Value) -> Result<T, DataSourceError> {
    T::deserialize(value).map_err(|e| DataSourceError::ParseError(e.to_string()))
}

fn as_array<'a>(
    value: &'a serde_json::Value,
    what: &str,
) -> Result<&'a Vec<serde_json::Value>, DataSourceError> {
    value
        .as_array()
        .ok_or_else(|| DataSourceError::ParseError(format!("Expected array of {}", what)))
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, DataSourceError> {
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| DataSourceError::ParseError(format!("Invalid {}: {}", field, e)))
}

fn parse_integer<T: FromStr + Default>(field: &str, raw: &str) -> Result<T, DataSourceError> {
    if raw.is_empty() {
        return Ok(T::default());
    }
    raw.parse::<T>()
        .map_err(|_| DataSourceError::ParseError(format!("Invalid {}: {}", field, raw)))
}

fn parse_transaction(dto: TransactionDto) -> Result<Transaction, DataSourceError> {
    let liquidity_delta = dto
        .liquidity
        .parse::<u128>()
        .map_err(|_| DataSourceError::ParseError(format!("Invalid liquidity: {}", dto.liquidity)))?;

    Ok(Transaction {
        tx_type: TxType::from(dto.transaction_type),
        liquidity_delta,
        amount0: parse_decimal("amount0", &dto.amount0)?,
        amount1: parse_decimal("amount1", &dto.amount1)?,
        timestamp: UnixSeconds::new(parse_integer("timestamp", &dto.timestamp)?),
        tx_hash: dto.transaction_hash,
        gas: parse_integer("gas", &dto.gas)?,
        gas_price: parse_integer("gasPrice", &dto.gas_price)?,
    })
}

fn parse_position(
    value: &serde_json::Value,
    network: Network,
    owner: &Address,
) -> Result<PositionRecord, DataSourceError> {
    let dto: PositionDto = decode(value)?;
    let transactions = dto
        .transactions
        .into_iter()
        .map(parse_transaction)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PositionRecord {
        id: PositionId(dto.position_id),
        network,
        token0: dto.token0.into_token(network),
        token1: dto.token1.into_token(network),
        fee_tier: dto.fee,
        tick_lower: dto.tick_lower,
        tick_upper: dto.tick_upper,
        owner: owner.clone(),
        pool_address: Address::new(dto.pool),
        transactions,
    })
}

/// The response holds one array of positions per requested owner, in request
/// order.
fn parse_positions(
    response: &serde_json::Value,
    network: Network,
    owners: &[Address],
) -> Result<Vec<PositionRecord>, DataSourceError> {
    let per_owner = as_array(response, "position lists")?;
    if per_owner.len() != owners.len() {
        warn!(
            %network,
            expected = owners.len(),
            got = per_owner.len(),
            "Position response does not match requested owners"
        );
    }

    let mut positions = Vec::new();
    for (owner, list) in owners.iter().zip(per_owner) {
        for position_json in as_array(list, "positions")? {
            match parse_position(position_json, network, owner) {
                Ok(position) => positions.push(position),
                Err(e) => warn!(%network, %owner, "Failed to parse position: {}", e),
            }
        }
    }
    Ok(positions)
}

fn parse_pool(value: &serde_json::Value, network: Network) -> Result<Pool, DataSourceError> {
    let dto: PoolDto = decode(value)?;
    Ok(Pool {
        address: Address::new(dto.address),
        network,
        token0: dto.token0.into_token(network),
        token1: dto.token1.into_token(network),
        fee_tier: dto.fee,
        tick_spacing: dto.tick_spacing,
        current_tick: dto.tick,
        sqrt_price_x96: dto.sqrt_price_x96,
        contract_liquidity: dto.liquidity,
    })
}

fn parse_pools(response: &serde_json::Value, network: Network) -> Result<Vec<Pool>, DataSourceError> {
    let mut pools = Vec::new();
    for pool_json in as_array(response, "pools")? {
        match parse_pool(pool_json, network) {
            Ok(pool) => pools.push(pool),
            Err(e) => warn!(%network, "Failed to parse pool: {}", e),
        }
    }
    Ok(pools)
}

/// The response holds one array of fee results per requested pool.
fn parse_fees(
    response: &serde_json::Value,
) -> Result<HashMap<PositionId, UncollectedFees>, DataSourceError> {
    let mut fees = HashMap::new();
    for per_pool in as_array(response, "fee lists")? {
        for fee_json in as_array(per_pool, "fees")? {
            match decode::<FeeResultDto>(fee_json) {
                Ok(dto) => {
                    fees.insert(
                        PositionId(dto.token_id),
                        UncollectedFees::new(dto.amount0, dto.amount1),
                    );
                }
                Err(e) => warn!("Failed to parse uncollected fees: {}", e),
            }
        }
    }
    Ok(fees)
}
