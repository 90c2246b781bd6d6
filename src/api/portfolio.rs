use crate::api::AppState;
use crate::domain::{GlobalCurrency, Network};
use crate::engine::normalizer::UNAVAILABLE;
use crate::engine::{AggregationSettings, PoolState, Portfolio, PositionValue};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioQuery {
    pub currency: Option<String>,
    pub filter_closed: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResponse {
    pub currency: GlobalCurrency,
    pub loading: bool,
    pub empty: bool,
    pub total_liquidity: String,
    pub total_liquidity_formatted: String,
    pub total_uncollected_fees: String,
    pub total_uncollected_fees_formatted: String,
    pub networks: Vec<NetworkStatusDto>,
    pub pools: Vec<PoolDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatusDto {
    pub network: Network,
    pub chain_id: u64,
    pub loading: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDto {
    pub network: Network,
    pub chain_id: u64,
    pub address: String,
    pub key: String,
    pub token0: String,
    pub token1: String,
    pub fee_tier: u32,
    pub current_tick: i32,
    pub base_token: String,
    /// `None` when the value cannot be priced in the selected currency.
    pub liquidity: Option<String>,
    pub liquidity_formatted: String,
    pub uncollected_fees: Option<String>,
    pub uncollected_fees_formatted: String,
    pub positions: Vec<PositionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub id: u64,
    pub owner: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub in_range: bool,
    pub net_liquidity: String,
    pub closed: bool,
    pub amount0: String,
    pub amount1: String,
    pub value_formatted: String,
    pub uncollected_fees_formatted: String,
    /// Gas paid in the pool's base token, `None` when it cannot be priced.
    pub gas_cost: Option<String>,
    pub gas_cost_formatted: String,
    pub transactions: usize,
}

pub async fn get_portfolio(
    Query(params): Query<PortfolioQuery>,
    State(state): State<AppState>,
) -> Result<Json<PortfolioResponse>, AppError> {
    let mut settings = state.config.settings();
    if let Some(currency) = params.currency.as_deref() {
        settings.global_currency = currency
            .parse::<GlobalCurrency>()
            .map_err(|e| AppError::BadRequest(format!("Invalid currency: {}", e)))?;
    }
    if let Some(filter_closed) = params.filter_closed {
        settings.filter_closed = filter_closed;
    }

    let snapshot = state.orchestrator.snapshot();
    let networks = snapshot
        .networks
        .iter()
        .map(|n| NetworkStatusDto {
            network: n.network,
            chain_id: n.network.chain_id(),
            loading: n.loading,
        })
        .collect();
    let portfolio = snapshot.derive(&settings, state.registry.clone());

    debug!(
        pools = portfolio.pools.len(),
        loading = portfolio.loading,
        "Portfolio derived"
    );

    Ok(Json(build_response(&portfolio, &settings, networks)))
}

fn decimal_string(value: Decimal) -> String {
    value.normalize().to_string()
}

fn build_response(
    portfolio: &Portfolio,
    settings: &AggregationSettings,
    networks: Vec<NetworkStatusDto>,
) -> PortfolioResponse {
    // Totals mix networks, so they carry the baseline network's symbol.
    let totals_network = Network::BASELINE;

    PortfolioResponse {
        currency: settings.global_currency,
        loading: portfolio.loading,
        empty: portfolio.empty,
        total_liquidity: decimal_string(portfolio.total_liquidity),
        total_liquidity_formatted: portfolio
            .format_with_symbol(portfolio.total_liquidity, totals_network),
        total_uncollected_fees: decimal_string(portfolio.total_uncollected_fees),
        total_uncollected_fees_formatted: portfolio
            .format_with_symbol(portfolio.total_uncollected_fees, totals_network),
        networks,
        pools: portfolio
            .pools
            .iter()
            .map(|pool| pool_dto(portfolio, pool))
            .collect(),
    }
}

fn pool_dto(portfolio: &Portfolio, state: &PoolState) -> PoolDto {
    PoolDto {
        network: state.network,
        chain_id: state.network.chain_id(),
        address: state.pool.address.to_string(),
        key: state.key.to_string(),
        token0: state.pool.token0.symbol.clone(),
        token1: state.pool.token1.symbol.clone(),
        fee_tier: state.pool.fee_tier,
        current_tick: state.pool.current_tick,
        base_token: state.base_token.symbol.clone(),
        liquidity: portfolio
            .try_convert_to_global(&state.liquidity_value)
            .map(decimal_string),
        liquidity_formatted: portfolio.convert_to_global_formatted(&state.liquidity_value),
        uncollected_fees: portfolio
            .try_convert_to_global(&state.uncollected_fees_value)
            .map(decimal_string),
        uncollected_fees_formatted: portfolio
            .convert_to_global_formatted(&state.uncollected_fees_value),
        positions: state
            .positions
            .iter()
            .map(|value| position_dto(portfolio, state, value))
            .collect(),
    }
}

fn position_dto(portfolio: &Portfolio, state: &PoolState, value: &PositionValue) -> PositionDto {
    let position = &value.position;
    let tick = state.pool.current_tick;
    PositionDto {
        id: position.id.0,
        owner: position.owner.to_string(),
        tick_lower: position.tick_lower,
        tick_upper: position.tick_upper,
        in_range: position.tick_lower <= tick && tick < position.tick_upper,
        net_liquidity: position.net_liquidity.to_string(),
        closed: position.is_closed(),
        amount0: decimal_string(value.amount0.amount),
        amount1: decimal_string(value.amount1.amount),
        value_formatted: portfolio.convert_to_global_formatted(&value.value),
        uncollected_fees_formatted: portfolio.convert_to_global_formatted(&value.fees_value),
        gas_cost: value.gas_cost.as_ref().map(|gas| decimal_string(gas.amount)),
        gas_cost_formatted: value
            .gas_cost
            .as_ref()
            .map(|gas| portfolio.convert_to_global_formatted(gas))
            .unwrap_or_else(|| UNAVAILABLE.to_string()),
        transactions: position.transactions.len(),
    }
}
