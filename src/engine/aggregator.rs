use super::liquidity::{amounts_for_liquidity, sqrt_price_from_x96, to_human, token0_price};
use super::normalizer::CurrencyNormalizer;
use crate::domain::{
    Network, Pool, PoolKey, Position, PositionId, Token, TokenAmount, UncollectedFees,
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

const WEI_PER_NATIVE: u64 = 1_000_000_000_000_000_000;

/// A position valued against its pool's current price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionValue {
    pub position: Position,
    /// Token amounts held, in pool token order.
    pub amount0: TokenAmount,
    pub amount1: TokenAmount,
    /// Total value in the pool's base token.
    pub value: TokenAmount,
    /// Uncollected fees in pool token order.
    pub uncollected_fees: UncollectedFees,
    pub fees_value: TokenAmount,
    /// Gas paid across the position's transactions, in the base token.
    /// `None` when it cannot be priced in the base token.
    pub gas_cost: Option<TokenAmount>,
}

/// Summary of one pool and the user's positions in it.
///
/// `liquidity_value` and `uncollected_fees_value` stay denominated in
/// `base_token`; conversion to the global currency happens on read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolState {
    pub network: Network,
    pub key: PoolKey,
    pub pool: Pool,
    pub base_token: Token,
    pub positions: Vec<PositionValue>,
    pub liquidity_value: TokenAmount,
    pub uncollected_fees_value: TokenAmount,
}

/// Build one [`PoolState`] per pool key that has a matching pool contract state.
///
/// Keys without a pool are skipped (the contract lookup may still be in
/// flight). A pool whose price data does not parse drops its positions, and a
/// position with an empty tick range is dropped on its own; neither aborts the
/// rest of the pass. Output is ordered by pool key.
pub fn aggregate_pools(
    groups: HashMap<PoolKey, Vec<Position>>,
    pools: &[Pool],
    fees: &HashMap<PositionId, UncollectedFees>,
    normalizer: &CurrencyNormalizer,
) -> Vec<PoolState> {
    let pools_by_key: HashMap<PoolKey, &Pool> = pools.iter().map(|p| (p.key(), p)).collect();

    let mut groups: Vec<(PoolKey, Vec<Position>)> = groups.into_iter().collect();
    groups.sort_by(|a, b| a.0.cmp(&b.0));

    let mut states = Vec::with_capacity(groups.len());
    for (key, positions) in groups {
        let Some(pool) = pools_by_key.get(&key) else {
            debug!(pool_key = %key, positions = positions.len(), "No pool state yet, skipping");
            continue;
        };

        if let Some(state) = aggregate_pool(key, pool, positions, fees, normalizer) {
            states.push(state);
        }
    }
    states
}

fn aggregate_pool(
    key: PoolKey,
    pool: &Pool,
    positions: Vec<Position>,
    fees: &HashMap<PositionId, UncollectedFees>,
    normalizer: &CurrencyNormalizer,
) -> Option<PoolState> {
    let Some(sqrt_price) = sqrt_price_from_x96(&pool.sqrt_price_x96) else {
        warn!(
            pool = %pool.address,
            sqrt_price_x96 = %pool.sqrt_price_x96,
            dropped = positions.len(),
            "Invalid pool price, dropping positions"
        );
        return None;
    };
    let price0 = token0_price(sqrt_price, pool.token0.decimals, pool.token1.decimals);
    if !price0.is_finite() || price0 <= 0.0 {
        warn!(pool = %pool.address, price0, "Pool price out of range, dropping positions");
        return None;
    }

    let base_token = pick_base_token(pool, normalizer).clone();
    let base_is_token1 = base_token == pool.token1;
    let in_base = |a0: f64, a1: f64| -> Option<Decimal> {
        let value = if base_is_token1 {
            a0 * price0 + a1
        } else {
            a0 + a1 / price0
        };
        if value.is_finite() {
            Decimal::from_f64(value)
        } else {
            None
        }
    };

    let mut values = Vec::with_capacity(positions.len());
    for position in positions {
        if !position.has_valid_range() {
            warn!(
                position = %position.id,
                tick_lower = position.tick_lower,
                tick_upper = position.tick_upper,
                "Empty tick range, dropping position"
            );
            continue;
        }

        let (raw0, raw1) = amounts_for_liquidity(
            position.net_liquidity,
            sqrt_price,
            position.tick_lower,
            position.tick_upper,
        );
        let fee = fees.get(&position.id).copied().unwrap_or_default();

        let valued = (|| {
            let amount0 = to_human(raw0, pool.token0.decimals)?;
            let amount1 = to_human(raw1, pool.token1.decimals)?;
            let value = in_base(amount0.to_f64()?, amount1.to_f64()?)?;
            let fees_value = in_base(fee.amount0.to_f64()?, fee.amount1.to_f64()?)?;
            Some((amount0, amount1, value, fees_value))
        })();

        let Some((amount0, amount1, value, fees_value)) = valued else {
            warn!(position = %position.id, pool = %pool.address, "Position value not representable, dropping");
            continue;
        };

        let gas_cost = gas_cost_in_base(&position, &base_token, normalizer)
            .map(|amount| TokenAmount::new(base_token.clone(), amount));

        values.push(PositionValue {
            position,
            amount0: TokenAmount::new(pool.token0.clone(), amount0),
            amount1: TokenAmount::new(pool.token1.clone(), amount1),
            value: TokenAmount::new(base_token.clone(), value),
            uncollected_fees: fee,
            fees_value: TokenAmount::new(base_token.clone(), fees_value),
            gas_cost,
        });
    }

    values.sort_by(|a, b| {
        normalizer
            .convert_to_global(&b.value)
            .cmp(&normalizer.convert_to_global(&a.value))
    });

    // Larger positions are kept first; one that would overflow the pool
    // totals is dropped.
    let mut liquidity_value = Decimal::ZERO;
    let mut uncollected_fees_value = Decimal::ZERO;
    let mut kept = Vec::with_capacity(values.len());
    for value in values {
        match (
            liquidity_value.checked_add(value.value.amount),
            uncollected_fees_value.checked_add(value.fees_value.amount),
        ) {
            (Some(liquidity), Some(fees)) => {
                liquidity_value = liquidity;
                uncollected_fees_value = fees;
                kept.push(value);
            }
            _ => warn!(
                position = %value.position.id,
                pool = %pool.address,
                "Pool total overflows, dropping position"
            ),
        }
    }

    if kept.is_empty() {
        return None;
    }

    Some(PoolState {
        network: pool.network,
        key,
        pool: pool.clone(),
        liquidity_value: TokenAmount::new(base_token.clone(), liquidity_value),
        uncollected_fees_value: TokenAmount::new(base_token.clone(), uncollected_fees_value),
        base_token,
        positions: kept,
    })
}

/// Token a pool's values are denominated in: the global currency token if the
/// pool holds it, else a stable token, else the wrapped native token, else
/// token1.
pub fn pick_base_token<'a>(pool: &'a Pool, normalizer: &CurrencyNormalizer) -> &'a Token {
    let tokens = normalizer.tokens(pool.network);
    let global = normalizer.global_token(pool.network);
    let candidates = [&pool.token1, &pool.token0];

    candidates
        .iter()
        .find(|t| **t == global)
        .or_else(|| candidates.iter().find(|t| tokens.is_stable(t)))
        .or_else(|| candidates.iter().find(|t| tokens.is_wrapped_native(t)))
        .copied()
        .unwrap_or(&pool.token1)
}

/// Total gas of `position` in `base_token`: native units as-is for the wrapped
/// native token, times the native USD price for stable tokens.
fn gas_cost_in_base(
    position: &Position,
    base_token: &Token,
    normalizer: &CurrencyNormalizer,
) -> Option<Decimal> {
    let wei = position
        .transactions
        .iter()
        .try_fold(0u128, |total, tx| total.checked_add(tx.gas_cost_wei()?))?;
    let native = Decimal::from_u128(wei)?.checked_div(Decimal::from(WEI_PER_NATIVE))?;

    let tokens = normalizer.tokens(position.network);
    if tokens.is_wrapped_native(base_token) {
        Some(native)
    } else if tokens.is_stable(base_token) {
        native.checked_mul(normalizer.native_price(position.network)?)
    } else {
        debug!(position = %position.id, base = %base_token, "Gas cost not priceable in base token");
        None
    }
}
