//! Concentrated-liquidity math for valuing positions.
//!
//! Works in `f64`: pool sqrt prices are Q64.96 integers far outside the range of
//! `rust_decimal`, and the results are only used for display-grade valuation.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0; // 2^96
const TICK_BASE: f64 = 1.0001;

/// Parse a Q64.96 sqrt price string into a plain sqrt price.
///
/// Returns `None` for anything that is not a positive finite number.
pub fn sqrt_price_from_x96(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some(value / Q96)
}

/// sqrt(1.0001^tick)
pub fn sqrt_price_at_tick(tick: i32) -> f64 {
    TICK_BASE.powf(f64::from(tick) / 2.0)
}

/// Raw token amounts represented by `liquidity` over `[tick_lower, tick_upper)`
/// at `sqrt_price`.
///
/// Below the range the position is entirely token0, above it entirely token1.
/// The sign of `liquidity` carries through to both amounts.
pub fn amounts_for_liquidity(
    liquidity: i128,
    sqrt_price: f64,
    tick_lower: i32,
    tick_upper: i32,
) -> (f64, f64) {
    let l = liquidity as f64;
    let sqrt_a = sqrt_price_at_tick(tick_lower);
    let sqrt_b = sqrt_price_at_tick(tick_upper);

    if sqrt_price <= sqrt_a {
        (l * (sqrt_b - sqrt_a) / (sqrt_a * sqrt_b), 0.0)
    } else if sqrt_price < sqrt_b {
        (
            l * (sqrt_b - sqrt_price) / (sqrt_price * sqrt_b),
            l * (sqrt_price - sqrt_a),
        )
    } else {
        (0.0, l * (sqrt_b - sqrt_a))
    }
}

/// Price of one whole token0 expressed in whole token1.
pub fn token0_price(sqrt_price: f64, decimals0: u8, decimals1: u8) -> f64 {
    let exponent = i32::from(decimals0) - i32::from(decimals1);
    sqrt_price * sqrt_price * 10f64.powi(exponent)
}

/// Convert a raw integer-unit amount into human units as a `Decimal`.
pub fn to_human(raw: f64, decimals: u8) -> Option<Decimal> {
    let scaled = raw / 10f64.powi(i32::from(decimals));
    if !scaled.is_finite() {
        return None;
    }
    Decimal::from_f64(scaled)
}
