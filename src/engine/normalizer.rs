use crate::domain::{GlobalCurrency, Network, NetworkTokens, Token, TokenAmount, TokenRegistry};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Shown in place of a value that cannot be converted.
pub const UNAVAILABLE: &str = "n/a";

/// Live native-asset USD prices as currently exposed by the price source.
///
/// A network without an entry has no live price (yet).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    native_usd: HashMap<Network, Decimal>,
}

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, network: Network, price: Decimal) -> Self {
        self.native_usd.insert(network, price);
        self
    }

    pub fn set(&mut self, network: Network, price: Option<Decimal>) {
        match price {
            Some(p) => self.native_usd.insert(network, p),
            None => self.native_usd.remove(&network),
        };
    }

    pub fn get(&self, network: Network) -> Option<Decimal> {
        self.native_usd.get(&network).copied()
    }
}

/// Converts token-denominated amounts into the user's global display currency.
///
/// Conversion never fails loudly: when a value cannot be priced the
/// `try_` variant returns `None` and the plain variant returns zero.
#[derive(Debug, Clone)]
pub struct CurrencyNormalizer {
    registry: Arc<TokenRegistry>,
    currency: GlobalCurrency,
    prices: PriceSnapshot,
}

impl CurrencyNormalizer {
    pub fn new(registry: Arc<TokenRegistry>, currency: GlobalCurrency, prices: PriceSnapshot) -> Self {
        Self {
            registry,
            currency,
            prices,
        }
    }

    pub fn tokens(&self, network: Network) -> &NetworkTokens {
        self.registry.tokens(network)
    }

    /// The token values on `network` are expressed in.
    pub fn global_token(&self, network: Network) -> &Token {
        self.tokens(network).global_token(self.currency)
    }

    /// Native-asset USD price: live if positive, else the network's fallback.
    pub fn native_price(&self, network: Network) -> Option<Decimal> {
        match self.prices.get(network) {
            Some(price) if price > Decimal::ZERO => Some(price),
            _ => {
                let fallback = self.tokens(network).native_price_fallback;
                if fallback.is_some() {
                    debug!(%network, "No live native price, using fallback rate");
                }
                fallback.filter(|p| *p > Decimal::ZERO)
            }
        }
    }

    pub fn try_convert_to_global(&self, value: &TokenAmount) -> Option<Decimal> {
        let network = value.network();
        let tokens = self.tokens(network);
        let global = tokens.global_token(self.currency);

        if value.token == *global {
            return Some(value.amount);
        }

        if *global == tokens.stable_reference && tokens.is_stable(&value.token) {
            return Some(value.amount);
        }

        let Some(price) = self.native_price(network) else {
            debug!(token = %value.token, %network, "No native price, value unavailable");
            return None;
        };

        // Every other token is taken to move with the native asset.
        if tokens.is_wrapped_native(global) {
            value.amount.checked_div(price)
        } else {
            value.amount.checked_mul(price)
        }
    }

    /// Converted value, or zero when it cannot be priced.
    pub fn convert_to_global(&self, value: &TokenAmount) -> Decimal {
        self.try_convert_to_global(value).unwrap_or(Decimal::ZERO)
    }

    /// `"$"` when `network` values are shown in its stable reference, otherwise
    /// the native display symbol.
    pub fn currency_symbol(&self, network: Network) -> &str {
        let tokens = self.tokens(network);
        if *self.global_token(network) == tokens.stable_reference {
            "$"
        } else {
            &tokens.native_symbol
        }
    }

    pub fn format_with_symbol(&self, value: Decimal, network: Network) -> String {
        let symbol = self.currency_symbol(network);
        let dp = if symbol == "$" { 2 } else { 4 };
        format_currency(value, symbol, dp)
    }

    pub fn convert_to_global_formatted(&self, value: &TokenAmount) -> String {
        match self.try_convert_to_global(value) {
            Some(converted) => self.format_with_symbol(converted, value.network()),
            None => UNAVAILABLE.to_string(),
        }
    }
}

/// Format `value` with thousands separators and `dp` decimals, prefixed by
/// `symbol`. Multi-character symbols are separated by a space.
pub fn format_currency(value: Decimal, symbol: &str, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = format!("{:.*}", dp as usize, rounded.abs());
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }

    let separator = if symbol.chars().count() > 1 { " " } else { "" };
    format!("{}{}{}{}", sign, symbol, separator, grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_currency_groups_thousands() {
        assert_eq!(format_currency(d("1234567.891"), "$", 2), "$1,234,567.89");
        assert_eq!(format_currency(d("999"), "$", 2), "$999.00");
        assert_eq!(format_currency(d("0"), "$", 2), "$0.00");
    }

    #[test]
    fn test_format_currency_negative_and_rounding() {
        assert_eq!(format_currency(d("-1000.005"), "$", 2), "-$1,000.01");
        assert_eq!(format_currency(d("-0.001"), "$", 2), "$0.00");
    }

    #[test]
    fn test_format_currency_symbols() {
        assert_eq!(format_currency(d("1.5"), "Ξ", 4), "Ξ1.5000");
        assert_eq!(format_currency(d("12"), "MATIC", 4), "MATIC 12.0000");
    }

    #[test]
    fn test_price_snapshot_set_and_clear() {
        let mut prices = PriceSnapshot::new().with_price(Network::Ethereum, d("2000"));
        assert_eq!(prices.get(Network::Ethereum), Some(d("2000")));
        prices.set(Network::Ethereum, None);
        assert_eq!(prices.get(Network::Ethereum), None);
    }

    #[test]
    fn test_zero_live_price_uses_fallback_or_none() {
        let prices = PriceSnapshot::new()
            .with_price(Network::Ethereum, Decimal::ZERO)
            .with_price(Network::Polygon, Decimal::ZERO);
        let normalizer =
            CurrencyNormalizer::new(Arc::new(TokenRegistry::default()), GlobalCurrency::Usd, prices);
        assert_eq!(normalizer.native_price(Network::Ethereum), None);
        assert_eq!(normalizer.native_price(Network::Polygon), Some(d("2")));
    }
}
