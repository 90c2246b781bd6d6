use lpfolio::engine::{
    build_position, derive_portfolio, net_liquidity, AggregationSettings, CurrencyNormalizer,
    NetworkInput, PriceSnapshot,
};
use lpfolio::{
    Address, GlobalCurrency, Network, Pool, PoolKey, PositionRecord, Token, TokenAmount,
    TokenRegistry, Transaction, TxType,
};
use lpfolio::domain::{PositionId, UnixSeconds};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

// Sqrt price of 1.0 in Q64.96.
const SQRT_ONE_X96: &str = "79228162514264337593543950336";

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn registry() -> Arc<TokenRegistry> {
    Arc::new(TokenRegistry::default())
}

fn normalizer(currency: GlobalCurrency, prices: PriceSnapshot) -> CurrencyNormalizer {
    CurrencyNormalizer::new(registry(), currency, prices)
}

/// Two stable tokens of `network` from the built-in tables.
fn stable_pair(network: Network) -> (Token, Token) {
    let tokens = registry().tokens(network).clone();
    let mut stables: Vec<Address> = tokens.stable_equivalents.iter().cloned().collect();
    stables.retain(|a| *a != tokens.stable_reference.address);
    stables.sort();
    let a = Token::new(network, stables[0].as_str(), 18, "STA", "Stable A");
    let b = Token::new(network, stables[1].as_str(), 18, "STB", "Stable B");
    (a, b)
}

fn pool_for(token0: &Token, token1: &Token, address: &str) -> Pool {
    let key = PoolKey::new(token0, token1, 100);
    let (t0, t1) = if key.token_a == token0.address {
        (token0.clone(), token1.clone())
    } else {
        (token1.clone(), token0.clone())
    };
    Pool {
        address: Address::new(address),
        network: token0.network,
        token0: t0,
        token1: t1,
        fee_tier: 100,
        tick_spacing: 1,
        current_tick: 0,
        sqrt_price_x96: SQRT_ONE_X96.to_string(),
        contract_liquidity: "0".to_string(),
    }
}

fn record(id: u64, token0: &Token, token1: &Token, pool: &str, transactions: Vec<Transaction>) -> PositionRecord {
    PositionRecord {
        id: PositionId(id),
        network: token0.network,
        token0: token0.clone(),
        token1: token1.clone(),
        fee_tier: 100,
        tick_lower: -1000,
        tick_upper: 1000,
        owner: Address::new("0x0000000000000000000000000000000000000001"),
        pool_address: Address::new(pool),
        transactions,
    }
}

fn add(liquidity: u128) -> Transaction {
    Transaction::add(liquidity, UnixSeconds::new(1))
}

fn remove(liquidity: u128) -> Transaction {
    Transaction::remove(liquidity, UnixSeconds::new(2))
}

fn loaded(network: Network, positions: Vec<PositionRecord>, pools: Vec<Pool>) -> NetworkInput {
    NetworkInput {
        network,
        loading: false,
        positions,
        pools,
        fees: HashMap::new(),
    }
}

const E18: u128 = 1_000_000_000_000_000_000;

#[test]
fn test_ledger_folds_add_add_remove() {
    assert_eq!(net_liquidity(&[add(100), add(50), remove(30)]), 120);
    assert_eq!(net_liquidity(&[remove(30), add(50), add(100)]), 120);
    assert_eq!(net_liquidity(&[]), 0);
}

#[test]
fn test_ledger_ignores_unrecognized_and_surfaces_negative() {
    let mut odd = add(1_000);
    odd.tx_type = TxType::Unrecognized(7);
    assert_eq!(net_liquidity(&[add(10), odd]), 10);

    let (a, b) = stable_pair(Network::Ethereum);
    let position = build_position(record(1, &a, &b, "0xpool", vec![add(50), remove(100)]));
    assert_eq!(position.net_liquidity, -50);
    assert!(!position.is_closed());
}

#[test]
fn test_pool_key_is_symmetric() {
    let (a, b) = stable_pair(Network::Ethereum);
    assert_eq!(PoolKey::new(&a, &b, 500), PoolKey::new(&b, &a, 500));
    assert_ne!(PoolKey::new(&a, &b, 500), PoolKey::new(&a, &b, 3000));
}

#[test]
fn test_symmetric_positions_share_one_pool_state() {
    let (a, b) = stable_pair(Network::Ethereum);
    let input = loaded(
        Network::Ethereum,
        vec![
            record(1, &a, &b, "0xpool", vec![add(E18)]),
            record(2, &b, &a, "0xpool", vec![add(2 * E18)]),
        ],
        vec![pool_for(&a, &b, "0xpool")],
    );

    let portfolio = derive_portfolio(vec![input], &AggregationSettings::default(), registry(), PriceSnapshot::new());
    assert_eq!(portfolio.pools.len(), 1);
    assert_eq!(portfolio.pools[0].positions.len(), 2);
    assert!(portfolio.pools[0]
        .positions
        .iter()
        .all(|p| p.position.pool_key() == portfolio.pools[0].key));
}

#[test]
fn test_combined_pools_sorted_and_totals_match() {
    let (ea, eb) = stable_pair(Network::Ethereum);
    let (aa, ab) = stable_pair(Network::Arbitrum);
    let (oa, ob) = stable_pair(Network::Optimism);

    let inputs = vec![
        loaded(
            Network::Ethereum,
            vec![record(1, &ea, &eb, "0xe1", vec![add(E18)])],
            vec![pool_for(&ea, &eb, "0xe1")],
        ),
        loaded(
            Network::Arbitrum,
            vec![record(2, &aa, &ab, "0xa1", vec![add(5 * E18)])],
            vec![pool_for(&aa, &ab, "0xa1")],
        ),
        loaded(
            Network::Optimism,
            vec![record(3, &oa, &ob, "0xo1", vec![add(3 * E18), remove(E18)])],
            vec![pool_for(&oa, &ob, "0xo1")],
        ),
    ];

    let portfolio = derive_portfolio(inputs, &AggregationSettings::default(), registry(), PriceSnapshot::new());
    assert_eq!(portfolio.pools.len(), 3);
    assert!(!portfolio.loading);
    assert!(!portfolio.empty);

    let values: Vec<Decimal> = portfolio
        .pools
        .iter()
        .map(|p| portfolio.convert_to_global(&p.liquidity_value))
        .collect();
    assert!(values.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(portfolio.pools[0].network, Network::Arbitrum);
    assert_eq!(portfolio.pools[2].network, Network::Ethereum);

    let sum: Decimal = values.iter().copied().sum();
    let diff = (portfolio.total_liquidity - sum).abs();
    assert!(diff <= sum * d("0.000000001"));
    assert!(portfolio.total_liquidity > Decimal::ZERO);
}

#[test]
fn test_totals_near_decimal_limit_do_not_abort() {
    // Whole-unit stables: a 5e29 liquidity position is worth about 4.9e28.
    let whole = |network| {
        let (mut a, mut b) = stable_pair(network);
        a.decimals = 0;
        b.decimals = 0;
        (a, b)
    };
    let huge: u128 = 500_000_000_000_000_000_000_000_000_000;
    let (ea, eb) = whole(Network::Ethereum);
    let (aa, ab) = whole(Network::Arbitrum);

    let inputs = vec![
        loaded(
            Network::Ethereum,
            vec![
                record(1, &ea, &eb, "0xe1", vec![add(huge)]),
                record(2, &ea, &eb, "0xe1", vec![add(huge)]),
            ],
            vec![pool_for(&ea, &eb, "0xe1")],
        ),
        loaded(
            Network::Arbitrum,
            vec![record(3, &aa, &ab, "0xa1", vec![add(huge)])],
            vec![pool_for(&aa, &ab, "0xa1")],
        ),
    ];

    let portfolio = derive_portfolio(inputs, &AggregationSettings::default(), registry(), PriceSnapshot::new());
    assert_eq!(portfolio.pools.len(), 2);
    assert!(portfolio.pools.iter().all(|p| p.positions.len() == 1));
    assert_eq!(portfolio.total_liquidity, Decimal::MAX);
}

#[test]
fn test_closed_positions_filtered_when_enabled() {
    let (a, b) = stable_pair(Network::Ethereum);
    let input = loaded(
        Network::Ethereum,
        vec![
            record(1, &a, &b, "0xpool", vec![add(E18)]),
            record(2, &a, &b, "0xpool", vec![add(E18), remove(E18)]),
        ],
        vec![pool_for(&a, &b, "0xpool")],
    );

    let keep = derive_portfolio(vec![input.clone()], &AggregationSettings::default(), registry(), PriceSnapshot::new());
    assert_eq!(keep.pools[0].positions.len(), 2);

    let settings = AggregationSettings {
        filter_closed: true,
        ..Default::default()
    };
    let filtered = derive_portfolio(vec![input], &settings, registry(), PriceSnapshot::new());
    assert_eq!(filtered.pools[0].positions.len(), 1);
    assert_eq!(filtered.pools[0].positions[0].position.id, PositionId(1));
}

#[test]
fn test_loading_and_empty_flags() {
    let settings = AggregationSettings::default();

    let portfolio = derive_portfolio(
        vec![
            loaded(Network::Ethereum, vec![], vec![]),
            NetworkInput::loading(Network::Arbitrum),
        ],
        &settings,
        registry(),
        PriceSnapshot::new(),
    );
    assert!(portfolio.loading);
    assert!(!portfolio.empty);

    let portfolio = derive_portfolio(
        vec![NetworkInput::empty(Network::Ethereum), NetworkInput::empty(Network::Arbitrum)],
        &settings,
        registry(),
        PriceSnapshot::new(),
    );
    assert!(!portfolio.loading);
    assert!(portfolio.empty);
    assert_eq!(portfolio.total_liquidity, Decimal::ZERO);
}

#[test]
fn test_position_without_pool_state_is_not_shown() {
    let (a, b) = stable_pair(Network::Ethereum);
    let input = loaded(
        Network::Ethereum,
        vec![record(1, &a, &b, "0xpool", vec![add(E18)])],
        vec![],
    );
    let portfolio = derive_portfolio(vec![input], &AggregationSettings::default(), registry(), PriceSnapshot::new());
    assert!(portfolio.pools.is_empty());
    assert!(portfolio.empty);
}

#[test]
fn test_normalizer_identity_and_stable_parity() {
    let normalizer = normalizer(GlobalCurrency::Usd, PriceSnapshot::new());
    let usdc = registry().tokens(Network::Ethereum).stable_reference.clone();
    let (dai_like, _) = stable_pair(Network::Ethereum);

    let amount = d("1234.56");
    assert_eq!(normalizer.convert_to_global(&TokenAmount::new(usdc, amount)), amount);
    assert_eq!(normalizer.convert_to_global(&TokenAmount::new(dai_like, amount)), amount);
}

#[test]
fn test_native_conversion_round_trip() {
    let prices = PriceSnapshot::new().with_price(Network::Ethereum, d("2000"));
    let tokens = registry().tokens(Network::Ethereum).clone();

    let to_usd = normalizer(GlobalCurrency::Usd, prices.clone());
    let usd = to_usd.convert_to_global(&TokenAmount::new(tokens.wrapped_native.clone(), d("1.5")));
    assert_eq!(usd, d("3000"));

    let to_native = normalizer(GlobalCurrency::Native, prices);
    let back = to_native.convert_to_global(&TokenAmount::new(tokens.stable_reference.clone(), usd));
    assert_eq!(back, d("1.5"));
    assert_eq!(
        to_native.convert_to_global_formatted(&TokenAmount::new(tokens.stable_reference, usd)),
        "Ξ1.5000"
    );
}

#[test]
fn test_polygon_uses_fallback_native_price() {
    let normalizer = normalizer(GlobalCurrency::Usd, PriceSnapshot::new());
    let wmatic = registry().tokens(Network::Polygon).wrapped_native.clone();
    assert_eq!(
        normalizer.convert_to_global(&TokenAmount::new(wmatic, d("10"))),
        d("20")
    );
}

#[test]
fn test_zero_price_is_unavailable() {
    let prices = PriceSnapshot::new().with_price(Network::Ethereum, Decimal::ZERO);
    let normalizer = normalizer(GlobalCurrency::Usd, prices);
    let weth = TokenAmount::new(registry().tokens(Network::Ethereum).wrapped_native.clone(), d("1"));

    assert_eq!(normalizer.try_convert_to_global(&weth), None);
    assert_eq!(normalizer.convert_to_global(&weth), Decimal::ZERO);
    assert_eq!(normalizer.convert_to_global_formatted(&weth), "n/a");
}

#[test]
fn test_other_tokens_convert_through_native_price() {
    let uni = || {
        TokenAmount::new(
            Token::new(Network::Ethereum, "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", 18, "UNI", "Uniswap"),
            d("3"),
        )
    };
    let prices = PriceSnapshot::new().with_price(Network::Ethereum, d("2000"));

    let to_usd = normalizer(GlobalCurrency::Usd, prices.clone());
    assert_eq!(to_usd.try_convert_to_global(&uni()), Some(d("6000")));

    let to_native = normalizer(GlobalCurrency::Native, prices);
    assert_eq!(to_native.try_convert_to_global(&uni()), Some(d("0.0015")));

    // No live price and no fallback on Ethereum.
    let unpriced = normalizer(GlobalCurrency::Usd, PriceSnapshot::new());
    assert_eq!(unpriced.try_convert_to_global(&uni()), None);
    assert_eq!(unpriced.convert_to_global_formatted(&uni()), "n/a");
}

#[test]
fn test_any_two_stables_convert_equally() {
    let normalizer = normalizer(GlobalCurrency::Usd, PriceSnapshot::new());
    for network in [Network::Ethereum, Network::Optimism, Network::Arbitrum, Network::Polygon] {
        let (s1, s2) = stable_pair(network);
        assert_ne!(s1, s2);
        let amount = d("987.654321");
        assert_eq!(
            normalizer.try_convert_to_global(&TokenAmount::new(s1, amount)),
            normalizer.try_convert_to_global(&TokenAmount::new(s2, amount)),
        );
    }
}

#[test]
fn test_format_with_symbol_by_currency() {
    let prices = PriceSnapshot::new();
    assert_eq!(
        normalizer(GlobalCurrency::Usd, prices.clone()).format_with_symbol(d("1234.5"), Network::Ethereum),
        "$1,234.50"
    );
    assert_eq!(
        normalizer(GlobalCurrency::Native, prices).format_with_symbol(d("0.12345"), Network::Arbitrum),
        "Ξ0.1235"
    );
}
