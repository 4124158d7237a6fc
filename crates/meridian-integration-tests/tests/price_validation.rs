//! Integration test: price update rules across oracle, cache and storage.
//!
//! Covers the reference scenarios for the tick/sqrt rule, smoothing and a
//! market without an index price, plus the accept-side guarantees: every
//! accepted update meets the minimum change and never moves away from the
//! index price, and a failing batch leaves storage untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use meridian_cache::{CurrencyPairIdCache, IndexPriceCache};
use meridian_db::queries::markets;
use meridian_oracle::smoothed::smooth;
use meridian_oracle::tick::{is_crossing_old_price, min_price_change_amount, PriceTuple};
use meridian_oracle::validation::{perform_stateful_validation, validate_price_update};
use meridian_oracle::{
    store, ManualClock, NonDeterministicViolation, OracleError, PriceKeeper,
    SmoothedPriceTracker, ValidationError,
};
use meridian_types::{
    ExchangePrice, Market, MarketObservations, MarketParams, MarketPriceUpdate,
    MarketPriceUpdates, DEFAULT_SMOOTHING_PPM,
};

const NOW: u64 = 1_700_000_000;

fn btc(price: u64) -> Market {
    Market {
        id: 0,
        pair: "BTC-USD".to_string(),
        exponent: -5,
        exchanges: vec![0],
        min_exchanges: 1,
        min_price_change_ppm: 50,
        price,
    }
}

fn keeper() -> PriceKeeper {
    PriceKeeper::new(
        Arc::new(IndexPriceCache::new()),
        Arc::new(SmoothedPriceTracker::new()),
        Arc::new(CurrencyPairIdCache::new()),
        Arc::new(ManualClock::new(NOW)),
        DEFAULT_SMOOTHING_PPM,
    )
}

#[test]
fn sqrt_rule_when_old_price_is_far_from_index() {
    let market = btc(5_000_000_000);
    validate_price_update(&market, 5_005_000_000, Some(5_010_000_000), false)
        .expect("move towards index accepted");

    let err = validate_price_update(&market, 5_015_000_000, Some(5_010_000_000), false)
        .expect_err("overshoot rejected");
    assert!(err.to_string().contains("deviates more than minimum allowed"));
}

#[test]
fn one_tick_rule_when_old_price_is_near_index() {
    let market = btc(5_000_000_000);
    validate_price_update(&market, 5_000_500_000, Some(5_000_250_000), false)
        .expect("within one tick of index accepted");

    let err = validate_price_update(&market, 5_015_000_000, Some(5_000_250_000), false)
        .expect_err("far past index rejected");
    assert!(matches!(
        err,
        ValidationError::NonDeterministic(NonDeterministicViolation::ExceedsOneTick { .. })
    ));
}

#[test]
fn smoothing_step_weights_new_index_price() {
    assert_eq!(
        smooth(9_000_000_000, 9_010_000_000, DEFAULT_SMOOTHING_PPM),
        9_003_000_000
    );
}

#[test]
fn market_without_index_price_gets_no_update() {
    let keeper = keeper();
    let mut conn = meridian_db::open_memory().expect("open");
    keeper
        .create_exchange_feed(&conn, "kraken", "")
        .expect("feed");
    let params = MarketParams {
        pair: "BTC-USD".to_string(),
        exponent: -5,
        exchanges: vec![0],
        min_exchanges: 1,
        min_price_change_ppm: 50,
    };
    keeper
        .create_market(&mut conn, &params, 5_000_000_000)
        .expect("market");

    keeper.update_smoothed_prices(&conn).expect("smooth");
    assert!(keeper
        .get_valid_market_price_updates(&conn)
        .expect("updates")
        .is_empty());

    let proposal = MarketPriceUpdates::new(vec![MarketPriceUpdate::new(0, 5_005_000_000)]);
    let err = keeper
        .perform_stateful_validation(&conn, &proposal, false)
        .expect_err("no index price");
    assert!(err.to_string().contains("is not available"));

    // Index price arrives; the same update is now acceptable.
    keeper.index_price_cache().update_prices(&[MarketObservations {
        market_id: 0,
        exchange_prices: vec![ExchangePrice {
            exchange_id: 0,
            price: 5_010_000_000,
            last_update_time: NOW,
        }],
    }]);
    keeper
        .perform_stateful_validation(&conn, &proposal, false)
        .expect("valid");
}

#[test]
fn accepted_updates_meet_min_change_and_never_move_away() {
    let old_price = 5_000_000_000;
    let market = btc(old_price);
    let min_change = min_price_change_amount(old_price, market.min_price_change_ppm);

    for index_price in [4_990_000_000, 4_999_900_000, 5_000_100_000, 5_010_000_000] {
        let mut accepted = 0;
        for new_price in (4_980_000_000..=5_020_000_000u64).step_by(50_000) {
            if validate_price_update(&market, new_price, Some(index_price), false).is_err() {
                continue;
            }
            accepted += 1;
            assert!(old_price.abs_diff(new_price) >= min_change, "new={new_price}");
            assert!(
                !is_crossing_old_price(PriceTuple {
                    old_price,
                    index_price,
                    new_price,
                }),
                "new={new_price} index={index_price}"
            );
        }
        assert!(accepted > 0, "index={index_price}");
    }
}

#[test]
fn validation_is_repeatable() {
    let market = btc(5_000_000_000);
    let cases = [
        (5_005_000_000, Some(5_010_000_000)),
        (5_015_000_000, Some(5_010_000_000)),
        (4_990_000_000, Some(5_010_000_000)),
        (5_000_000_001, None),
    ];
    for (new_price, index_price) in cases {
        let first = validate_price_update(&market, new_price, index_price, false).is_ok();
        for _ in 0..10 {
            assert_eq!(
                validate_price_update(&market, new_price, index_price, false).is_ok(),
                first
            );
        }
    }
}

#[test]
fn commit_time_validation_only_checks_state() {
    let conn = meridian_db::open_memory().expect("open");
    markets::insert(&conn, &btc(5_000_000_000)).expect("insert");
    let no_index = BTreeMap::new();

    // Moving away from where the index was is fine at commit time.
    let away = MarketPriceUpdates::new(vec![MarketPriceUpdate::new(0, 4_000_000_000)]);
    perform_stateful_validation(&conn, &away, &no_index, true).expect("commit ok");

    let tiny = MarketPriceUpdates::new(vec![MarketPriceUpdate::new(0, 5_000_000_001)]);
    let err = perform_stateful_validation(&conn, &tiny, &no_index, true).expect_err("below min change");
    assert!(err.is_deterministic());

    let missing = MarketPriceUpdates::new(vec![MarketPriceUpdate::new(9, 1)]);
    let err = perform_stateful_validation(&conn, &missing, &no_index, true).expect_err("missing market");
    assert!(err.is_deterministic());
}

#[test]
fn failing_batch_is_not_partially_applied() {
    let mut conn = meridian_db::open_memory().expect("open");
    markets::insert(&conn, &btc(5_000_000_000)).expect("insert btc");
    markets::insert(
        &conn,
        &Market {
            id: 1,
            pair: "ETH-USD".to_string(),
            ..btc(3_000_000_000)
        },
    )
    .expect("insert eth");

    let err = store::apply_updates(
        &mut conn,
        &[
            MarketPriceUpdate::new(0, 5_100_000_000),
            MarketPriceUpdate::new(1, 3_100_000_000),
            MarketPriceUpdate::new(2, 1_000),
        ],
    )
    .expect_err("market 2 does not exist");
    assert!(matches!(err, OracleError::MarketNotFound(2)));

    let prices: Vec<u64> = markets::all(&conn)
        .expect("all")
        .into_iter()
        .map(|m| m.price)
        .collect();
    assert_eq!(prices, vec![5_000_000_000, 3_000_000_000]);
}
