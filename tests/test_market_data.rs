//! Cache-first market data through the `StrikeFinder` facade.

mod common;

use common::*;
use std::sync::Arc;
use strikefinder::application::delta_strike::{DeltaStrikeRequest, ResolverConfig};
use strikefinder::application::market_data::QuoteSide;
use strikefinder::domain::entities::quote::QuoteRecord;
use strikefinder::domain::values::date_range::DateRange;
use strikefinder::domain::values::right::Right;
use strikefinder::infrastructure::files::csv_quote_store::CsvQuoteStore;
use strikefinder::StrikeFinder;

fn quotes() -> Vec<QuoteRecord> {
    vec![
        QuoteRecord::new(OPEN_TS, 1.0, 1.1),
        QuoteRecord::new(OPEN_TS + 60, 1.2, 1.3),
        QuoteRecord::new(OPEN_TS + 120, 1.4, 1.5),
        QuoteRecord::new(OPEN_TS + 180, 0.0, 0.0),
    ]
}

fn trades() -> Vec<QuoteRecord> {
    vec![QuoteRecord {
        timestamp: OPEN_TS + 60,
        bid: 1.2,
        ask: 1.3,
        last: Some(1.25),
        volume: Some(4),
        trade_count: Some(2),
    }]
}

fn chain() -> FakeSource {
    FakeSource::linear_chain(strikes(95..=105), 100.0)
        .with_quotes(quotes())
        .with_trades(trades())
}

#[tokio::test]
async fn test_greeks_served_from_cache_on_second_call() {
    let source = Arc::new(chain());
    let sf = setup(source.clone(), ResolverConfig::default());
    let c = contract(Right::Call, 100.0);
    let day = DateRange::single(trade_day());

    let first = sf.option_greeks(&c, day, false).await.unwrap().unwrap();
    let second = sf.option_greeks(&c, day, false).await.unwrap().unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(source.calls("historical_greeks"), 1);
    assert_eq!(sf.cached_dates(&c.symbol()).unwrap().into_iter().collect::<Vec<_>>(), vec![trade_day()]);
}

#[tokio::test]
async fn test_uncovered_range_end_refetches() {
    let source = Arc::new(chain());
    let sf = setup(source.clone(), ResolverConfig::default());
    let c = contract(Right::Call, 100.0);
    let next_day = trade_day().succ_opt().unwrap();

    sf.option_greeks(&c, DateRange::single(trade_day()), false).await.unwrap();
    let rows = sf
        .option_greeks(&c, DateRange::new(trade_day(), next_day).unwrap(), false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(rows.len(), 6);
    assert_eq!(source.calls("historical_greeks"), 2);
    assert_eq!(sf.cached_dates(&c.symbol()).unwrap().len(), 2);
}

#[tokio::test]
async fn test_quotes_only_cache_is_stale_for_greeks() {
    let source = Arc::new(chain());
    let sf = setup(source.clone(), ResolverConfig::default());
    let c = contract(Right::Call, 100.0);
    let day = DateRange::single(trade_day());

    let quoted = sf.option_quotes(&c, day).await.unwrap().unwrap();
    assert_eq!(quoted.len(), 3, "zero bid and ask row dropped");

    sf.option_greeks(&c, day, false).await.unwrap().unwrap();
    assert_eq!(source.calls("historical_greeks"), 1);

    sf.option_greeks(&c, day, false).await.unwrap().unwrap();
    assert_eq!(source.calls("historical_greeks"), 1);

    // quotes still come out of the merged series
    sf.option_quotes(&c, day).await.unwrap().unwrap();
    assert_eq!(source.calls("historical_quotes"), 1);
}

#[tokio::test]
async fn test_greeks_with_trades_joined() {
    let source = Arc::new(
        chain().with_trades(vec![QuoteRecord {
            timestamp: TEN_AM_TS,
            bid: 1.0,
            ask: 1.1,
            last: Some(1.05),
            volume: Some(7),
            trade_count: Some(3),
        }]),
    );
    let sf = setup(source.clone(), ResolverConfig::default());

    let rows = sf
        .option_greeks(&contract(Right::Call, 100.0), DateRange::single(trade_day()), true)
        .await
        .unwrap()
        .unwrap();

    let ten = rows.iter().find(|r| r.timestamp == TEN_AM_TS).unwrap();
    assert_eq!(ten.last, Some(1.05));
    assert_eq!(ten.volume, Some(7));
    assert!(rows.iter().filter(|r| r.timestamp != TEN_AM_TS).all(|r| r.last.is_none()));
    assert_eq!(source.calls("historical_trades"), 1);
}

#[tokio::test]
async fn test_resolver_cache_does_not_hide_trades() {
    let source = Arc::new(chain().with_trades(vec![QuoteRecord {
        timestamp: TEN_AM_TS,
        bid: 1.0,
        ask: 1.1,
        last: Some(1.05),
        volume: Some(7),
        trade_count: Some(3),
    }]));
    let sf = setup(source.clone(), ResolverConfig::default());
    let request = DeltaStrikeRequest {
        root: ROOT.to_string(),
        expiration: expiration(),
        right: Right::Call,
        target_delta: 0.5,
        at_time: TEN_AM_TS,
        spot_price: Some(100.0),
    };
    let matched = sf.delta_strike(&request).await.unwrap();
    assert_eq!(source.calls("historical_trades"), 0);

    let day = DateRange::single(trade_day());
    let rows = sf.option_greeks(&matched.contract, day, true).await.unwrap().unwrap();
    let ten = rows.iter().find(|r| r.timestamp == TEN_AM_TS).unwrap();
    assert_eq!(ten.last, Some(1.05));
    assert_eq!(ten.volume, Some(7));
    assert_eq!(source.calls("historical_trades"), 1);

    // joined rows now satisfy both kinds of request from cache
    let greeks_fetches = source.calls("historical_greeks");
    sf.option_greeks(&matched.contract, day, true).await.unwrap().unwrap();
    sf.option_greeks(&matched.contract, day, false).await.unwrap().unwrap();
    assert_eq!(source.calls("historical_greeks"), greeks_fetches);
    assert_eq!(source.calls("historical_trades"), 1);
}

#[tokio::test]
async fn test_open_interest_passthrough() {
    let source = Arc::new(chain());
    let sf = setup(source.clone(), ResolverConfig::default());
    let range = DateRange::new(trade_day(), trade_day().succ_opt().unwrap()).unwrap();

    let rows = sf.open_interest(&contract(Right::Call, 100.0), range).await.unwrap().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].timestamp, OPEN_TS - 3 * 3600);
    assert_eq!(rows[0].open_interest, 1520);

    assert!(sf.open_interest(&contract(Right::Call, 250.0), range).await.unwrap().is_none());
    assert_eq!(source.calls("open_interest"), 2);
    assert!(sf.cached_symbols().unwrap().is_empty());
}

#[tokio::test]
async fn test_trade_quotes_carry_last_forward() {
    let source = Arc::new(chain());
    let sf = setup(source, ResolverConfig::default());

    let rows = sf
        .option_trade_quotes(&contract(Right::Put, 100.0), DateRange::single(trade_day()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].last, None);
    assert_eq!(rows[1].last, Some(1.25));
    assert_eq!(rows[1].trade_count, Some(2));
    assert_eq!(rows[2].last, Some(1.25));
    assert_eq!(rows[2].volume, None);
}

#[tokio::test]
async fn test_price_at_time_first_quote_after() {
    let source = Arc::new(chain());
    let sf = setup(source.clone(), ResolverConfig::default());
    let c = contract(Right::Call, 100.0);

    let buy = sf.price_at_time(&c, OPEN_TS + 30, "BTO".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(buy.side, QuoteSide::Ask);
    assert_eq!(buy.price, 1.3);
    assert_eq!(buy.timestamp, OPEN_TS + 60);
    assert_eq!(buy.lag_secs, 30);

    // strictly after: a quote at exactly the requested time is skipped
    let sell = sf.price_at_time(&c, OPEN_TS + 60, "STC".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(sell.side, QuoteSide::Bid);
    assert_eq!(sell.price, 1.4);
    assert_eq!(source.calls("historical_quotes"), 1, "bracketed by cached rows");

    let late = sf.price_at_time(&c, OPEN_TS + 150, QuoteSide::Ask).await.unwrap();
    assert!(late.is_none());
    assert_eq!(source.calls("historical_quotes"), 2);
}

#[tokio::test]
async fn test_stock_quotes_cached_under_upper_ticker() {
    let source = Arc::new(chain());
    let sf = setup(source.clone(), ResolverConfig::default());
    let day = DateRange::single(trade_day());

    let rows = sf.stock_quotes("spy", day).await.unwrap().unwrap();
    sf.stock_quotes("SPY", day).await.unwrap().unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(source.calls("historical_stock_quotes"), 1);
    assert_eq!(sf.cached_symbols().unwrap(), vec!["SPY".to_string()]);
}

#[tokio::test]
async fn test_no_data_is_not_an_error() {
    let source = Arc::new(FakeSource::linear_chain(strikes(95..=105), 100.0));
    let sf = setup(source, ResolverConfig::default());
    let day = DateRange::single(trade_day());

    assert!(sf.option_quotes(&contract(Right::Call, 100.0), day).await.unwrap().is_none());
    assert!(sf.option_greeks(&contract(Right::Call, 250.0), day, false).await.unwrap().is_none());
    assert!(sf.cached_symbols().unwrap().is_empty());

    let unlisted = setup(Arc::new(FakeSource::unlisted()), ResolverConfig::default());
    assert!(unlisted.strikes(ROOT, expiration()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_point_in_time_passthrough() {
    let source = Arc::new(chain());
    let sf = setup(source.clone(), ResolverConfig::default());
    let c = contract(Right::Put, 100.0);

    let snap = sf.snapshot_greeks(&c).await.unwrap().unwrap();
    assert!((snap.delta + 0.5).abs() < 1e-9);
    let at = sf.greeks_at(&c, OPEN_TS + 5).await.unwrap().unwrap();
    assert_eq!(at.timestamp, OPEN_TS + 5);
    assert_eq!(sf.expirations(ROOT).await.unwrap(), Some(vec![expiration()]));
    assert_eq!(sf.strikes(ROOT, expiration()).await.unwrap().unwrap().len(), 11);
    // point-in-time reads are not cached
    assert!(sf.cached_symbols().unwrap().is_empty());
}

#[tokio::test]
async fn test_csv_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let c = contract(Right::Call, 100.0);
    let day = DateRange::single(trade_day());

    let first_source = Arc::new(chain());
    let store = Arc::new(CsvQuoteStore::new(dir.path()).unwrap());
    let sf = StrikeFinder::with_providers(first_source.clone(), store, 1000, ResolverConfig::default());
    let fetched = sf.option_greeks(&c, day, false).await.unwrap().unwrap();
    assert!(dir.path().join(format!("{}.csv", c.symbol())).exists());

    let second_source = Arc::new(chain());
    let store = Arc::new(CsvQuoteStore::new(dir.path()).unwrap());
    let sf = StrikeFinder::with_providers(second_source.clone(), store, 1000, ResolverConfig::default());
    let cached = sf.option_greeks(&c, day, false).await.unwrap().unwrap();

    assert_eq!(fetched, cached);
    assert_eq!(second_source.calls("historical_greeks"), 0);
    assert_eq!(sf.cached_symbols().unwrap(), vec![c.symbol()]);
}
