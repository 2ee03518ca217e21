//! Behavior tests for the acquisition boundary: JSONL bar files, the DuckDB
//! warehouse and loading a universe from either.

use std::fs;
use std::path::Path;

use simseg_core::{
    load_universe, JsonlPriceSource, PriceSource, SimError, Symbol, TradingDate,
    WarehousePriceSource,
};
use simseg_warehouse::{BarRecord, Warehouse, WarehouseConfig};
use tempfile::tempdir;

fn date(value: &str) -> TradingDate {
    TradingDate::parse(value).expect("date")
}

fn bar_line(day: &str, close: f64) -> String {
    format!(
        r#"{{"date":"{day}","open":{close},"high":{high},"low":{low},"close":{close},"volume":1500}}"#,
        high = close + 1.0,
        low = close - 1.0,
    )
}

fn write_bars(dir: &Path, symbol: &str, bars: &[(&str, f64)]) {
    let body: Vec<String> = bars.iter().map(|(day, close)| bar_line(day, *close)).collect();
    fs::write(dir.join(format!("{symbol}.jsonl")), body.join("\n") + "\n").expect("bar file");
}

// =============================================================================
// JSONL bar files
// =============================================================================

#[test]
fn when_user_points_at_a_bar_directory_every_file_becomes_an_instrument() {
    let dir = tempdir().expect("tempdir");
    write_bars(dir.path(), "005930", &[("2022-05-12", 10.0), ("2022-05-13", 12.0)]);
    write_bars(dir.path(), "000660", &[("2022-05-12", 20.0)]);
    fs::write(dir.path().join("notes.txt"), "ignored").expect("stray file");

    let source = JsonlPriceSource::new(dir.path());
    let symbols: Vec<String> = source
        .list_symbols()
        .expect("symbols")
        .iter()
        .map(Symbol::to_string)
        .collect();
    assert_eq!(symbols, vec!["000660", "005930"]);

    let series = source
        .fetch(
            &Symbol::parse("005930").expect("symbol"),
            date("2022-05-13"),
            date("2022-05-31"),
        )
        .expect("fetch");
    assert_eq!(series.len(), 1);
    assert_eq!(series.bars()[0].close, 12.0);
    assert_eq!(series.bars()[0].volume, 1500.0);
}

#[test]
fn missing_or_malformed_bar_files_are_data_unavailable() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("BROKEN.jsonl"),
        format!("{}\n{{\"date\":\"2022-05-13\"}}\n", bar_line("2022-05-12", 1.0)),
    )
    .expect("bar file");
    let source = JsonlPriceSource::new(dir.path());

    let missing = source
        .fetch(
            &Symbol::parse("NOPE").expect("symbol"),
            date("2022-01-01"),
            date("2022-12-31"),
        )
        .expect_err("missing file");
    assert!(matches!(missing, SimError::DataUnavailable { .. }));

    let broken = source
        .fetch(
            &Symbol::parse("BROKEN").expect("symbol"),
            date("2022-01-01"),
            date("2022-12-31"),
        )
        .expect_err("malformed line");
    match broken {
        SimError::DataUnavailable { symbol, reason } => {
            assert_eq!(symbol, "BROKEN");
            assert!(reason.contains("line 2"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn lower_case_bar_file_names_are_listed_and_fetched_as_upper_case_symbols() {
    let dir = tempdir().expect("tempdir");
    write_bars(dir.path(), "aapl", &[("2022-05-12", 10.0), ("2022-05-13", 11.0)]);
    write_bars(dir.path(), "MSFT", &[("2022-05-12", 20.0), ("2022-05-13", 21.0)]);
    let source = JsonlPriceSource::new(dir.path());

    let aapl = Symbol::parse("AAPL").expect("symbol");
    let symbols = source.list_symbols().expect("symbols");
    assert_eq!(symbols, vec![aapl.clone(), Symbol::parse("MSFT").expect("symbol")]);

    let series = source
        .fetch(&aapl, date("2022-01-01"), date("2022-12-31"))
        .expect("fetch by normalized symbol");
    assert_eq!(series.symbol, aapl);
    assert_eq!(series.len(), 2);

    let universe = load_universe(&source, date("2022-01-01"), date("2022-12-31"), 2, false)
        .expect("universe");
    assert_eq!(universe.len(), 2);
    assert!(universe.contains(&aapl));
}

#[test]
fn loading_a_universe_segments_every_listed_instrument() {
    let dir = tempdir().expect("tempdir");
    write_bars(
        dir.path(),
        "A",
        &[
            ("2022-05-09", 1.0),
            ("2022-05-10", 2.0),
            ("2022-05-11", 3.0),
            ("2022-05-12", 4.0),
        ],
    );
    write_bars(dir.path(), "B", &[("2022-05-09", 5.0)]);

    let universe = load_universe(
        &JsonlPriceSource::new(dir.path()),
        date("2022-01-01"),
        date("2022-12-31"),
        3,
        false,
    )
    .expect("universe");

    assert_eq!(universe.len(), 2);
    assert_eq!(universe.window_len(), 3);
    let a = universe.get(&Symbol::parse("A").expect("symbol")).expect("A");
    assert_eq!(a.count(), 2);
    // Shorter than the window: kept, with no segments.
    let b = universe.get(&Symbol::parse("B").expect("symbol")).expect("B");
    assert_eq!(b.count(), 0);
}

#[test]
fn lenient_loading_skips_instruments_that_cannot_be_normalized() {
    let dir = tempdir().expect("tempdir");
    write_bars(dir.path(), "A", &[("2022-05-09", 1.0), ("2022-05-10", 2.0)]);
    fs::write(
        dir.path().join("ZERO.jsonl"),
        r#"{"date":"2022-05-09","open":0,"high":0,"low":0,"close":0,"volume":0}"#,
    )
    .expect("bar file");
    let source = JsonlPriceSource::new(dir.path());

    let strict = load_universe(&source, date("2022-01-01"), date("2022-12-31"), 2, false)
        .expect_err("strict load");
    assert!(matches!(strict, SimError::InvalidInput(_)));

    let lenient = load_universe(&source, date("2022-01-01"), date("2022-12-31"), 2, true)
        .expect("lenient load");
    assert_eq!(lenient.len(), 1);
    assert!(lenient.contains(&Symbol::parse("A").expect("symbol")));
}

// =============================================================================
// Warehouse
// =============================================================================

fn open_warehouse(root: &Path) -> Warehouse {
    Warehouse::open(WarehouseConfig {
        max_pool_size: 2,
        ..WarehouseConfig::in_home(root.join("simseg-home"))
    })
    .expect("warehouse open")
}

fn record(symbol: &str, day: &str, close: f64) -> BarRecord {
    BarRecord {
        symbol: symbol.to_string(),
        date: day.to_string(),
        open: close,
        high: close,
        low: close,
        close,
        volume: Some(100),
    }
}

#[test]
fn when_bars_are_ingested_the_warehouse_serves_them_as_series() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(temp.path());
    warehouse
        .ingest_daily_bars(
            "test",
            &[
                record("005930", "2022-05-11", 3.0),
                record("005930", "2022-05-09", 1.0),
                record("005930", "2022-05-10", 2.0),
                record("000660", "2022-05-09", 7.0),
            ],
        )
        .expect("ingest");

    let source = WarehousePriceSource::new(warehouse);
    let symbols = source.list_symbols().expect("symbols");
    assert_eq!(symbols.len(), 2);

    let series = source
        .fetch(
            &Symbol::parse("005930").expect("symbol"),
            date("2022-05-10"),
            date("2022-05-31"),
        )
        .expect("fetch");
    let dates: Vec<String> = series.bars().iter().map(|bar| bar.date.to_string()).collect();
    assert_eq!(dates, vec!["2022-05-10", "2022-05-11"]);
    assert_eq!(series.bars()[0].volume, 100.0);

    let universe = load_universe(&source, date("2022-01-01"), date("2022-12-31"), 2, false)
        .expect("universe");
    assert_eq!(universe.len(), 2);
}

#[test]
fn lower_case_symbols_ingested_into_the_warehouse_can_be_fetched() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_warehouse(temp.path());
    warehouse
        .ingest_daily_bars(
            "test",
            &[record("aapl", "2022-05-09", 1.0), record("aapl", "2022-05-10", 2.0)],
        )
        .expect("ingest");

    let source = WarehousePriceSource::new(warehouse);
    let aapl = Symbol::parse("AAPL").expect("symbol");
    assert_eq!(source.list_symbols().expect("symbols"), vec![aapl.clone()]);
    let series = source
        .fetch(&aapl, date("2022-01-01"), date("2022-12-31"))
        .expect("fetch");
    assert_eq!(series.len(), 2);
}

#[test]
fn unknown_symbols_in_the_warehouse_are_data_unavailable() {
    let temp = tempdir().expect("tempdir");
    let source = WarehousePriceSource::new(open_warehouse(temp.path()));

    let err = source
        .fetch(
            &Symbol::parse("NOPE").expect("symbol"),
            date("2022-01-01"),
            date("2022-12-31"),
        )
        .expect_err("no bars");
    assert!(matches!(err, SimError::DataUnavailable { .. }));
    assert!(err.is_fatal());
}
