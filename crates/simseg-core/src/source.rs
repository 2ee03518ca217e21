//! Acquisition boundary: where raw daily bars come from.
//!
//! Fetching is someone else's job; the search engine only needs complete,
//! date-ordered series for a symbol list and date range.
//!
//! | Source | Backing |
//! |--------|---------|
//! | [`InMemoryPriceSource`] | A map of series (tests, embedding) |
//! | [`JsonlPriceSource`] | A directory of `<SYMBOL>.jsonl` bar files |
//! | [`WarehousePriceSource`] | The DuckDB `bars_1d` table |

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;
use simseg_warehouse::{BarRecord, Warehouse};

use crate::{
    normalize, segment, Bar, PriceSeries, SimError, Symbol, TradingDate, Universe,
};

/// Instruments per progress log line while loading.
const PROGRESS_EVERY: usize = 500;

/// Supplies daily OHLCV series.
pub trait PriceSource: Send + Sync {
    /// Every symbol this source can serve, in a stable order.
    fn list_symbols(&self) -> Result<Vec<Symbol>, SimError>;

    /// Bars with `start <= date <= end`.
    fn fetch(
        &self,
        symbol: &Symbol,
        start: TradingDate,
        end: TradingDate,
    ) -> Result<PriceSeries, SimError>;
}

/// Fixed set of series held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceSource {
    series: BTreeMap<Symbol, PriceSeries>,
}

impl InMemoryPriceSource {
    pub fn new(series: impl IntoIterator<Item = PriceSeries>) -> Self {
        Self {
            series: series
                .into_iter()
                .map(|series| (series.symbol.clone(), series))
                .collect(),
        }
    }
}

impl PriceSource for InMemoryPriceSource {
    fn list_symbols(&self) -> Result<Vec<Symbol>, SimError> {
        Ok(self.series.keys().cloned().collect())
    }

    fn fetch(
        &self,
        symbol: &Symbol,
        start: TradingDate,
        end: TradingDate,
    ) -> Result<PriceSeries, SimError> {
        self.series
            .get(symbol)
            .map(|series| series.between(start, end))
            .ok_or_else(|| SimError::data_unavailable(symbol.as_str(), "unknown symbol"))
    }
}

/// One line of a bar file.
#[derive(Debug, Deserialize)]
struct BarLine {
    date: TradingDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Directory of `<SYMBOL>.jsonl` files, one bar object per line.
#[derive(Debug, Clone)]
pub struct JsonlPriceSource {
    dir: PathBuf,
}

impl JsonlPriceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every `.jsonl` file whose stem is a valid symbol. Stems are
    /// normalized, so `aapl.jsonl` is listed as `AAPL`.
    fn bar_files(&self) -> Result<Vec<(Symbol, PathBuf)>, SimError> {
        let entries = fs::read_dir(&self.dir).map_err(|error| {
            SimError::data_unavailable(self.dir.display().to_string(), error.to_string())
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match Symbol::parse(stem) {
                Ok(symbol) => files.push((symbol, path)),
                Err(error) => {
                    tracing::warn!(file = %path.display(), %error, "ignoring bar file");
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// `<SYMBOL>.jsonl` when present, else the first file whose stem
    /// normalizes to `symbol`.
    fn path_for(&self, symbol: &Symbol) -> Result<PathBuf, SimError> {
        let exact = self.dir.join(format!("{symbol}.jsonl"));
        if exact.is_file() {
            return Ok(exact);
        }

        Ok(self
            .bar_files()?
            .into_iter()
            .find(|(candidate, _)| candidate == symbol)
            .map(|(_, path)| path)
            .unwrap_or(exact))
    }
}

impl PriceSource for JsonlPriceSource {
    fn list_symbols(&self) -> Result<Vec<Symbol>, SimError> {
        let mut symbols: Vec<Symbol> = self
            .bar_files()?
            .into_iter()
            .map(|(symbol, _)| symbol)
            .collect();
        symbols.dedup();
        Ok(symbols)
    }

    fn fetch(
        &self,
        symbol: &Symbol,
        start: TradingDate,
        end: TradingDate,
    ) -> Result<PriceSeries, SimError> {
        let path = self.path_for(symbol)?;
        let file = File::open(&path).map_err(|error| {
            SimError::data_unavailable(symbol.as_str(), format!("{}: {error}", path.display()))
        })?;

        let mut bars = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row: BarLine = serde_json::from_str(&line).map_err(|error| {
                SimError::data_unavailable(
                    symbol.as_str(),
                    format!("{} line {}: {error}", path.display(), index + 1),
                )
            })?;
            if row.date < start || row.date > end {
                continue;
            }
            bars.push(Bar::new(
                row.date, row.open, row.high, row.low, row.close, row.volume,
            )?);
        }

        Ok(PriceSeries::new(symbol.clone(), bars)?)
    }
}

/// Daily bars stored in the DuckDB warehouse.
#[derive(Clone)]
pub struct WarehousePriceSource {
    warehouse: Warehouse,
}

impl WarehousePriceSource {
    pub fn new(warehouse: Warehouse) -> Self {
        Self { warehouse }
    }
}

impl PriceSource for WarehousePriceSource {
    fn list_symbols(&self) -> Result<Vec<Symbol>, SimError> {
        self.warehouse
            .daily_symbols()?
            .iter()
            .map(|symbol| Symbol::parse(symbol).map_err(SimError::from))
            .collect()
    }

    fn fetch(
        &self,
        symbol: &Symbol,
        start: TradingDate,
        end: TradingDate,
    ) -> Result<PriceSeries, SimError> {
        let records = self.warehouse.daily_bars(
            symbol.as_str(),
            &start.to_string(),
            &end.to_string(),
        )?;
        if records.is_empty() {
            return Err(SimError::data_unavailable(
                symbol.as_str(),
                format!("no bars between {start} and {end}"),
            ));
        }

        let bars = records
            .iter()
            .map(bar_from_record)
            .collect::<Result<Vec<_>, SimError>>()?;
        Ok(PriceSeries::new(symbol.clone(), bars)?)
    }
}

fn bar_from_record(record: &BarRecord) -> Result<Bar, SimError> {
    let date = TradingDate::parse(&record.date)?;
    Ok(Bar::new(
        date,
        record.open,
        record.high,
        record.low,
        record.close,
        record.volume.unwrap_or(0) as f64,
    )?)
}

/// Fetch, normalize and segment every instrument the source lists.
///
/// A fetch failure is fatal. A series that cannot be normalized aborts the
/// load unless `lenient`, in which case the instrument is skipped.
pub fn load_universe(
    source: &dyn PriceSource,
    start: TradingDate,
    end: TradingDate,
    window_len: usize,
    lenient: bool,
) -> Result<Universe, SimError> {
    let symbols = source.list_symbols()?;
    let total = symbols.len();
    let mut universe = Universe::new(window_len);
    let mut batch_started = Instant::now();

    for (index, symbol) in symbols.iter().enumerate() {
        if (index + 1) % PROGRESS_EVERY == 0 {
            tracing::info!(
                loaded = index + 1,
                total,
                elapsed_ms = batch_started.elapsed().as_millis() as u64,
                "loading universe"
            );
            batch_started = Instant::now();
        }

        let series = source.fetch(symbol, start, end)?;
        let normalized = match normalize(&series) {
            Ok(normalized) => normalized,
            Err(error) if lenient => {
                tracing::warn!(%symbol, %error, "skipping instrument");
                continue;
            }
            Err(error) => return Err(error),
        };
        universe.insert(segment(normalized, window_len)?)?;
    }

    tracing::info!(instruments = universe.len(), window_len, "universe loaded");
    Ok(universe)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: &str, close: f64) -> Bar {
        Bar::new(TradingDate::parse(day).expect("date"), close, close, close, close, 10.0)
            .expect("bar")
    }

    fn date(value: &str) -> TradingDate {
        TradingDate::parse(value).expect("date")
    }

    #[test]
    fn in_memory_source_filters_range_and_reports_unknown_symbols() {
        let symbol = Symbol::parse("A").expect("symbol");
        let source = InMemoryPriceSource::new(vec![PriceSeries::new(
            symbol.clone(),
            vec![bar("2024-01-02", 1.0), bar("2024-01-03", 2.0)],
        )
        .expect("series")]);

        let fetched = source
            .fetch(&symbol, date("2024-01-03"), date("2024-12-31"))
            .expect("fetch");
        assert_eq!(fetched.len(), 1);

        let missing = Symbol::parse("B").expect("symbol");
        let err = source
            .fetch(&missing, date("2024-01-01"), date("2024-12-31"))
            .expect_err("must fail");
        assert!(matches!(err, SimError::DataUnavailable { .. }));
    }

    #[test]
    fn strict_load_rejects_unnormalizable_series_and_lenient_skips_it() {
        let good = PriceSeries::new(
            Symbol::parse("GOOD").expect("symbol"),
            vec![bar("2024-01-02", 1.0), bar("2024-01-03", 2.0)],
        )
        .expect("series");
        let empty = PriceSeries::new(Symbol::parse("EMPTY").expect("symbol"), Vec::new())
            .expect("series");
        let source = InMemoryPriceSource::new(vec![good, empty]);

        let err = load_universe(&source, date("2024-01-01"), date("2024-12-31"), 2, false)
            .expect_err("strict load must fail");
        assert!(matches!(err, SimError::InvalidInput(_)));

        let universe = load_universe(&source, date("2024-01-01"), date("2024-12-31"), 2, true)
            .expect("lenient load");
        assert_eq!(universe.len(), 1);
        assert!(universe.contains(&Symbol::parse("GOOD").expect("symbol")));
    }
}
