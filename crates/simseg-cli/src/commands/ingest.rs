use std::time::Instant;

use serde_json::json;
use simseg_core::{JsonlPriceSource, PriceSource};
use simseg_warehouse::{BarRecord, Warehouse, WarehouseConfig};

use crate::cli::IngestArgs;
use crate::error::CliError;

use super::{parse_date, CommandOutcome};

pub fn run(args: &IngestArgs) -> Result<CommandOutcome, CliError> {
    let started = Instant::now();
    let start = parse_date(&args.start)?;
    let end = parse_date(&args.end)?;

    let config = match &args.home {
        Some(home) => WarehouseConfig::in_home(home),
        None => WarehouseConfig::default(),
    };
    let warehouse = Warehouse::open(config)?;
    let source = JsonlPriceSource::new(&args.dir);

    let symbols = source.list_symbols()?;
    let mut rows = 0_usize;
    for symbol in &symbols {
        let series = source.fetch(symbol, start, end)?;
        let records: Vec<BarRecord> = series
            .bars()
            .iter()
            .map(|bar| BarRecord {
                symbol: symbol.to_string(),
                date: bar.date.to_string(),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: Some(bar.volume.round() as i64),
            })
            .collect();
        rows += warehouse.ingest_daily_bars(&args.source_name, &records)?;
        tracing::debug!(%symbol, bars = records.len(), "ingested");
    }

    tracing::info!(
        symbols = symbols.len(),
        rows,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "ingest finished"
    );
    Ok(CommandOutcome::ok(json!({
        "db_path": warehouse.db_path(),
        "symbols": symbols,
        "rows": rows,
    })))
}
