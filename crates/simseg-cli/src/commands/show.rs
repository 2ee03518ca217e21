use std::path::PathBuf;

use serde::Serialize;
use simseg_core::{read_results, ResultWriter, SearchConfig, StoredNeighbor, Symbol, TradingDate};

use crate::cli::ShowArgs;
use crate::error::CliError;

use super::{parse_date, CommandOutcome};

#[derive(Debug, Serialize)]
struct ShowResponseData {
    symbol: Symbol,
    as_of: TradingDate,
    window_len: usize,
    path: PathBuf,
    neighbors: Vec<StoredNeighbor>,
}

pub fn run(args: &ShowArgs, config: &SearchConfig) -> Result<CommandOutcome, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let as_of = parse_date(&args.date)?;
    let window_len = args.window_len.unwrap_or(config.window_len);
    let root = args.output.as_ref().unwrap_or(&config.output_root);

    let path = ResultWriter::new(root).path_for(&symbol, as_of, window_len);
    if !path.is_file() {
        return Err(CliError::Command(format!(
            "no results for {symbol} as of {as_of} (window {window_len}) at {}",
            path.display()
        )));
    }
    let neighbors = read_results(&path)?;

    let data = serde_json::to_value(ShowResponseData {
        symbol,
        as_of,
        window_len,
        path,
        neighbors,
    })?;
    Ok(CommandOutcome::ok(data))
}
