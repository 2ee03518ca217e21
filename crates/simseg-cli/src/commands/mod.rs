mod dates;
mod ingest;
mod run;
mod search;
mod show;

use std::path::Path;

use serde_json::Value;
use simseg_core::{
    load_universe, FailurePolicy, JsonlPriceSource, PriceSource, SearchConfig, TradingDate,
    Universe, WarehousePriceSource,
};
use simseg_warehouse::{Warehouse, WarehouseConfig};

use crate::cli::{Cli, Command, EngineArgs, FailurePolicyArg, SourceArgs, SourceKind};
use crate::error::CliError;

pub struct CommandOutcome {
    pub data: Value,
    /// Queries recorded as failed by a batch run.
    pub failed_queries: usize,
}

impl CommandOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            failed_queries: 0,
        }
    }
}

pub fn run(cli: &Cli) -> Result<CommandOutcome, CliError> {
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Run(args) => run::run(args, config),
        Command::Search(args) => search::run(args, config),
        Command::Show(args) => show::run(args, &config),
        Command::Dates(args) => dates::run(args, &config),
        Command::Ingest(args) => ingest::run(args),
    }
}

fn load_config(path: Option<&Path>) -> Result<SearchConfig, CliError> {
    match path {
        Some(path) => Ok(SearchConfig::from_json_file(path)?),
        None => Ok(SearchConfig::default()),
    }
}

fn apply_engine_args(config: &mut SearchConfig, args: &EngineArgs) {
    if let Some(window_len) = args.window_len {
        config.window_len = window_len;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
}

fn failure_policy(arg: FailurePolicyArg) -> FailurePolicy {
    match arg {
        FailurePolicyArg::Abort => FailurePolicy::Abort,
        FailurePolicyArg::SkipQuery => FailurePolicy::SkipQuery,
    }
}

fn parse_date(value: &str) -> Result<TradingDate, CliError> {
    Ok(TradingDate::parse(value)?)
}

fn open_source(args: &SourceArgs) -> Result<Box<dyn PriceSource>, CliError> {
    match args.source {
        SourceKind::Jsonl => {
            let dir = args.data_dir.as_ref().ok_or_else(|| {
                CliError::Command(String::from("--data-dir is required for the jsonl source"))
            })?;
            Ok(Box::new(JsonlPriceSource::new(dir)))
        }
        SourceKind::Warehouse => {
            let config = match &args.data_dir {
                Some(home) => WarehouseConfig::in_home(home),
                None => WarehouseConfig::default(),
            };
            Ok(Box::new(WarehousePriceSource::new(Warehouse::open(config)?)))
        }
    }
}

fn load(args: &SourceArgs, config: &SearchConfig) -> Result<Universe, CliError> {
    let start = parse_date(&args.start)?;
    let end = parse_date(&args.end)?;
    if end < start {
        return Err(CliError::Command(format!(
            "--end {end} is before --start {start}"
        )));
    }

    let source = open_source(args)?;
    Ok(load_universe(
        source.as_ref(),
        start,
        end,
        config.window_len,
        config.lenient || args.lenient,
    )?)
}
