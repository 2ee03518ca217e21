use serde::Serialize;
use simseg_core::{
    Dispatcher, NeighborResult, PooledDispatcher, QueryEngine, RankedQuery, SearchConfig,
    SerialDispatcher, Symbol, Universe,
};

use crate::cli::SearchArgs;
use crate::error::CliError;

use super::{apply_engine_args, load, CommandOutcome};

/// Printed when the instrument has no visible segment at the requested step.
#[derive(Debug, Serialize)]
struct EmptyQueryData {
    symbol: Symbol,
    step: usize,
    results: Vec<NeighborResult>,
}

pub fn run(args: &SearchArgs, mut config: SearchConfig) -> Result<CommandOutcome, CliError> {
    apply_engine_args(&mut config, &args.engine);
    config.validate()?;
    let symbol = Symbol::parse(&args.symbol)?;

    let universe = load(&args.source, &config)?;
    let ranked = if args.engine.serial {
        search_once(config, SerialDispatcher, &universe, &symbol, args.step)?
    } else {
        let dispatcher = PooledDispatcher::new(config.workers)?;
        search_once(config, dispatcher, &universe, &symbol, args.step)?
    };

    let data = match ranked {
        Some(ranked) => serde_json::to_value(ranked)?,
        None => serde_json::to_value(EmptyQueryData {
            symbol,
            step: args.step,
            results: Vec::new(),
        })?,
    };
    Ok(CommandOutcome::ok(data))
}

fn search_once<D: Dispatcher>(
    config: SearchConfig,
    dispatcher: D,
    universe: &Universe,
    symbol: &Symbol,
    step: usize,
) -> Result<Option<RankedQuery>, CliError> {
    let engine = QueryEngine::new(config, dispatcher)?;
    Ok(engine.search(&universe.view(step), symbol)?)
}
