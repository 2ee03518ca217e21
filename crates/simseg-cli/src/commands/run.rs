use std::path::PathBuf;

use serde::Serialize;
use simseg_core::{
    Dispatcher, PooledDispatcher, QueryEngine, ResultWriter, RunReport, SearchConfig,
    SerialDispatcher, Symbol, Universe,
};

use crate::cli::RunArgs;
use crate::error::CliError;

use super::{apply_engine_args, failure_policy, load, CommandOutcome};

#[derive(Debug, Serialize)]
struct RunResponseData {
    report_path: PathBuf,
    report: RunReport,
}

pub fn run(args: &RunArgs, mut config: SearchConfig) -> Result<CommandOutcome, CliError> {
    apply_engine_args(&mut config, &args.engine);
    if let Some(steps) = args.steps {
        config.steps = steps;
    }
    if let Some(output) = &args.output {
        config.output_root = output.clone();
    }
    if let Some(policy) = args.on_query_failure {
        config.on_query_failure = failure_policy(policy);
    }
    if !args.targets.is_empty() {
        config.targets = args
            .targets
            .iter()
            .map(|target| Symbol::parse(target))
            .collect::<Result<Vec<_>, _>>()?;
    }
    config.validate()?;

    let universe = load(&args.source, &config)?;
    let writer = ResultWriter::new(&config.output_root);

    let report = if args.engine.serial {
        execute(config, SerialDispatcher, &universe, &writer)?
    } else {
        let dispatcher = PooledDispatcher::new(config.workers)?;
        execute(config, dispatcher, &universe, &writer)?
    };

    let failed_queries = report.failed.len();
    let data = serde_json::to_value(RunResponseData {
        report_path: report.path_in(writer.root()),
        report,
    })?;
    Ok(CommandOutcome {
        data,
        failed_queries,
    })
}

fn execute<D: Dispatcher>(
    config: SearchConfig,
    dispatcher: D,
    universe: &Universe,
    writer: &ResultWriter,
) -> Result<RunReport, CliError> {
    let engine = QueryEngine::new(config, dispatcher)?;
    Ok(engine.run(universe, writer)?)
}
