//! Query orchestration: one query fans out over the comparison universe,
//! and a batch run walks snapshot steps × target instruments sequentially.
//!
//! A query moves through `Dispatching → Collecting → Merging → Writing →
//! Done`, or ends in `Failed` when any comparison task fails. Nothing is
//! written for a failed query.
//!
//! In a batch run, contract violations (`InvalidInput`, `DimensionMismatch`,
//! `Validation`) only fail their own query. `WorkerFailure` follows
//! [`FailurePolicy`]. Fatal errors always end the run.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::dispatch::Dispatcher;
use crate::report::{CompletedQuery, FailedQuery, RunReport};
use crate::search::{rank_global, search_instrument};
use crate::{
    DistanceMetric, FailurePolicy, MeanChannelL1, NeighborResult, ResultWriter, SearchConfig,
    SegmentedSeries, SimError, SnapshotManager, SnapshotView, Symbol, TradingDate, Universe,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPhase {
    Dispatching,
    Collecting,
    Merging,
    Writing,
    Done,
    Failed,
}

/// Global top-k for one query anchor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedQuery {
    pub symbol: Symbol,
    pub step: usize,
    pub as_of: TradingDate,
    pub anchor_offset: usize,
    pub results: Vec<NeighborResult>,
}

#[derive(Debug)]
pub enum QueryOutcome {
    Written {
        as_of: TradingDate,
        path: PathBuf,
        results: usize,
    },
    /// The query instrument has no visible segment, or no neighbour was found.
    Empty,
    Failed(SimError),
}

/// Trace of one query through its phases.
#[derive(Debug)]
pub struct QueryRun {
    pub symbol: Symbol,
    pub step: usize,
    pub phases: Vec<QueryPhase>,
    pub outcome: QueryOutcome,
}

impl QueryRun {
    pub fn final_phase(&self) -> Option<QueryPhase> {
        self.phases.last().copied()
    }
}

/// One comparison instrument under the active view.
struct ComparisonTask<'u> {
    instrument: &'u SegmentedSeries,
    bound: usize,
}

impl Display for ComparisonTask<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.instrument.symbol(), f)
    }
}

/// Runs queries with an injected dispatcher and distance metric.
pub struct QueryEngine<D, M = MeanChannelL1> {
    config: SearchConfig,
    dispatcher: D,
    metric: M,
}

impl<D: Dispatcher> QueryEngine<D> {
    pub fn new(config: SearchConfig, dispatcher: D) -> Result<Self, SimError> {
        Self::with_metric(config, dispatcher, MeanChannelL1)
    }
}

impl<D: Dispatcher, M: DistanceMetric> QueryEngine<D, M> {
    pub fn with_metric(config: SearchConfig, dispatcher: D, metric: M) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            config,
            dispatcher,
            metric,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Rank the neighbours of `symbol`'s last visible segment under `view`.
    ///
    /// Returns `None` when the instrument has no visible segment.
    pub fn search(
        &self,
        view: &SnapshotView<'_>,
        symbol: &Symbol,
    ) -> Result<Option<RankedQuery>, SimError> {
        let mut phases = Vec::new();
        self.search_traced(view, symbol, &mut phases)
    }

    fn search_traced(
        &self,
        view: &SnapshotView<'_>,
        symbol: &Symbol,
        phases: &mut Vec<QueryPhase>,
    ) -> Result<Option<RankedQuery>, SimError> {
        let universe = view.universe();
        self.check_window_len(universe)?;
        if !universe.contains(symbol) {
            return Err(SimError::data_unavailable(symbol.as_str(), "not in universe"));
        }
        let Some(anchor) = view.last_segment(symbol) else {
            return Ok(None);
        };
        let Some(as_of) = anchor.first_date() else {
            return Ok(None);
        };

        let tasks: Vec<ComparisonTask<'_>> = universe
            .instruments()
            .iter()
            .filter(|instrument| instrument.symbol() != symbol)
            .map(|instrument| ComparisonTask {
                instrument,
                bound: view.bound(instrument),
            })
            .collect();

        phases.push(QueryPhase::Dispatching);
        tracing::debug!(%symbol, step = view.step(), comparisons = tasks.len(), "dispatching");
        let k = self.config.per_instrument_k;
        let per_instrument = self.dispatcher.dispatch(&tasks, |task| {
            search_instrument(&self.metric, &anchor, task.instrument, task.bound, k)
        })?;
        phases.push(QueryPhase::Collecting);

        let per_instrument: Vec<Vec<NeighborResult>> = per_instrument
            .into_iter()
            .filter(|results| !results.is_empty())
            .collect();

        phases.push(QueryPhase::Merging);
        let results = rank_global(per_instrument, self.config.top_k);

        Ok(Some(RankedQuery {
            symbol: symbol.clone(),
            step: view.step(),
            as_of,
            anchor_offset: anchor.offset(),
            results,
        }))
    }

    /// Search and persist one query. Never panics on failure; the error is
    /// carried in the returned outcome.
    pub fn run_query(
        &self,
        view: &SnapshotView<'_>,
        symbol: &Symbol,
        writer: &ResultWriter,
    ) -> QueryRun {
        let started = Instant::now();
        let mut phases = Vec::with_capacity(5);
        let outcome = match self.search_traced(view, symbol, &mut phases) {
            Ok(Some(ranked)) if !ranked.results.is_empty() => {
                phases.push(QueryPhase::Writing);
                match writer.write(symbol, ranked.as_of, self.config.window_len, &ranked.results) {
                    Ok(path) => {
                        phases.push(QueryPhase::Done);
                        tracing::info!(
                            %symbol,
                            step = view.step(),
                            as_of = %ranked.as_of,
                            results = ranked.results.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            path = %path.display(),
                            "query written"
                        );
                        QueryOutcome::Written {
                            as_of: ranked.as_of,
                            path,
                            results: ranked.results.len(),
                        }
                    }
                    Err(error) => {
                        phases.push(QueryPhase::Failed);
                        QueryOutcome::Failed(error)
                    }
                }
            }
            Ok(_) => {
                phases.push(QueryPhase::Done);
                tracing::debug!(%symbol, step = view.step(), "nothing to write");
                QueryOutcome::Empty
            }
            Err(error) => {
                phases.push(QueryPhase::Failed);
                tracing::error!(%symbol, step = view.step(), %error, "query failed");
                QueryOutcome::Failed(error)
            }
        };

        QueryRun {
            symbol: symbol.clone(),
            step: view.step(),
            phases,
            outcome,
        }
    }

    /// Walk every snapshot step and target instrument, one query at a time.
    ///
    /// The report is written under the output root whether the run completes
    /// or aborts; an aborted report has no `finished_at`.
    pub fn run(&self, universe: &Universe, writer: &ResultWriter) -> Result<RunReport, SimError> {
        self.check_window_len(universe)?;
        let targets = self.resolve_targets(universe)?;
        let mut report = RunReport::start(&self.config, self.dispatcher.width());
        tracing::info!(
            run_id = %report.run_id,
            instruments = universe.len(),
            targets = targets.len(),
            steps = self.config.steps,
            workers = self.dispatcher.width(),
            "run started"
        );

        let manager = SnapshotManager::new(universe, self.config.steps);
        for view in manager.views() {
            tracing::info!(step = view.step(), "snapshot step");

            for symbol in &targets {
                let run = self.run_query(&view, symbol, writer);
                match run.outcome {
                    QueryOutcome::Written { as_of, path, results } => {
                        report.completed.push(CompletedQuery {
                            symbol: run.symbol,
                            step: run.step,
                            as_of,
                            path,
                            results,
                        });
                    }
                    QueryOutcome::Empty => report.skipped_empty += 1,
                    QueryOutcome::Failed(error) => {
                        report.failed.push(FailedQuery {
                            symbol: run.symbol,
                            step: run.step,
                            error: error.to_string(),
                        });

                        // Contract violations stay local to their query.
                        let abort = match &error {
                            SimError::WorkerFailure { .. } => {
                                self.config.on_query_failure == FailurePolicy::Abort
                            }
                            other => other.is_fatal(),
                        };
                        if abort {
                            if let Err(write_error) = report.write(writer.root()) {
                                tracing::error!(
                                    run_id = %report.run_id,
                                    error = %write_error,
                                    "failed to write run report"
                                );
                            }
                            return Err(error);
                        }
                        tracing::warn!(%symbol, step = view.step(), %error, "skipping failed query");
                    }
                }
            }
        }

        report.finish();
        let path = report.write(writer.root())?;
        tracing::info!(
            run_id = %report.run_id,
            completed = report.completed.len(),
            failed = report.failed.len(),
            report = %path.display(),
            "run finished"
        );
        Ok(report)
    }

    /// Result file names carry the configured L, so it must match the universe.
    fn check_window_len(&self, universe: &Universe) -> Result<(), SimError> {
        if universe.window_len() != self.config.window_len {
            return Err(SimError::DimensionMismatch {
                left: self.config.window_len,
                right: universe.window_len(),
            });
        }
        Ok(())
    }

    fn resolve_targets(&self, universe: &Universe) -> Result<Vec<Symbol>, SimError> {
        if self.config.targets.is_empty() {
            return Ok(universe.symbols().cloned().collect());
        }

        for symbol in &self.config.targets {
            if !universe.contains(symbol) {
                return Err(SimError::data_unavailable(
                    symbol.as_str(),
                    "query target not in universe",
                ));
            }
        }
        Ok(self.config.targets.clone())
    }
}
