//! CLI argument definitions for simseg.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Batch similar-segment search over every snapshot step |
//! | `search` | One query, printed to stdout, nothing written |
//! | `show` | Print a stored result file |
//! | `dates` | List as-of dates that have results |
//! | `ingest` | Load JSONL bar files into the DuckDB warehouse |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--config` | none | JSON file with `SearchConfig` fields |
//! | `--strict` | `false` | Exit 5 when any query failed under `skip-query` |
//!
//! # Examples
//!
//! ```bash
//! # Load bar files into the warehouse once
//! simseg ingest ./bars
//!
//! # Full batch run from the warehouse
//! simseg run --source warehouse --start 2022-01-01 --end 2022-05-16
//!
//! # One query, as of three segments ago
//! simseg search 005930 --data-dir ./bars --start 2022-01-01 --end 2022-05-16 --step 3 --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// simseg - similar price-segment search
///
/// Finds, for the latest window of an instrument's price history, the most
/// similar windows across every other instrument.
#[derive(Debug, Parser)]
#[command(name = "simseg", author, version, about = "Similar price-segment search")]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Search configuration file (JSON). Flags override its values.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Treat failed queries as a run failure (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search every target instrument at every snapshot step and write results.
    ///
    /// # Examples
    ///
    ///   simseg run --data-dir ./bars --start 2022-01-01 --end 2022-05-16
    ///   simseg run --source warehouse --start 2022-01-01 --end 2022-05-16 --targets 005930,000660
    Run(RunArgs),

    /// Search one instrument at one snapshot step and print the ranked neighbours.
    Search(SearchArgs),

    /// Print a stored result file.
    ///
    /// # Examples
    ///
    ///   simseg show 005930 2022-05-10
    Show(ShowArgs),

    /// List as-of dates that have a result directory.
    Dates(DatesArgs),

    /// Load `<SYMBOL>.jsonl` bar files into the DuckDB warehouse.
    Ingest(IngestArgs),
}

/// Where price histories are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Directory of `<SYMBOL>.jsonl` bar files.
    Jsonl,
    /// `bars_1d` table of the DuckDB warehouse.
    Warehouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicyArg {
    /// Stop the run at the first failed query.
    Abort,
    /// Record the failure and continue with the next query.
    SkipQuery,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    #[arg(long, value_enum, default_value_t = SourceKind::Jsonl)]
    pub source: SourceKind,

    /// Bar file directory for `jsonl`; simseg home for `warehouse`.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// First date of the loaded history (YYYY-MM-DD).
    #[arg(long)]
    pub start: String,

    /// Last date of the loaded history (YYYY-MM-DD).
    #[arg(long)]
    pub end: String,

    /// Skip instruments that cannot be normalized instead of failing.
    #[arg(long, default_value_t = false)]
    pub lenient: bool,
}

#[derive(Debug, Args)]
pub struct EngineArgs {
    /// Segment length in trading days.
    #[arg(long)]
    pub window_len: Option<usize>,

    /// Worker pool width.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Run comparisons on the calling thread instead of the worker pool.
    #[arg(long, default_value_t = false)]
    pub serial: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Number of as-of snapshot steps.
    #[arg(long)]
    pub steps: Option<usize>,

    /// Query instruments, comma separated. Defaults to the whole universe.
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Root directory for result files.
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub on_query_failure: Option<FailurePolicyArg>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query instrument.
    pub symbol: String,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Trailing segments hidden from every instrument.
    #[arg(long, default_value_t = 0)]
    pub step: usize,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub symbol: String,

    /// As-of date (YYYY-MM-DD).
    pub date: String,

    #[arg(long)]
    pub window_len: Option<usize>,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct DatesArgs {
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Directory of `<SYMBOL>.jsonl` bar files.
    pub dir: PathBuf,

    /// Simseg home holding the warehouse (defaults to `SIMSEG_HOME`).
    #[arg(long)]
    pub home: Option<PathBuf>,

    /// Source label stored with every row.
    #[arg(long, default_value = "jsonl")]
    pub source_name: String,

    #[arg(long, default_value = "1900-01-01")]
    pub start: String,

    #[arg(long, default_value = "2999-12-31")]
    pub end: String,
}
