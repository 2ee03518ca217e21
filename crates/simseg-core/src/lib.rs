//! # Simseg Core
//!
//! Similar-segment search over daily OHLCV price histories.
//!
//! ## Overview
//!
//! Every instrument's history is normalized by its maximum close and cut into
//! overlapping windows of `L` bars. For a query instrument, the most recent
//! window is compared with every window of every other instrument under a
//! mean per-channel L1 distance. The best three per instrument are merged into
//! a global top ten and written as JSON Lines, keyed by as-of date.
//!
//! A batch run repeats this for 30 as-of steps, hiding one more trailing
//! window of every instrument at each step, without copying any segment.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Symbols, trading dates, bars and price series |
//! | [`normalize`] | Scale a series by its maximum close |
//! | [`segment`] | Borrowed sliding windows over a normalized series |
//! | [`distance`] | Segment distance metrics |
//! | [`search`] | Per-instrument and global top-k ranking |
//! | [`snapshot`] | The segment universe and its as-of views |
//! | [`dispatch`] | Serial and pooled fan-out strategies |
//! | [`engine`] | Query lifecycle and the batch run loop |
//! | [`writer`] | Result file layout and JSONL persistence |
//! | [`report`] | Run manifests under `_runs/` |
//! | [`source`] | Price sources and universe loading |
//! | [`config`] | Run configuration |
//! | [`error`] | Error types |
//!
//! ## Pipeline
//!
//! ```text
//! PriceSource ──▶ normalize ──▶ segment ──▶ Universe
//!                                              │
//!                                   SnapshotManager (step 0..steps)
//!                                              │
//!                                              ▼
//!              QueryEngine ──▶ Dispatcher ──▶ search_instrument (per instrument)
//!                   │                               │
//!                   ▼                               ▼
//!             ResultWriter ◀────────────────── rank_global
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use simseg_core::{
//!     load_universe, JsonlPriceSource, PooledDispatcher, QueryEngine, ResultWriter,
//!     SearchConfig, TradingDate,
//! };
//!
//! let config = SearchConfig::default();
//! let source = JsonlPriceSource::new("bars/");
//! let universe = load_universe(
//!     &source,
//!     TradingDate::parse("2022-01-01")?,
//!     TradingDate::parse("2022-05-16")?,
//!     config.window_len,
//!     config.lenient,
//! )?;
//! let writer = ResultWriter::new(&config.output_root);
//! let engine = QueryEngine::new(config.clone(), PooledDispatcher::new(config.workers)?)?;
//! let report = engine.run(&universe, &writer)?;
//! println!("{} result files", report.completed.len());
//! ```

pub mod config;
pub mod dispatch;
pub mod distance;
pub mod domain;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod report;
pub mod search;
pub mod segment;
pub mod snapshot;
pub mod source;
pub mod writer;

pub use config::{FailurePolicy, SearchConfig, DEFAULT_OUTPUT_ROOT, DEFAULT_WINDOW_LEN};
pub use dispatch::{Dispatcher, PooledDispatcher, SerialDispatcher, DEFAULT_WORKERS};
pub use distance::{l1_distance, DistanceMetric, MeanChannelL1};
pub use domain::{Bar, PriceSeries, Symbol, TradingDate};
pub use engine::{QueryEngine, QueryOutcome, QueryPhase, QueryRun, RankedQuery};
pub use error::{SimError, ValidationError};
pub use normalize::{normalize, NormalizedSeries};
pub use report::{CompletedQuery, FailedQuery, RunReport, RUNS_DIR};
pub use search::{
    nearest_in_instrument, rank_global, search_instrument, NeighborCandidate, NeighborResult,
    TopK, GLOBAL_TOP_K, PER_INSTRUMENT_K,
};
pub use segment::{segment, Segment, SegmentedSeries};
pub use snapshot::{SnapshotManager, SnapshotView, Universe, DEFAULT_STEPS};
pub use source::{
    load_universe, InMemoryPriceSource, JsonlPriceSource, PriceSource, WarehousePriceSource,
};
pub use writer::{list_dates, read_results, ResultWriter, StoredNeighbor};
