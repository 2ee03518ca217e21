//! # Simseg Warehouse
//!
//! DuckDB storage for daily OHLCV bars.
//!
//! ## Overview
//!
//! The similar-segment search reads whole price histories per instrument.
//! This crate keeps them in a single `bars_1d` table so repeated runs do not
//! have to re-parse source files.
//!
//! - **Parameterized SQL**: symbols and dates are always bound, never interpolated
//! - **Connection pooling**: cloned connections over one database instance
//! - **Migrations**: versioned schema tracked in `schema_migrations`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use simseg_warehouse::{BarRecord, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     warehouse.ingest_daily_bars(
//!         "jsonl",
//!         &[BarRecord {
//!             symbol: "005930".to_string(),
//!             date: "2022-05-16".to_string(),
//!             open: 66_500.0,
//!             high: 67_000.0,
//!             low: 66_200.0,
//!             close: 66_500.0,
//!             volume: Some(10_000_000),
//!         }],
//!     )?;
//!
//!     let bars = warehouse.daily_bars("005930", "2022-01-01", "2022-12-31")?;
//!     println!("{} bars", bars.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `bars_1d` | Daily bars keyed by `(symbol, date)` |
//! | `schema_migrations` | Applied schema versions |

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::duckdb::ConnectionPool;

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Input refused before reaching the database.
    #[error("query rejected: {0}")]
    QueryRejected(String),
}

/// Location and pool settings for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for simseg data.
    pub simseg_home: PathBuf,
    pub db_path: PathBuf,
    /// Idle connections kept for reuse.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::in_home(resolve_simseg_home())
    }
}

impl WarehouseConfig {
    /// Config rooted at `simseg_home`, with the database at `warehouse.duckdb`.
    pub fn in_home(simseg_home: impl Into<PathBuf>) -> Self {
        let simseg_home = simseg_home.into();
        let db_path = simseg_home.join("warehouse.duckdb");
        Self {
            simseg_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// One daily bar as stored in `bars_1d`. `date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub symbol: String,
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
}

#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    pool: ConnectionPool,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, pool };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending schema migrations.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        self.pool.with_connection(|connection| {
            migrations::apply_migrations(connection)?;
            Ok(())
        })
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Insert or replace daily bars in one transaction. Returns the number of
    /// rows written. Symbols are stored trimmed and upper-cased.
    pub fn ingest_daily_bars(
        &self,
        source: &str,
        rows: &[BarRecord],
    ) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }
        if let Some(row) = rows.iter().find(|row| row.symbol.trim().is_empty()) {
            return Err(WarehouseError::QueryRejected(format!(
                "bar dated '{}' has an empty symbol",
                row.date
            )));
        }

        self.pool.with_connection(|connection| {
            connection.execute_batch("BEGIN TRANSACTION")?;
            let result = (|| -> Result<usize, WarehouseError> {
                let mut statement = connection.prepare(
                    "INSERT OR REPLACE INTO bars_1d \
                     (symbol, date, open, high, low, close, volume, source, updated_at) \
                     VALUES (?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
                )?;
                for row in rows {
                    let symbol = normalize_symbol(&row.symbol);
                    let params: [&dyn ToSql; 8] = [
                        &symbol,
                        &row.date,
                        &row.open,
                        &row.high,
                        &row.low,
                        &row.close,
                        &row.volume,
                        &source,
                    ];
                    statement.execute(params.as_slice())?;
                }
                Ok(rows.len())
            })();

            finalize_transaction(connection, result)
        })
    }

    /// Bars of `symbol` with `start <= date <= end`, oldest first.
    pub fn daily_bars(
        &self,
        symbol: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<BarRecord>, WarehouseError> {
        let symbol = normalize_symbol(symbol);
        let symbol = symbol.as_str();
        self.pool.with_connection(|connection| {
            let mut statement = connection.prepare(
                "SELECT CAST(date AS VARCHAR), open, high, low, close, volume \
                 FROM bars_1d \
                 WHERE symbol = ? AND date BETWEEN CAST(? AS DATE) AND CAST(? AS DATE) \
                 ORDER BY date",
            )?;
            let params: [&dyn ToSql; 3] = [&symbol, &start, &end];
            let rows = statement.query_map(params.as_slice(), |row| {
                Ok(BarRecord {
                    symbol: symbol.to_string(),
                    date: row.get(0)?,
                    open: row.get(1)?,
                    high: row.get(2)?,
                    low: row.get(3)?,
                    close: row.get(4)?,
                    volume: row.get(5)?,
                })
            })?;
            let bars = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(bars)
        })
    }

    /// Distinct symbols with at least one bar, sorted.
    pub fn daily_symbols(&self) -> Result<Vec<String>, WarehouseError> {
        self.pool.with_connection(|connection| {
            let mut statement =
                connection.prepare("SELECT DISTINCT symbol FROM bars_1d ORDER BY symbol")?;
            let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
            let symbols = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(symbols)
        })
    }

    pub fn daily_bar_count(&self) -> Result<u64, WarehouseError> {
        self.pool.with_connection(|connection| {
            let count: i64 =
                connection.query_row("SELECT COUNT(*) FROM bars_1d", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
    }
}

/// Stored form of a symbol: trimmed, ASCII upper-case.
fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Commit on success, roll back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// `SIMSEG_HOME` when set and non-empty, else `$HOME/.simseg`.
fn resolve_simseg_home() -> PathBuf {
    if let Some(path) = env::var_os("SIMSEG_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".simseg");
    }

    PathBuf::from(".simseg")
}
