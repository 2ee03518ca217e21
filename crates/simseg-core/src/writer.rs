//! JSONL persistence of ranked neighbours.
//!
//! Layout: `<root>/<as_of>/<symbol>_<as_of>_<window_len>.jsonl`, one
//! neighbour per line, ascending by `l1_dist`.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{NeighborResult, SimError, Symbol, TradingDate};

/// One line of a result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNeighbor {
    pub segment: Vec<[f64; 5]>,
    pub date: Vec<TradingDate>,
    pub symbol: Symbol,
    pub l1_dist: f64,
}

impl From<&NeighborResult> for StoredNeighbor {
    fn from(result: &NeighborResult) -> Self {
        Self {
            segment: result.segment.clone(),
            date: result.date.clone(),
            symbol: result.symbol.clone(),
            l1_dist: result.l1_dist,
        }
    }
}

/// Writes per-query result files under a date-keyed directory tree.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    root: PathBuf,
}

impl ResultWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, symbol: &Symbol, as_of: TradingDate, window_len: usize) -> PathBuf {
        self.root
            .join(as_of.to_string())
            .join(format!("{symbol}_{as_of}_{window_len}.jsonl"))
    }

    /// Write `results` in order, replacing any existing file at the same path.
    pub fn write(
        &self,
        symbol: &Symbol,
        as_of: TradingDate,
        window_len: usize,
        results: &[NeighborResult],
    ) -> Result<PathBuf, SimError> {
        let path = self.path_for(symbol, as_of, window_len);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        for result in results {
            serde_json::to_writer(&mut writer, &StoredNeighbor::from(result))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        Ok(path)
    }
}

/// Parse a result file back into its neighbours, skipping blank lines.
pub fn read_results(path: &Path) -> Result<Vec<StoredNeighbor>, SimError> {
    let reader = BufReader::new(File::open(path)?);
    let mut neighbors = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        neighbors.push(serde_json::from_str(&line)?);
    }
    Ok(neighbors)
}

/// As-of dates that have a result directory under `root`, ascending.
///
/// A missing root yields an empty list; entries that are not date-named
/// directories are ignored.
pub fn list_dates(root: &Path) -> Result<Vec<TradingDate>, SimError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut dates = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(date) = entry
            .file_name()
            .to_str()
            .and_then(|name| TradingDate::parse(name).ok())
        {
            dates.push(date);
        }
    }
    dates.sort();
    Ok(dates)
}
