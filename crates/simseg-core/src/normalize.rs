//! Max-close rescaling of raw price series.

use crate::{PriceSeries, SimError, Symbol, TradingDate};

/// Channel index of each column inside a normalized row.
pub const OPEN: usize = 0;
pub const HIGH: usize = 1;
pub const LOW: usize = 2;
pub const CLOSE: usize = 3;
pub const VOLUME: usize = 4;

/// Price series divided by its maximum close; volume is carried through.
///
/// Dates and rows are stored column-wise so segments can borrow both as
/// slices without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    symbol: Symbol,
    scale: f64,
    dates: Vec<TradingDate>,
    rows: Vec<[f64; 5]>,
}

impl NormalizedSeries {
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// The maximum raw close the prices were divided by.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn dates(&self) -> &[TradingDate] {
        &self.dates
    }

    /// Rows in `[open, high, low, close, volume]` order.
    pub fn rows(&self) -> &[[f64; 5]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rescale open/high/low/close by the series' maximum close.
pub fn normalize(series: &PriceSeries) -> Result<NormalizedSeries, SimError> {
    let scale = series
        .bars()
        .iter()
        .map(|bar| bar.close)
        .fold(None, |max: Option<f64>, close| {
            Some(max.map_or(close, |max| max.max(close)))
        })
        .ok_or_else(|| SimError::invalid_input(format!("series '{}' is empty", series.symbol)))?;

    if scale <= 0.0 || !scale.is_finite() {
        return Err(SimError::invalid_input(format!(
            "series '{}' has non-positive max close {scale}",
            series.symbol
        )));
    }

    let mut dates = Vec::with_capacity(series.len());
    let mut rows = Vec::with_capacity(series.len());
    for bar in series.bars() {
        dates.push(bar.date);
        rows.push([
            bar.open / scale,
            bar.high / scale,
            bar.low / scale,
            bar.close / scale,
            bar.volume,
        ]);
    }

    Ok(NormalizedSeries {
        symbol: series.symbol.clone(),
        scale,
        dates,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn series(closes: &[f64]) -> PriceSeries {
        let symbol = Symbol::parse("TEST").expect("symbol");
        let start = TradingDate::parse("2024-01-01").expect("date").into_inner();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(offset, close)| {
                let date = start + time::Duration::days(offset as i64);
                Bar::new(
                    TradingDate::from_date(date),
                    close * 0.9,
                    close * 1.2,
                    close * 0.8,
                    *close,
                    1_000.0 + offset as f64,
                )
                .expect("bar")
            })
            .collect();
        PriceSeries::new(symbol, bars).expect("series")
    }

    #[test]
    fn max_close_normalizes_to_exactly_one() {
        let normalized = normalize(&series(&[3.7, 11.3, 7.1, 9.9])).expect("normalize");
        let max_close = normalized
            .rows()
            .iter()
            .map(|row| row[CLOSE])
            .fold(f64::MIN, f64::max);
        assert_eq!(max_close, 1.0);
        assert_eq!(normalized.scale(), 11.3);
    }

    #[test]
    fn other_channels_may_exceed_one_and_volume_is_untouched() {
        let normalized = normalize(&series(&[10.0, 20.0])).expect("normalize");
        let last = normalized.rows()[1];
        assert!(last[HIGH] > 1.0);
        assert_eq!(last[VOLUME], 1_001.0);
        assert_eq!(last[OPEN], 20.0 * 0.9 / 20.0);
    }

    #[test]
    fn rejects_empty_series() {
        let err = normalize(&series(&[])).expect_err("must fail");
        assert!(matches!(err, SimError::InvalidInput(_)));
    }

    #[test]
    fn rejects_zero_scale() {
        let err = normalize(&series(&[0.0, 0.0])).expect_err("must fail");
        assert!(matches!(err, SimError::InvalidInput(_)));
    }
}
