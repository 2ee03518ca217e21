use serde::{Deserialize, Serialize};

use crate::{Symbol, TradingDate, ValidationError};

/// Daily OHLCV row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: TradingDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        date: TradingDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;
        validate_non_negative("volume", volume)?;

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Row in `[open, high, low, close, volume]` order.
    pub const fn ohlcv(&self) -> [f64; 5] {
        [self.open, self.high, self.low, self.close, self.volume]
    }
}

/// Full price history of one instrument, ordered by strictly increasing date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: Symbol,
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(symbol: Symbol, bars: Vec<Bar>) -> Result<Self, ValidationError> {
        for pair in bars.windows(2) {
            if pair[0].date >= pair[1].date {
                return Err(ValidationError::UnorderedDates {
                    previous: pair[0].date.to_string(),
                    next: pair[1].date.to_string(),
                });
            }
        }

        Ok(Self { symbol, bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Rows with `start <= date <= end`.
    pub fn between(&self, start: TradingDate, end: TradingDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            bars: self
                .bars
                .iter()
                .filter(|bar| bar.date >= start && bar.date <= end)
                .copied()
                .collect(),
        }
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> TradingDate {
        TradingDate::parse(value).expect("date")
    }

    fn bar(day: &str, close: f64) -> Bar {
        Bar::new(date(day), close, close, close, close, 100.0).expect("bar")
    }

    #[test]
    fn rejects_non_finite_prices() {
        let err = Bar::new(date("2024-01-02"), f64::NAN, 1.0, 1.0, 1.0, 1.0)
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::NonFiniteValue { field: "open" }));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let symbol = Symbol::parse("A").expect("symbol");
        let err = PriceSeries::new(symbol, vec![bar("2024-01-02", 1.0), bar("2024-01-02", 2.0)])
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::UnorderedDates { .. }));
    }

    #[test]
    fn filters_inclusive_date_range() {
        let symbol = Symbol::parse("A").expect("symbol");
        let series = PriceSeries::new(
            symbol,
            vec![
                bar("2024-01-02", 1.0),
                bar("2024-01-03", 2.0),
                bar("2024-01-04", 3.0),
            ],
        )
        .expect("series");

        let window = series.between(date("2024-01-03"), date("2024-01-04"));
        assert_eq!(window.len(), 2);
        assert_eq!(window.bars()[0].close, 2.0);
    }
}
