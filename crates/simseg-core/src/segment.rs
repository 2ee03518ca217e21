//! Sliding-window segmentation of normalized series.
//!
//! Segments are borrowed windows over the owning [`SegmentedSeries`]; building
//! the segmentation of an instrument allocates nothing per window.

use crate::{NormalizedSeries, SimError, Symbol, TradingDate};

/// `L` consecutive normalized rows of one instrument and their dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<'a> {
    symbol: &'a Symbol,
    offset: usize,
    dates: &'a [TradingDate],
    rows: &'a [[f64; 5]],
}

impl<'a> Segment<'a> {
    /// Build a segment over caller-owned rows.
    pub fn new(
        symbol: &'a Symbol,
        offset: usize,
        dates: &'a [TradingDate],
        rows: &'a [[f64; 5]],
    ) -> Result<Self, SimError> {
        if dates.len() != rows.len() {
            return Err(SimError::DimensionMismatch {
                left: dates.len(),
                right: rows.len(),
            });
        }

        Ok(Self {
            symbol,
            offset,
            dates,
            rows,
        })
    }

    pub fn symbol(&self) -> &'a Symbol {
        self.symbol
    }

    /// Start offset inside the instrument's segmentation.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn dates(&self) -> &'a [TradingDate] {
        self.dates
    }

    pub fn rows(&self) -> &'a [[f64; 5]] {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<TradingDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<TradingDate> {
        self.dates.last().copied()
    }
}

/// All overlapping windows of length `window_len` over one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedSeries {
    series: NormalizedSeries,
    window_len: usize,
}

impl SegmentedSeries {
    pub fn symbol(&self) -> &Symbol {
        self.series.symbol()
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn series(&self) -> &NormalizedSeries {
        &self.series
    }

    /// Number of segments, `max(0, len - L + 1)`.
    pub fn count(&self) -> usize {
        (self.series.len() + 1).saturating_sub(self.window_len)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn get(&self, offset: usize) -> Option<Segment<'_>> {
        if offset >= self.count() {
            return None;
        }

        let end = offset + self.window_len;
        Some(Segment {
            symbol: self.series.symbol(),
            offset,
            dates: &self.series.dates()[offset..end],
            rows: &self.series.rows()[offset..end],
        })
    }

    /// Segments in offset order.
    pub fn iter(&self) -> impl Iterator<Item = Segment<'_>> + '_ {
        self.iter_bounded(self.count())
    }

    /// The first `bound` segments in offset order.
    pub fn iter_bounded(&self, bound: usize) -> impl Iterator<Item = Segment<'_>> + '_ {
        (0..bound.min(self.count())).filter_map(move |offset| self.get(offset))
    }
}

/// Slice `series` into every window of `window_len` rows.
///
/// A series shorter than the window yields an empty segmentation.
pub fn segment(series: NormalizedSeries, window_len: usize) -> Result<SegmentedSeries, SimError> {
    if window_len == 0 {
        return Err(SimError::invalid_input("window length must be at least 1"));
    }

    Ok(SegmentedSeries { series, window_len })
}
