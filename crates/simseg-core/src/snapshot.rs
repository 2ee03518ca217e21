//! The in-memory segment universe and its as-of views.
//!
//! A [`SnapshotView`] never copies segments: it is a borrow of the universe
//! plus the number of trailing segments to hide from every instrument.

use std::collections::HashMap;

use crate::{Segment, SegmentedSeries, SimError, Symbol, TradingDate};

/// Number of as-of steps walked by a batch run.
pub const DEFAULT_STEPS: usize = 30;

/// Segmentations of every instrument, built once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    window_len: usize,
    instruments: Vec<SegmentedSeries>,
    index: HashMap<Symbol, usize>,
}

impl Universe {
    pub fn new(window_len: usize) -> Self {
        Self {
            window_len,
            instruments: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_segmented(
        window_len: usize,
        instruments: impl IntoIterator<Item = SegmentedSeries>,
    ) -> Result<Self, SimError> {
        let mut universe = Self::new(window_len);
        for instrument in instruments {
            universe.insert(instrument)?;
        }
        Ok(universe)
    }

    pub fn insert(&mut self, instrument: SegmentedSeries) -> Result<(), SimError> {
        if instrument.window_len() != self.window_len {
            return Err(SimError::DimensionMismatch {
                left: self.window_len,
                right: instrument.window_len(),
            });
        }
        if self.index.contains_key(instrument.symbol()) {
            return Err(SimError::invalid_input(format!(
                "instrument '{}' loaded twice",
                instrument.symbol()
            )));
        }

        self.index
            .insert(instrument.symbol().clone(), self.instruments.len());
        self.instruments.push(instrument);
        Ok(())
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.index.contains_key(symbol)
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&SegmentedSeries> {
        self.index.get(symbol).map(|&slot| &self.instruments[slot])
    }

    /// Instruments in load order.
    pub fn instruments(&self) -> &[SegmentedSeries] {
        &self.instruments
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.instruments.iter().map(SegmentedSeries::symbol)
    }

    /// View hiding the last `step` segments of every instrument.
    pub fn view(&self, step: usize) -> SnapshotView<'_> {
        SnapshotView {
            universe: self,
            step,
        }
    }
}

/// Read-only as-of view: every instrument minus its last `step` segments.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotView<'u> {
    universe: &'u Universe,
    step: usize,
}

impl<'u> SnapshotView<'u> {
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn universe(&self) -> &'u Universe {
        self.universe
    }

    /// Number of leading segments of `instrument` visible in this view.
    pub fn bound(&self, instrument: &SegmentedSeries) -> usize {
        instrument.count().saturating_sub(self.step)
    }

    pub fn segments(&self, symbol: &Symbol) -> Option<impl Iterator<Item = Segment<'u>> + 'u> {
        let step = self.step;
        self.universe
            .get(symbol)
            .map(move |instrument| instrument.iter_bounded(instrument.count().saturating_sub(step)))
    }

    /// The last segment still visible for `symbol`, the query anchor.
    pub fn last_segment(&self, symbol: &Symbol) -> Option<Segment<'u>> {
        let instrument = self.universe.get(symbol)?;
        let bound = self.bound(instrument);
        bound.checked_sub(1).and_then(|offset| instrument.get(offset))
    }

    /// As-of date of `symbol` in this view: the first date of its last
    /// visible segment, which is also the date key of its result file.
    pub fn as_of_date(&self, symbol: &Symbol) -> Option<TradingDate> {
        self.last_segment(symbol)
            .and_then(|segment| segment.first_date())
    }
}

/// Walks `steps` successive views, from the full history backwards.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotManager<'u> {
    universe: &'u Universe,
    steps: usize,
}

impl<'u> SnapshotManager<'u> {
    pub fn new(universe: &'u Universe, steps: usize) -> Self {
        Self { universe, steps }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn views(&self) -> impl Iterator<Item = SnapshotView<'u>> + 'u {
        let universe = self.universe;
        (0..self.steps).map(move |step| universe.view(step))
    }
}
