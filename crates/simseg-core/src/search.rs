//! Nearest-neighbour selection for one query segment.
//!
//! Ranking lives here once; the execution strategy that fans it out over the
//! comparison universe is injected through [`crate::dispatch::Dispatcher`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{DistanceMetric, Segment, SegmentedSeries, SimError, Symbol, TradingDate};

/// Candidates kept per comparison instrument.
pub const PER_INSTRUMENT_K: usize = 3;
/// Results kept per query after the global merge.
pub const GLOBAL_TOP_K: usize = 10;

/// Bounded ascending list of the `k` lowest distances seen so far.
///
/// Insertion goes after any equal distance, so ties keep arrival order: fed in
/// offset order this resolves ties to the lower offset, exactly like a stable
/// sort followed by truncation.
#[derive(Debug, Clone)]
pub struct TopK<T> {
    k: usize,
    entries: Vec<(f64, T)>,
}

impl<T> TopK<T> {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            entries: Vec::with_capacity(k.min(64) + 1),
        }
    }

    pub fn push(&mut self, distance: f64, item: T) {
        if self.k == 0 {
            return;
        }

        if self.entries.len() == self.k {
            let worst = self.entries[self.k - 1].0;
            if distance.total_cmp(&worst) != Ordering::Less {
                return;
            }
        }

        let position = self
            .entries
            .partition_point(|(existing, _)| existing.total_cmp(&distance) != Ordering::Greater);
        self.entries.insert(position, (distance, item));
        self.entries.truncate(self.k);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_sorted_vec(self) -> Vec<(f64, T)> {
        self.entries
    }
}

/// A scored comparison segment, alive only during one search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborCandidate<'a> {
    pub segment: Segment<'a>,
    pub distance: f64,
}

/// A ranked neighbour with owned segment values, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborResult {
    pub symbol: Symbol,
    pub offset: usize,
    pub segment: Vec<[f64; 5]>,
    pub date: Vec<TradingDate>,
    pub l1_dist: f64,
    /// 1-based position in the list this result currently belongs to.
    pub rank: usize,
}

impl NeighborResult {
    pub fn from_candidate(candidate: &NeighborCandidate<'_>, rank: usize) -> Self {
        Self {
            symbol: candidate.segment.symbol().clone(),
            offset: candidate.segment.offset(),
            segment: candidate.segment.rows().to_vec(),
            date: candidate.segment.dates().to_vec(),
            l1_dist: candidate.distance,
            rank,
        }
    }
}

/// Score the query against the first `bound` segments of `comparison` and keep
/// the best `k`.
///
/// Fewer than `k` available segments yield `min(k, available)` candidates.
pub fn nearest_in_instrument<'u, M>(
    metric: &M,
    query: &Segment<'_>,
    comparison: &'u SegmentedSeries,
    bound: usize,
    k: usize,
) -> Result<Vec<NeighborCandidate<'u>>, SimError>
where
    M: DistanceMetric + ?Sized,
{
    let mut best = TopK::new(k);
    for segment in comparison.iter_bounded(bound) {
        let distance = metric.distance(query, &segment)?;
        best.push(distance, segment);
    }

    Ok(best
        .into_sorted_vec()
        .into_iter()
        .map(|(distance, segment)| NeighborCandidate { segment, distance })
        .collect())
}

/// [`nearest_in_instrument`] materialized into owned results.
pub fn search_instrument<M>(
    metric: &M,
    query: &Segment<'_>,
    comparison: &SegmentedSeries,
    bound: usize,
    k: usize,
) -> Result<Vec<NeighborResult>, SimError>
where
    M: DistanceMetric + ?Sized,
{
    Ok(nearest_in_instrument(metric, query, comparison, bound, k)?
        .iter()
        .enumerate()
        .map(|(index, candidate)| NeighborResult::from_candidate(candidate, index + 1))
        .collect())
}

/// Concatenate per-instrument lists in the given order and keep the global
/// `top_k` by ascending distance, re-ranking from 1.
pub fn rank_global(per_instrument: Vec<Vec<NeighborResult>>, top_k: usize) -> Vec<NeighborResult> {
    let mut best = TopK::new(top_k);
    for result in per_instrument.into_iter().flatten() {
        best.push(result.l1_dist, result);
    }

    best.into_sorted_vec()
        .into_iter()
        .enumerate()
        .map(|(index, (_, mut result))| {
            result.rank = index + 1;
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{normalize, segment, Bar, MeanChannelL1, PriceSeries};

    fn segmented(symbol: &str, closes: &[f64], window_len: usize) -> SegmentedSeries {
        let symbol = Symbol::parse(symbol).expect("symbol");
        let start = TradingDate::parse("2024-01-01").expect("date").into_inner();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(offset, close)| {
                let date = start + time::Duration::days(offset as i64);
                Bar::new(TradingDate::from_date(date), *close, *close, *close, *close, 1.0)
                    .expect("bar")
            })
            .collect();
        let series = PriceSeries::new(symbol, bars).expect("series");
        segment(normalize(&series).expect("normalize"), window_len).expect("segment")
    }

    #[test]
    fn top_k_keeps_arrival_order_on_ties() {
        let mut best = TopK::new(3);
        for (distance, label) in [(0.5, "a"), (0.1, "b"), (0.5, "c"), (0.1, "d"), (0.5, "e")] {
            best.push(distance, label);
        }
        let labels: Vec<&str> = best.into_sorted_vec().into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels, vec!["b", "d", "a"]);
    }

    #[test]
    fn top_k_matches_stable_sort_and_truncate() {
        let distances = [0.3, 0.1, 0.7, 0.1, 0.0, 0.3, 0.9, 0.0, 0.3];
        let mut best = TopK::new(4);
        for (index, distance) in distances.iter().enumerate() {
            best.push(*distance, index);
        }

        let mut expected: Vec<(f64, usize)> =
            distances.iter().copied().zip(0..distances.len()).collect();
        expected.sort_by(|a, b| a.0.total_cmp(&b.0));
        expected.truncate(4);

        assert_eq!(best.into_sorted_vec(), expected);
    }

    #[test]
    fn per_instrument_selection_is_ascending_with_lower_offset_on_ties() {
        let query_series = segmented("Q", &[1.0, 2.0], 2);
        let query = query_series.get(0).expect("query");
        // Offset 2 matches exactly; offsets 0, 1, 3 and 4 all tie at 0.5.
        let comparison = segmented("C", &[4.0, 4.0, 4.0, 8.0, 8.0, 8.0], 2);

        let found = nearest_in_instrument(&MeanChannelL1, &query, &comparison, usize::MAX, 3)
            .expect("search");
        assert_eq!(found.len(), 3);
        assert!(found.windows(2).all(|pair| pair[0].distance <= pair[1].distance));

        let offsets: Vec<usize> = found.iter().map(|c| c.segment.offset()).collect();
        assert_eq!(offsets, vec![2, 0, 1]);
        assert_eq!(found[0].distance, 0.0);
        assert_eq!(found[1].distance, 0.5);
    }

    #[test]
    fn fewer_segments_than_k_returns_what_is_available() {
        let query_series = segmented("Q", &[1.0, 2.0, 3.0], 3);
        let query = query_series.get(0).expect("query");
        let comparison = segmented("C", &[1.0, 2.0, 3.0, 4.0], 3);

        let found = search_instrument(&MeanChannelL1, &query, &comparison, usize::MAX, 3)
            .expect("search");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].rank, 1);
        assert_eq!(found[1].rank, 2);

        let empty = segmented("E", &[1.0, 2.0], 3);
        let none = search_instrument(&MeanChannelL1, &query, &empty, usize::MAX, 3)
            .expect("search");
        assert!(none.is_empty());
    }

    #[test]
    fn bound_hides_trailing_segments() {
        let query_series = segmented("Q", &[1.0, 2.0], 2);
        let query = query_series.get(0).expect("query");
        let comparison = segmented("C", &[1.0, 2.0, 3.0, 4.0, 5.0], 2);

        let found = search_instrument(&MeanChannelL1, &query, &comparison, 2, 3)
            .expect("search");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|result| result.offset < 2));
    }

    #[test]
    fn global_ranking_is_ascending_bounded_and_reranked() {
        let make = |symbol: &str, distances: &[f64]| -> Vec<NeighborResult> {
            distances
                .iter()
                .enumerate()
                .map(|(offset, distance)| NeighborResult {
                    symbol: Symbol::parse(symbol).expect("symbol"),
                    offset,
                    segment: vec![[0.0; 5]],
                    date: vec![TradingDate::parse("2024-01-01").expect("date")],
                    l1_dist: *distance,
                    rank: offset + 1,
                })
                .collect()
        };

        let lists = vec![
            make("A", &[0.2, 0.4, 0.6]),
            Vec::new(),
            make("B", &[0.1, 0.2, 0.9]),
            make("C", &[0.05, 0.3, 0.35]),
            make("D", &[0.01, 0.02, 0.5]),
        ];
        let union: Vec<(String, usize)> = lists
            .iter()
            .flatten()
            .map(|result| (result.symbol.to_string(), result.offset))
            .collect();

        let ranked = rank_global(lists, 10);
        assert_eq!(ranked.len(), 10);
        assert!(ranked.windows(2).all(|pair| pair[0].l1_dist <= pair[1].l1_dist));
        assert_eq!(ranked[0].symbol.as_str(), "D");
        assert!(ranked
            .iter()
            .all(|result| union.contains(&(result.symbol.to_string(), result.offset))));
        let ranks: Vec<usize> = ranked.iter().map(|result| result.rank).collect();
        assert_eq!(ranks, (1..=10).collect::<Vec<_>>());

        // Equal distances keep the earlier instrument first.
        let tie_a = ranked.iter().position(|r| r.symbol.as_str() == "A" && r.offset == 0);
        let tie_b = ranked.iter().position(|r| r.symbol.as_str() == "B" && r.offset == 1);
        assert!(tie_a.expect("A present") < tie_b.expect("B present"));
    }
}
