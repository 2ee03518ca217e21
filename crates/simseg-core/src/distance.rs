//! Similarity scores between equal-length segments.

use crate::normalize::{CLOSE, HIGH, LOW, OPEN};
use crate::{Segment, SimError};

const PRICE_CHANNELS: [usize; 4] = [OPEN, HIGH, LOW, CLOSE];

/// Scores how far apart two segments are; lower is more similar.
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, left: &Segment<'_>, right: &Segment<'_>) -> Result<f64, SimError>;
}

/// Mean over open/high/low/close of the per-channel Manhattan distance.
///
/// Volume is present in the rows but never scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeanChannelL1;

impl DistanceMetric for MeanChannelL1 {
    fn distance(&self, left: &Segment<'_>, right: &Segment<'_>) -> Result<f64, SimError> {
        l1_distance(left, right)
    }
}

/// Free-function form of [`MeanChannelL1`].
pub fn l1_distance(left: &Segment<'_>, right: &Segment<'_>) -> Result<f64, SimError> {
    if left.len() != right.len() {
        return Err(SimError::DimensionMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    let total: f64 = PRICE_CHANNELS
        .iter()
        .map(|&channel| {
            left.rows()
                .iter()
                .zip(right.rows())
                .map(|(a, b)| (a[channel] - b[channel]).abs())
                .sum::<f64>()
        })
        .sum();

    Ok(total / PRICE_CHANNELS.len() as f64)
}
