//! Sliding-window minimum/maximum over a [`SeriesBuffer`](super::SeriesBuffer)
//!
//! Two monotonic deques keyed by timestamp: `mins` holds increasing values,
//! `maxs` decreasing values. The front of each is the extremum of every point
//! not yet evicted. Push and evict are amortized O(1).

use std::collections::VecDeque;

use super::buffer::SeriesBuffer;

#[derive(Debug, Clone, Default)]
pub struct SlidingExtremum {
    mins: VecDeque<(f64, f64)>,
    maxs: VecDeque<(f64, f64)>,
}

impl SlidingExtremum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a point appended to the tail of the series
    pub fn push(&mut self, timestamp: f64, value: f64) {
        while self.mins.back().is_some_and(|&(_, v)| v >= value) {
            self.mins.pop_back();
        }
        self.mins.push_back((timestamp, value));

        while self.maxs.back().is_some_and(|&(_, v)| v <= value) {
            self.maxs.pop_back();
        }
        self.maxs.push_back((timestamp, value));
    }

    /// Forget every point older than `oldest_retained`
    pub fn evict_before(&mut self, oldest_retained: f64) {
        while self.mins.front().is_some_and(|&(t, _)| t < oldest_retained) {
            self.mins.pop_front();
        }
        while self.maxs.front().is_some_and(|&(t, _)| t < oldest_retained) {
            self.maxs.pop_front();
        }
    }

    /// `(min, max)` of the tracked points
    pub fn range(&self) -> Option<(f64, f64)> {
        let (_, min) = self.mins.front()?;
        let (_, max) = self.maxs.front()?;
        Some((*min, *max))
    }

    pub fn clear(&mut self) {
        self.mins.clear();
        self.maxs.clear();
    }

    /// Rebuild from the points at or after `oldest_retained` (after the tail
    /// value of the series was replaced)
    pub fn rebuild(&mut self, buffer: &SeriesBuffer, oldest_retained: f64) {
        self.clear();
        for p in buffer.iter().filter(|p| p.timestamp >= oldest_retained) {
            self.push(p.timestamp, p.value);
        }
    }
}
