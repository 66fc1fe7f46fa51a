//! Per-channel trailing point buffer

use std::collections::VecDeque;

/// A single plotted point: elapsed seconds and value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: f64,
    pub value: f64,
}

/// Ordered `(timestamp, value)` pairs of one channel.
///
/// Timestamps strictly increase. Points are appended at the tail and trimmed
/// at the head.
#[derive(Debug, Clone, Default)]
pub struct SeriesBuffer {
    points: VecDeque<SeriesPoint>,
}

/// Outcome of [`SeriesBuffer::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// A new point was added at the tail
    Appended,
    /// The timestamp matched the tail; its value was overwritten
    Replaced,
    /// The timestamp was older than the tail and was ignored
    Rejected,
}

impl SeriesBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point at the tail.
    ///
    /// A point with the same timestamp as the tail replaces the tail's value.
    pub fn push(&mut self, timestamp: f64, value: f64) -> PushOutcome {
        match self.points.back_mut() {
            Some(last) if timestamp < last.timestamp => PushOutcome::Rejected,
            Some(last) if timestamp == last.timestamp => {
                last.value = value;
                PushOutcome::Replaced
            }
            _ => {
                self.points.push_back(SeriesPoint { timestamp, value });
                PushOutcome::Appended
            }
        }
    }

    /// Drop head points older than `threshold`, keeping the last point
    /// strictly before it so the line still reaches the window edge.
    ///
    /// Returns the number of points removed.
    pub fn evict_before(&mut self, threshold: f64) -> usize {
        let mut count = 0;
        while count + 1 < self.points.len() && self.points[count + 1].timestamp < threshold {
            count += 1;
        }
        self.points.drain(..count);
        count
    }

    /// Remove every point
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Oldest retained point
    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.front()
    }

    /// Newest point
    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.back()
    }

    /// Iterate points from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> + '_ {
        self.points.iter()
    }

    /// Points as `[time, value]` pairs for the renderer
    pub fn as_plot_points(&self) -> Vec<[f64; 2]> {
        self.points
            .iter()
            .map(|p| [p.timestamp, p.value])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(timestamps: &[f64]) -> SeriesBuffer {
        let mut buffer = SeriesBuffer::new();
        for &t in timestamps {
            buffer.push(t, t * 10.0);
        }
        buffer
    }

    #[test]
    fn test_push_keeps_timestamps_increasing() {
        let mut buffer = SeriesBuffer::new();
        assert_eq!(buffer.push(1.0, 1.0), PushOutcome::Appended);
        assert_eq!(buffer.push(1.0, 2.0), PushOutcome::Replaced);
        assert_eq!(buffer.push(0.5, 3.0), PushOutcome::Rejected);
        assert_eq!(buffer.push(2.0, 4.0), PushOutcome::Appended);

        assert_eq!(buffer.as_plot_points(), vec![[1.0, 2.0], [2.0, 4.0]]);
    }

    #[test]
    fn test_evict_keeps_boundary_point() {
        let mut buffer = filled(&[0.0, 1.0, 2.0, 3.0, 4.0]);

        assert_eq!(buffer.evict_before(2.5), 2);
        assert_eq!(buffer.first().unwrap().timestamp, 2.0);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_evict_point_exactly_on_threshold() {
        let mut buffer = filled(&[0.0, 1.0, 2.0, 3.0]);

        buffer.evict_before(2.0);
        // 1.0 is the last point strictly before 2.0 and must stay
        assert_eq!(buffer.first().unwrap().timestamp, 1.0);
    }

    #[test]
    fn test_evict_never_empties_buffer() {
        let mut buffer = filled(&[0.0, 1.0, 2.0]);

        buffer.evict_before(100.0);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.last().unwrap().timestamp, 2.0);

        let mut empty = SeriesBuffer::new();
        assert_eq!(empty.evict_before(1.0), 0);
    }
}
