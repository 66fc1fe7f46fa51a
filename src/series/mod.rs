//! Time-windowed series store
//!
//! [`WindowedSeriesStore`] keeps one trailing, time-bounded buffer per
//! channel and derives the axis viewport a renderer should show.
//!
//! # Windowing
//!
//! Every ingest stamps the new values with the seconds elapsed since the first
//! ingest of the session, then trims each channel's head so that only the last
//! `span_secs` of history remain, plus one boundary point at or before the
//! window edge so the line still reaches it. Eviction is time-based rather
//! than count-based because samples arrive at whatever rate the device sends.
//!
//! # Y range
//!
//! By default ([`YRangeMode::Cumulative`]) the Y range is built from
//! session-lifetime min/max trackers seeded at zero: it widens as new extremes
//! arrive and never tightens while the session runs, even after those extremes
//! scroll out of view. [`YRangeMode::SlidingWindow`] instead uses the extremum of
//! the points still held, tracked with monotonic deques.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use pidvis_rs::series::{Channel, WindowSpec, WindowedSeriesStore};
//!
//! let mut store = WindowedSeriesStore::new(WindowSpec::new(10.0).unwrap());
//! store.add_channel(Channel::new("input"));
//! store.start();
//!
//! let mut values = HashMap::new();
//! values.insert("input", 1.5);
//! store.ingest(&values);
//!
//! let view = store.query_view();
//! assert_eq!((view.x.min, view.x.max), (0.0, 10.0));
//! ```

pub mod buffer;
pub mod channel;
pub mod extremum;
pub mod session;

pub use buffer::{PushOutcome, SeriesBuffer, SeriesPoint};
pub use channel::Channel;
pub use extremum::SlidingExtremum;
pub use session::{SessionState, WindowSpec};

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use crate::error::Result;

/// Default relative padding applied to the Y range
pub const DEFAULT_Y_MARGIN: f64 = 0.1;

/// How the Y axis range is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YRangeMode {
    /// Session-lifetime min/max, seeded at zero, never tightening
    #[default]
    Cumulative,
    /// Min/max of the points currently held by visible channels
    SlidingWindow,
}

impl std::fmt::Display for YRangeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            YRangeMode::Cumulative => write!(f, "Cumulative"),
            YRangeMode::SlidingWindow => write!(f, "Sliding window"),
        }
    }
}

/// Closed interval on one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// What the renderer should show
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: AxisRange,
    pub y: AxisRange,
}

#[derive(Debug, Clone)]
struct ChannelSeries {
    channel: Channel,
    buffer: SeriesBuffer,
    extremum: SlidingExtremum,
}

impl ChannelSeries {
    fn new(channel: Channel) -> Self {
        Self {
            channel,
            buffer: SeriesBuffer::new(),
            extremum: SlidingExtremum::new(),
        }
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.extremum.clear();
    }
}

/// Per-channel trailing buffers plus the live viewport.
///
/// Driven from a single consumer context; not meant for concurrent callers.
#[derive(Debug, Clone)]
pub struct WindowedSeriesStore {
    window: WindowSpec,
    range_mode: YRangeMode,
    y_margin: f64,
    /// Registration order is preserved for the renderer
    channels: Vec<ChannelSeries>,
    session: SessionState,
}

impl Default for WindowedSeriesStore {
    fn default() -> Self {
        Self::new(WindowSpec::default())
    }
}

impl WindowedSeriesStore {
    /// Create a stopped store with no channels
    pub fn new(window: WindowSpec) -> Self {
        Self {
            window,
            range_mode: YRangeMode::default(),
            y_margin: DEFAULT_Y_MARGIN,
            channels: Vec::new(),
            session: SessionState::new(),
        }
    }

    /// Select how the Y range is derived
    pub fn with_range_mode(mut self, mode: YRangeMode) -> Self {
        self.range_mode = mode;
        self
    }

    /// Relative padding applied to both ends of the Y range
    pub fn with_y_margin(mut self, margin: f64) -> Self {
        self.y_margin = margin.max(0.0);
        self
    }

    // ==================== Session control ====================

    /// Reset the range trackers and accept ingests
    pub fn start(&mut self) {
        self.session.start();
        tracing::info!("Plotting started ({} s window)", self.window.span_secs());
    }

    /// Stop accepting ingests and drop every buffered point
    pub fn stop(&mut self) {
        self.session.stop();
        for series in &mut self.channels {
            series.clear();
        }
        tracing::info!("Plotting stopped");
    }

    /// Equivalent to [`stop`](Self::stop) followed by [`start`](Self::start)
    pub fn reset(&mut self) {
        self.stop();
        self.start();
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// Seconds since the first ingest of the session
    pub fn elapsed(&self) -> f64 {
        self.session.elapsed()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    // ==================== Configuration ====================

    pub fn span_secs(&self) -> f64 {
        self.window.span_secs()
    }

    /// Change the window width; applies from the next ingest
    pub fn set_span(&mut self, span_secs: f64) -> Result<()> {
        self.window = WindowSpec::new(span_secs)?;
        Ok(())
    }

    pub fn range_mode(&self) -> YRangeMode {
        self.range_mode
    }

    pub fn set_range_mode(&mut self, mode: YRangeMode) {
        self.range_mode = mode;
    }

    // ==================== Channels ====================

    /// Register a channel. Returns `false` if the name is already taken.
    pub fn add_channel(&mut self, channel: Channel) -> bool {
        if self.channel(&channel.name).is_some() {
            tracing::warn!("Channel '{}' already registered", channel.name);
            return false;
        }
        tracing::debug!("Registered channel '{}'", channel.name);
        self.channels.push(ChannelSeries::new(channel));
        true
    }

    /// Unregister a channel and drop its points
    pub fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        let index = self.channels.iter().position(|s| s.channel.name == name)?;
        Some(self.channels.remove(index).channel)
    }

    /// Show or hide a channel. Returns `false` if it does not exist.
    pub fn set_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.series_mut(name) {
            Some(series) => {
                series.channel.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|s| s.channel.name == name)
            .map(|s| &s.channel)
    }

    /// Registered channels in registration order
    pub fn channels(&self) -> impl Iterator<Item = &Channel> + '_ {
        self.channels.iter().map(|s| &s.channel)
    }

    /// Points of one channel
    pub fn series(&self, name: &str) -> Option<&SeriesBuffer> {
        self.channels
            .iter()
            .find(|s| s.channel.name == name)
            .map(|s| &s.buffer)
    }

    /// Every channel with its points, in registration order
    pub fn iter_series(&self) -> impl Iterator<Item = (&Channel, &SeriesBuffer)> + '_ {
        self.channels.iter().map(|s| (&s.channel, &s.buffer))
    }

    /// Total number of buffered points across channels
    pub fn total_points(&self) -> usize {
        self.channels.iter().map(|s| s.buffer.len()).sum()
    }

    fn series_mut(&mut self, name: &str) -> Option<&mut ChannelSeries> {
        self.channels.iter_mut().find(|s| s.channel.name == name)
    }

    // ==================== Data ====================

    /// Ingest a batch of named values stamped with the current time
    pub fn ingest<K>(&mut self, values: &HashMap<K, f64>)
    where
        K: Borrow<str> + Eq + Hash,
    {
        self.ingest_at(values, Instant::now());
    }

    /// Ingest a batch of named values stamped with the time of `now`.
    ///
    /// Does nothing unless the store is running. Values whose name matches no
    /// registered channel are ignored.
    pub fn ingest_at<K>(&mut self, values: &HashMap<K, f64>, now: Instant)
    where
        K: Borrow<str> + Eq + Hash,
    {
        if !self.session.is_running() {
            return;
        }

        let elapsed = self.session.advance(now);
        let threshold = elapsed - self.window.span_secs();
        let mut visible_range: Option<(f64, f64)> = None;

        for series in &mut self.channels {
            series.buffer.evict_before(threshold);
            // The kept boundary point lies left of the view and must not set the Y range
            series.extremum.evict_before(threshold);

            let Some(&value) = values.get(series.channel.name.as_str()) else {
                continue;
            };

            match series.buffer.push(elapsed, value) {
                PushOutcome::Appended => series.extremum.push(elapsed, value),
                PushOutcome::Replaced => series.extremum.rebuild(&series.buffer, threshold),
                PushOutcome::Rejected => continue,
            }

            if series.channel.visible {
                visible_range = Some(match visible_range {
                    Some((lo, hi)) => (lo.min(value), hi.max(value)),
                    None => (value, value),
                });
            }
        }

        if let Some((lo, hi)) = visible_range {
            self.session.widen(lo, hi);
        }
    }

    /// Current X and Y ranges
    pub fn query_view(&self) -> Viewport {
        let span = self.window.span_secs();
        let elapsed = self.session.elapsed();

        let x = if elapsed > span {
            AxisRange::new(elapsed - span, elapsed)
        } else {
            AxisRange::new(0.0, span)
        };

        let (lo, hi) = match self.range_mode {
            YRangeMode::Cumulative => (self.session.min_value(), self.session.max_value()),
            YRangeMode::SlidingWindow => self.window_extremum().unwrap_or((0.0, 0.0)),
        };

        Viewport {
            x,
            y: AxisRange::new(lo - lo.abs() * self.y_margin, hi + hi.abs() * self.y_margin),
        }
    }

    fn window_extremum(&self) -> Option<(f64, f64)> {
        self.channels
            .iter()
            .filter(|s| s.channel.visible)
            .filter_map(|s| s.extremum.range())
            .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
    }
}
