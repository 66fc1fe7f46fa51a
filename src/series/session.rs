//! Window width and per-session state of a series store

use std::time::Instant;

use crate::error::{PidVisError, Result};

/// Width of the retained trailing history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSpec {
    span_secs: f64,
}

impl WindowSpec {
    /// Create a window; the span must be positive and finite
    pub fn new(span_secs: f64) -> Result<Self> {
        if span_secs.is_finite() && span_secs > 0.0 {
            Ok(Self { span_secs })
        } else {
            Err(PidVisError::InvalidSpan(span_secs))
        }
    }

    pub fn span_secs(&self) -> f64 {
        self.span_secs
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self { span_secs: 10.0 }
    }
}

/// State of one plotting session.
///
/// The range trackers only ever widen while running; they are reset by
/// [`start`](Self::start) and [`stop`](Self::stop) and nothing else.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    running: bool,
    /// Instant of the first ingest after start; `None` until then
    origin: Option<Instant>,
    elapsed: f64,
    min_value: f64,
    max_value: f64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start(&mut self) {
        self.min_value = 0.0;
        self.max_value = 0.0;
        self.running = true;
    }

    pub(crate) fn stop(&mut self) {
        self.running = false;
        self.origin = None;
        self.elapsed = 0.0;
        self.min_value = 0.0;
        self.max_value = 0.0;
    }

    /// Advance the session clock to `now` and return the elapsed seconds.
    ///
    /// The first call pins the origin. Elapsed time never decreases, even if
    /// `now` is earlier than a previous reading.
    pub(crate) fn advance(&mut self, now: Instant) -> f64 {
        match self.origin {
            None => {
                self.origin = Some(now);
                self.elapsed = 0.0;
            }
            Some(origin) => {
                let elapsed = now.saturating_duration_since(origin).as_secs_f64();
                self.elapsed = self.elapsed.max(elapsed);
            }
        }
        self.elapsed
    }

    /// Widen the cumulative range to include `[lo, hi]`
    pub(crate) fn widen(&mut self, lo: f64, hi: f64) {
        self.min_value = self.min_value.min(lo);
        self.max_value = self.max_value.max(hi);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the elapsed-time clock has been started
    pub fn has_origin(&self) -> bool {
        self.origin.is_some()
    }

    /// Seconds since the first ingest of the session
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_window_spec_validation() {
        assert!(WindowSpec::new(10.0).is_ok());
        assert!(matches!(WindowSpec::new(0.0), Err(PidVisError::InvalidSpan(_))));
        assert!(WindowSpec::new(-5.0).is_err());
        assert!(WindowSpec::new(f64::NAN).is_err());
        assert!(WindowSpec::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_clock_is_monotonic() {
        let base = Instant::now();
        let mut session = SessionState::new();
        session.start();

        assert_eq!(session.advance(base + Duration::from_secs(5)), 0.0);
        assert_eq!(session.advance(base + Duration::from_secs(7)), 2.0);
        // Earlier reading than the last one
        assert_eq!(session.advance(base + Duration::from_secs(6)), 2.0);
        // Earlier than the origin itself
        assert_eq!(session.advance(base), 2.0);
    }

    #[test]
    fn test_stop_clears_origin_and_trackers() {
        let mut session = SessionState::new();
        session.start();
        session.advance(Instant::now());
        session.widen(-3.0, 4.0);

        session.stop();
        assert!(!session.is_running());
        assert!(!session.has_origin());
        assert_eq!((session.min_value(), session.max_value()), (0.0, 0.0));
    }

    #[test]
    fn test_widen_never_tightens() {
        let mut session = SessionState::new();
        session.start();
        session.widen(-1.0, 1.0);
        session.widen(-0.5, 0.5);
        assert_eq!((session.min_value(), session.max_value()), (-1.0, 1.0));
    }
}
