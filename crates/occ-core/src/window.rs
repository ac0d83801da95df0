//! Window clipping and aggregation.
//!
//! The reducer consumes the per-track interval lists from the builder,
//! clips every interval to a bounded analysis window, and folds the
//! survivors into coverage statistics. Clipping always produces new
//! interval values; the input lists are never mutated, so the same lists
//! can feed several overlapping window analyses.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::AnalysisError;
use crate::event::PresenceSignal;
use crate::intervals::{BuilderConfig, ChannelIntervals, Interval, Track, build_intervals};

/// A bounded observation window `[start, end)`.
///
/// Construction enforces `start < end`, so a window in hand is always
/// valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl AnalysisWindow {
    /// Creates a window, rejecting `start >= end` before any processing.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AnalysisError> {
        if start >= end {
            return Err(AnalysisError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Window length in milliseconds. Always positive.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// Aggregate presence statistics for one track within a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackStats {
    /// Total presence duration inside the window, in milliseconds.
    pub present_ms: i64,
    /// Share of the window covered, 0.0 to 100.0.
    pub present_percent: f64,
    /// Start of the earliest surviving interval, `None` if no presence
    /// overlapped the window.
    pub earliest_present: Option<DateTime<Utc>>,
}

/// Statistics for all three tracks over one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowReport {
    pub window: AnalysisWindow,
    /// Window length in milliseconds.
    pub duration_ms: i64,
    pub publisher: TrackStats,
    pub subscriber: TrackStats,
    pub both: TrackStats,
}

/// Clips an interval to the window, returning the overlapping portion.
///
/// Intervals fully outside the window are discarded; straddling intervals
/// are clamped to the window bounds.
fn clip(interval: Interval, window: &AnalysisWindow) -> Option<Interval> {
    if interval.start >= window.end || interval.end <= window.start {
        return None;
    }
    Some(Interval {
        start: interval.start.max(window.start),
        end: interval.end.min(window.end),
    })
}

/// Reduces one track's interval list to aggregate statistics.
///
/// Intervals must be in chronological order (as produced by the builder);
/// the earliest-present instant is taken from the first survivor.
#[must_use]
pub fn reduce_track(intervals: &[Interval], window: &AnalysisWindow) -> TrackStats {
    let mut present_ms = 0_i64;
    let mut earliest_present = None;

    for clipped in intervals.iter().filter_map(|iv| clip(*iv, window)) {
        present_ms += clipped.duration_ms();
        if earliest_present.is_none() {
            earliest_present = Some(clipped.start);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let present_percent = present_ms as f64 / window.duration_ms() as f64 * 100.0;

    TrackStats {
        present_ms,
        present_percent,
        earliest_present,
    }
}

/// Reduces all three tracks against one window.
#[must_use]
pub fn analyze(intervals: &ChannelIntervals, window: &AnalysisWindow) -> WindowReport {
    WindowReport {
        window: *window,
        duration_ms: window.duration_ms(),
        publisher: reduce_track(intervals.track(Track::Publisher), window),
        subscriber: reduce_track(intervals.track(Track::Subscriber), window),
        both: reduce_track(intervals.track(Track::Both), window),
    }
}

/// Builds intervals once and reduces each window independently.
///
/// Windows share only the read-only interval lists, so the reductions run
/// in parallel. Reports come back in the same order as `windows`.
pub fn analyze_windows<E: PresenceSignal>(
    events: &[E],
    windows: &[AnalysisWindow],
    config: &BuilderConfig,
) -> Vec<WindowReport> {
    let intervals = build_intervals(events, config);
    windows
        .par_iter()
        .map(|window| analyze(&intervals, window))
        .collect()
}
