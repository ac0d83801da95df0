//! Interval construction from an ordered presence-event stream.
//!
//! Three independent boolean state machines — publisher, subscriber, and
//! their conjunction — are driven off the same event stream in a single
//! O(n) pass. Each false→true transition opens an interval at the event's
//! timestamp; each true→false transition closes it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::{PresenceAction, PresenceSignal, Role};

/// A presence track being measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Publisher,
    Subscriber,
    /// Publisher and subscriber simultaneously present.
    Both,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Publisher => "publisher",
            Self::Subscriber => "subscriber",
            Self::Both => "both",
        };
        write!(f, "{s}")
    }
}

/// A contiguous span during which a track was continuously present.
///
/// Intervals in builder output are always closed, with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Length of the interval in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// Configuration for interval construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Where to close intervals still open when the event sequence ends.
    ///
    /// `None` (default) drops them: presence that never explicitly ends
    /// within the observed data is not counted as a completed interval.
    pub close_open_at: Option<DateTime<Utc>>,
}

/// The per-track interval lists produced by [`build_intervals`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelIntervals {
    pub publisher: Vec<Interval>,
    pub subscriber: Vec<Interval>,
    pub both: Vec<Interval>,
}

impl ChannelIntervals {
    /// Returns the interval list for a track.
    #[must_use]
    pub fn track(&self, track: Track) -> &[Interval] {
        match track {
            Track::Publisher => &self.publisher,
            Track::Subscriber => &self.subscriber,
            Track::Both => &self.both,
        }
    }
}

/// One boolean presence state machine plus its open-interval slot.
///
/// The slot is a single nullable reference, not a stack: only one open
/// interval per track can exist at a time by construction.
#[derive(Debug, Default)]
struct TrackState {
    present: bool,
    open_since: Option<DateTime<Utc>>,
    closed: Vec<Interval>,
}

impl TrackState {
    /// Applies the new presence value, opening or closing an interval on a
    /// transition. Identical consecutive values have no side effect.
    fn transition(&mut self, present: bool, at: DateTime<Utc>) {
        if present == self.present {
            return;
        }
        self.present = present;
        if present {
            debug_assert!(
                self.open_since.is_none(),
                "track already has an open interval"
            );
            self.open_since = Some(at);
        } else if let Some(start) = self.open_since.take() {
            self.closed.push(Interval { start, end: at });
        }
    }

    fn finish(mut self, close_open_at: Option<DateTime<Utc>>) -> Vec<Interval> {
        if let (Some(end), Some(start)) = (close_open_at, self.open_since.take()) {
            if end > start {
                self.closed.push(Interval { start, end });
            }
        }
        self.closed
    }
}

/// Folds an ordered event sequence into per-track presence intervals.
///
/// Events must be sorted by timestamp ascending; the builder never
/// re-sorts or deduplicates. A role is present iff its most recent action
/// was `enter` or `update`; any unrecognized action tag is treated as an
/// absence signal and logged as a non-fatal diagnostic.
pub fn build_intervals<E: PresenceSignal>(
    events: &[E],
    config: &BuilderConfig,
) -> ChannelIntervals {
    let mut publisher = TrackState::default();
    let mut subscriber = TrackState::default();
    let mut both = TrackState::default();

    for event in events {
        let at = event.timestamp();
        let present = match event.action().parse::<PresenceAction>() {
            Ok(action) => action.grants_presence(),
            Err(unknown) => {
                tracing::debug!(
                    role = %event.role(),
                    timestamp = %at,
                    "{unknown}, treated as absence"
                );
                false
            }
        };

        match event.role() {
            Role::Publisher => publisher.transition(present, at),
            Role::Subscriber => subscriber.transition(present, at),
        }
        both.transition(publisher.present && subscriber.present, at);
    }

    ChannelIntervals {
        publisher: publisher.finish(config.close_open_at),
        subscriber: subscriber.finish(config.close_open_at),
        both: both.finish(config.close_open_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Test event fixture.
    struct TestEvent {
        role: Role,
        action: &'static str,
        timestamp: DateTime<Utc>,
    }

    impl PresenceSignal for TestEvent {
        fn timestamp(&self) -> DateTime<Utc> {
            self.timestamp
        }

        fn role(&self) -> Role {
            self.role
        }

        fn action(&self) -> &str {
            self.action
        }
    }

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn ev(role: Role, action: &'static str, ms: i64) -> TestEvent {
        TestEvent {
            role,
            action,
            timestamp: ts(ms),
        }
    }

    fn iv(start_ms: i64, end_ms: i64) -> Interval {
        Interval {
            start: ts(start_ms),
            end: ts(end_ms),
        }
    }

    #[test]
    fn empty_events_produce_empty_tracks() {
        let result = build_intervals(&[] as &[TestEvent], &BuilderConfig::default());
        assert!(result.publisher.is_empty());
        assert!(result.subscriber.is_empty());
        assert!(result.both.is_empty());
    }

    #[test]
    fn interleaved_roles_produce_conjunction_overlap() {
        let events = vec![
            ev(Role::Publisher, "enter", 0),
            ev(Role::Subscriber, "enter", 10),
            ev(Role::Publisher, "leave", 20),
            ev(Role::Subscriber, "leave", 30),
        ];

        let result = build_intervals(&events, &BuilderConfig::default());

        assert_eq!(result.publisher, vec![iv(0, 20)]);
        assert_eq!(result.subscriber, vec![iv(10, 30)]);
        assert_eq!(result.both, vec![iv(10, 20)]);
    }

    #[test]
    fn update_grants_presence() {
        // A role whose first visible action is an update becomes present.
        let events = vec![
            ev(Role::Publisher, "update", 0),
            ev(Role::Publisher, "leave", 15),
        ];

        let result = build_intervals(&events, &BuilderConfig::default());
        assert_eq!(result.publisher, vec![iv(0, 15)]);
    }

    #[test]
    fn repeated_actions_are_idempotent() {
        let events = vec![
            ev(Role::Publisher, "enter", 0),
            ev(Role::Publisher, "enter", 5),
            ev(Role::Publisher, "update", 10),
            ev(Role::Publisher, "leave", 20),
            ev(Role::Publisher, "leave", 25),
        ];

        let result = build_intervals(&events, &BuilderConfig::default());
        // One interval: the repeats cause no state change and no side effect.
        assert_eq!(result.publisher, vec![iv(0, 20)]);
    }

    #[test]
    fn unrecognized_action_acts_as_absence() {
        let events = vec![
            ev(Role::Publisher, "enter", 0),
            ev(Role::Publisher, "interval", 10),
            ev(Role::Publisher, "enter", 20),
            ev(Role::Publisher, "leave", 30),
        ];

        let result = build_intervals(&events, &BuilderConfig::default());
        assert_eq!(result.publisher, vec![iv(0, 10), iv(20, 30)]);
    }

    #[test]
    fn trailing_open_interval_is_dropped_by_default() {
        let events = vec![
            ev(Role::Publisher, "enter", 0),
            ev(Role::Publisher, "leave", 10),
            ev(Role::Publisher, "enter", 20),
            // Never leaves.
        ];

        let result = build_intervals(&events, &BuilderConfig::default());
        assert_eq!(result.publisher, vec![iv(0, 10)]);
    }

    #[test]
    fn trailing_open_interval_closes_at_configured_instant() {
        let events = vec![ev(Role::Publisher, "enter", 20)];

        let config = BuilderConfig {
            close_open_at: Some(ts(50)),
        };
        let result = build_intervals(&events, &config);
        assert_eq!(result.publisher, vec![iv(20, 50)]);
    }

    #[test]
    fn close_open_at_before_open_start_drops_interval() {
        let events = vec![ev(Role::Publisher, "enter", 100)];

        let config = BuilderConfig {
            close_open_at: Some(ts(50)),
        };
        let result = build_intervals(&events, &config);
        assert!(result.publisher.is_empty());
    }

    #[test]
    fn both_track_requires_simultaneous_presence() {
        // Publisher and subscriber present but never at the same time.
        let events = vec![
            ev(Role::Publisher, "enter", 0),
            ev(Role::Publisher, "leave", 10),
            ev(Role::Subscriber, "enter", 10),
            ev(Role::Subscriber, "leave", 20),
        ];

        let result = build_intervals(&events, &BuilderConfig::default());
        assert_eq!(result.publisher, vec![iv(0, 10)]);
        assert_eq!(result.subscriber, vec![iv(10, 20)]);
        assert!(result.both.is_empty());
    }

    #[test]
    fn both_track_reopens_on_each_overlap() {
        let events = vec![
            ev(Role::Subscriber, "enter", 0),
            ev(Role::Publisher, "enter", 5),
            ev(Role::Publisher, "leave", 10),
            ev(Role::Publisher, "enter", 15),
            ev(Role::Publisher, "leave", 20),
            ev(Role::Subscriber, "leave", 30),
        ];

        let result = build_intervals(&events, &BuilderConfig::default());
        assert_eq!(result.both, vec![iv(5, 10), iv(15, 20)]);
    }

    #[test]
    fn zero_length_intervals_are_kept() {
        // Enter and leave at the same instant: a closed interval of 0 ms.
        let events = vec![
            ev(Role::Subscriber, "enter", 10),
            ev(Role::Subscriber, "leave", 10),
        ];

        let result = build_intervals(&events, &BuilderConfig::default());
        assert_eq!(result.subscriber, vec![iv(10, 10)]);
        assert_eq!(result.subscriber[0].duration_ms(), 0);
    }

    #[test]
    fn opened_equals_closed_per_track() {
        let events = vec![
            ev(Role::Publisher, "enter", 0),
            ev(Role::Subscriber, "join", 5),
            ev(Role::Publisher, "timeout", 10),
            ev(Role::Publisher, "enter", 15),
            ev(Role::Subscriber, "leave", 25),
            // Publisher still open at the end of the sequence.
        ];

        let result = build_intervals(&events, &BuilderConfig::default());
        for track in [Track::Publisher, Track::Subscriber, Track::Both] {
            for interval in result.track(track) {
                assert!(
                    interval.start <= interval.end,
                    "closed interval out of order on {track}"
                );
            }
        }
        // The trailing open publisher interval never materializes.
        assert_eq!(result.publisher, vec![iv(0, 10)]);
    }

    #[test]
    fn track_accessor_matches_fields() {
        let events = vec![
            ev(Role::Publisher, "enter", 0),
            ev(Role::Publisher, "leave", 10),
        ];
        let result = build_intervals(&events, &BuilderConfig::default());

        assert_eq!(result.track(Track::Publisher), result.publisher.as_slice());
        assert_eq!(
            result.track(Track::Subscriber),
            result.subscriber.as_slice()
        );
        assert_eq!(result.track(Track::Both), result.both.as_slice());
    }
}
