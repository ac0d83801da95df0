//! Core domain logic for the channel occupancy analyzer.
//!
//! This crate contains the fundamental types and logic for:
//! - Event model: presence-change signals for the publisher and subscriber roles
//! - Interval building: folding an ordered event stream into presence intervals
//! - Window reduction: clipping intervals to an analysis window and aggregating
//!   coverage statistics
//!
//! Everything here is a pure, synchronous computation over in-memory data;
//! fetching events and presenting results belong to the caller.

mod error;
pub mod event;
pub mod intervals;
pub mod window;

pub use error::AnalysisError;
pub use event::{
    PresenceAction, PresenceEvent, PresenceSignal, Role, UnknownAction, parse_timestamp,
    timestamp_from_millis,
};
pub use intervals::{BuilderConfig, ChannelIntervals, Interval, Track, build_intervals};
pub use window::{AnalysisWindow, TrackStats, WindowReport, analyze, analyze_windows, reduce_track};
