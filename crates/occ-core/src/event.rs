//! Presence-change events for a tracked channel.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// The two actor kinds tracked on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Publisher,
    Subscriber,
}

impl Role {
    /// String representation, matching the wire format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Publisher => "publisher",
            Self::Subscriber => "subscriber",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical presence actions.
///
/// `Enter` and `Update` grant presence; `Leave` revokes it. Action tags
/// outside this set are not an error: the interval builder treats them as
/// an absence signal (same as `Leave`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceAction {
    Enter,
    Update,
    Leave,
}

impl PresenceAction {
    /// Whether this action marks the role as present.
    #[must_use]
    pub const fn grants_presence(self) -> bool {
        matches!(self, Self::Enter | Self::Update)
    }
}

impl fmt::Display for PresenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Enter => "enter",
            Self::Update => "update",
            Self::Leave => "leave",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PresenceAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enter" | "join" => Ok(Self::Enter),
            "update" | "state-change" => Ok(Self::Update),
            "leave" | "timeout" => Ok(Self::Leave),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

/// Error type for unrecognized action tags.
#[derive(Debug, Clone)]
pub struct UnknownAction(String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown presence action: {}", self.0)
    }
}

impl std::error::Error for UnknownAction {}

/// A discrete presence-change record for one role on the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// Which role changed state.
    pub role: Role,
    /// Raw action tag as supplied by the event source. Kept as a string so
    /// unrecognized tags survive round-trips; they act as absence signals
    /// during interval building.
    pub action: String,
    /// When the change occurred.
    pub timestamp: DateTime<Utc>,
    /// Optional additional context as JSON (e.g., presence state payload).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// An event suitable for interval building.
///
/// This trait decouples the builder from any particular event
/// representation, so wire records and test fixtures can feed it alike.
pub trait PresenceSignal {
    /// Returns the event's timestamp.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Returns the role the event applies to.
    fn role(&self) -> Role;

    /// Returns the raw action tag (e.g., "enter", "leave").
    fn action(&self) -> &str;
}

impl PresenceSignal for PresenceEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn role(&self) -> Role {
        self.role
    }

    fn action(&self) -> &str {
        &self.action
    }
}

/// Parses a timestamp given as RFC 3339 text or an epoch-milliseconds
/// integer string.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AnalysisError> {
    if let Ok(ms) = value.parse::<i64>() {
        return timestamp_from_millis(ms);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AnalysisError::MalformedTimestamp {
            value: value.to_string(),
        })
}

/// Converts an epoch-milliseconds value into an instant.
pub fn timestamp_from_millis(ms: i64) -> Result<DateTime<Utc>, AnalysisError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| AnalysisError::MalformedTimestamp {
            value: ms.to_string(),
        })
}
