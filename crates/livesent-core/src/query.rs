use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted `days_ago`.
pub const MAX_DAYS_AGO: i64 = 30;

const MAX_LOCATION_LEN: usize = 200;

/// Inbound "run a location query" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationQuery {
    pub location: String,
    /// ISO-8601 timestamp used verbatim as the event timestamp.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub days_ago: Option<i64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("location must not be empty")]
    EmptyLocation,

    #[error("location must be at most {max} characters")]
    LocationTooLong { max: usize },

    #[error("days_ago must be between 0 and {MAX_DAYS_AGO}, got {0}")]
    DaysAgoOutOfRange(i64),

    #[error("timestamp is not ISO-8601: {0}")]
    InvalidTimestamp(String),
}

impl LocationQuery {
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            timestamp: None,
            days_ago: None,
        }
    }

    /// Reject malformed queries before they reach the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first [`QueryError`] found.
    pub fn validate(&self) -> Result<(), QueryError> {
        let location = self.location.trim();
        if location.is_empty() {
            return Err(QueryError::EmptyLocation);
        }
        if location.chars().count() > MAX_LOCATION_LEN {
            return Err(QueryError::LocationTooLong {
                max: MAX_LOCATION_LEN,
            });
        }
        if let Some(days) = self.days_ago {
            if !(0..=MAX_DAYS_AGO).contains(&days) {
                return Err(QueryError::DaysAgoOutOfRange(days));
            }
        }
        if let Some(ts) = &self.timestamp {
            if !is_iso8601(ts) {
                return Err(QueryError::InvalidTimestamp(ts.clone()));
            }
        }
        Ok(())
    }

    /// The event timestamp for this query.
    ///
    /// An explicit `timestamp` is returned unchanged, since it feeds the event
    /// identity. Otherwise `now - days_ago` is rendered as a naive UTC
    /// ISO-8601 string with microseconds.
    #[must_use]
    pub fn resolve_timestamp(&self, now: DateTime<Utc>) -> String {
        if let Some(ts) = &self.timestamp {
            return ts.clone();
        }
        let days = self.days_ago.unwrap_or(0).clamp(0, MAX_DAYS_AGO);
        let at = now - TimeDelta::days(days);
        at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

fn is_iso8601(raw: &str) -> bool {
    DateTime::parse_from_rfc3339(raw).is_ok()
        || NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}
