//! Time windows and the flat stat maps the upstream returns.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::StatValue;
use crate::window::WindowError;

/// Opaque upstream key to counter value (or lastmodified epoch seconds).
pub type RawStatMap = BTreeMap<String, StatValue>;

/// A reporting period in epoch seconds. `start_time <= end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_time: i64,
    pub end_time: i64,
}

impl TimeWindow {
    /// Create a window, rejecting an end that precedes the start.
    pub fn new(start_time: i64, end_time: i64) -> Result<Self, WindowError> {
        if start_time > end_time {
            return Err(WindowError::Inverted {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    /// Window covering whole UTC days, `from` 00:00 through the end of `to`.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Result<Self, WindowError> {
        Self::new(midnight_utc(from), midnight_utc(to + Duration::days(1)))
    }

    pub fn duration_secs(&self) -> i64 {
        self.end_time - self.start_time
    }
}

/// Epoch seconds of 00:00 UTC on `date`.
pub fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
        .unwrap_or_default()
}

/// Epoch seconds of the midnight that ends the UTC day containing `now`.
pub fn tomorrow_midnight_utc(now: DateTime<Utc>) -> i64 {
    midnight_utc(now.date_naive() + Duration::days(1))
}

/// Cumulative stats returned by the upstream for one query window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub start_time: i64,

    #[serde(default)]
    pub end_time: i64,

    #[serde(default)]
    pub account_id: Option<String>,

    #[serde(default)]
    pub stats: RawStatMap,
}

impl Snapshot {
    pub fn new(window: TimeWindow, stats: RawStatMap) -> Self {
        Self {
            start_time: window.start_time,
            end_time: window.end_time,
            account_id: None,
            stats,
        }
    }
}
