//! # Stats Window
//!
//! Windowed gameplay statistics from an upstream that only reports
//! cumulative totals.
//!
//! ## Architecture
//!
//! - **models**: Taxonomy enums, time windows, snapshots and the stat tree
//! - **classify**: Table-driven stat key classification
//! - **window**: Snapshot subtraction
//! - **fetch**: Upstream stats source trait and HTTP client
//! - **retrieve**: Triple/direct window retrieval
//! - **structure**: Raw stats to taxonomy tree
//! - **calculate**: Derived rates
//! - **filter**: Taxonomy filters with default exclusions
//! - **report**: The end-to-end player report
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod classify;
pub mod config;
pub mod fetch;
pub mod filter;
pub mod models;
pub mod report;
pub mod retrieve;
pub mod structure;
pub mod window;

pub use models::*;

use chrono::NaiveDate;

/// Parse a point in time given as epoch seconds or `YYYY-MM-DD` (00:00 UTC).
pub fn parse_time(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(secs) = s.parse::<i64>() {
        return Some(secs);
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(midnight_utc)
}
