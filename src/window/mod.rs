//! Window subtraction.
//!
//! The upstream only reports totals since the start of recorded history.
//! Activity in (B, A] is the cumulative snapshot to A minus the cumulative
//! snapshot to B.

use thiserror::Error;
use tracing::warn;

use crate::classify::KeyClassifier;
use crate::models::{RawStatMap, Snapshot, StatKind, StatValue};

/// Errors from malformed window inputs. These indicate caller bugs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("window start {start} is after its end {end}")]
    Inverted { start: i64, end: i64 },

    #[error("cannot subtract a snapshot ending at {smaller_end} from one ending earlier at {larger_end}")]
    OutOfOrder { larger_end: i64, smaller_end: i64 },
}

/// Per-key delta `larger - smaller` over the union of both key sets.
///
/// A key missing on one side contributes 0 from that side. lastmodified
/// keys are timestamps and take the larger snapshot's value (0 if absent).
/// Integer deltas saturate at the `i64` bounds.
pub fn subtract(
    classifier: &KeyClassifier,
    larger: &RawStatMap,
    smaller: &RawStatMap,
) -> RawStatMap {
    let mut out = RawStatMap::new();

    for key in larger.keys().chain(smaller.keys()) {
        if out.contains_key(key) {
            continue;
        }

        let later = larger.get(key).copied().unwrap_or_default();
        let value = if classifier.stat_kind(key) == Some(StatKind::LastModified) {
            later
        } else {
            later - smaller.get(key).copied().unwrap_or_default()
        };

        if value.is_negative() {
            warn!(key = %key, value = %value, "negative delta, snapshots are irregular");
        }
        out.insert(key.clone(), value);
    }

    out
}

/// Subtract two snapshots, checking that `larger` really ends later.
pub fn subtract_snapshots(
    classifier: &KeyClassifier,
    larger: &Snapshot,
    smaller: &Snapshot,
) -> Result<RawStatMap, WindowError> {
    if larger.end_time < smaller.end_time {
        return Err(WindowError::OutOfOrder {
            larger_end: larger.end_time,
            smaller_end: smaller.end_time,
        });
    }
    Ok(subtract(classifier, &larger.stats, &smaller.stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeWindow;

    const KILLS: &str = "br_kills_gamepad_m0_playlist_defaultsolo";
    const MATCHES: &str = "br_matchesplayed_gamepad_m0_playlist_defaultsolo";
    const MODIFIED: &str = "br_lastmodified_gamepad_m0_playlist_defaultsolo";

    fn stats(entries: &[(&str, i64)]) -> RawStatMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), StatValue::from(*v)))
            .collect()
    }

    fn snap(end: i64, entries: &[(&str, i64)]) -> Snapshot {
        Snapshot::new(TimeWindow::new(0, end).unwrap(), stats(entries))
    }

    #[test]
    fn test_subtract_counters_and_keep_timestamps() {
        let k = KeyClassifier::default();
        let later = stats(&[(KILLS, 30), (MATCHES, 12), (MODIFIED, 1_700_000_500)]);
        let earlier = stats(&[(KILLS, 10), (MATCHES, 5), (MODIFIED, 1_700_000_000)]);

        let delta = subtract(&k, &later, &earlier);

        assert_eq!(delta[KILLS], 20);
        assert_eq!(delta[MATCHES], 7);
        assert_eq!(delta[MODIFIED], 1_700_000_500);
    }

    #[test]
    fn test_subtract_union_of_keys() {
        let k = KeyClassifier::default();
        let later = stats(&[(KILLS, 8)]);
        let earlier = stats(&[(MATCHES, 3), (MODIFIED, 1_600_000_000)]);

        let delta = subtract(&k, &later, &earlier);

        assert_eq!(delta.len(), 3);
        assert_eq!(delta[KILLS], 8);
        assert_eq!(delta[MATCHES], -3);
        assert_eq!(delta[MODIFIED], 0);
    }

    #[test]
    fn test_subtract_identity() {
        let k = KeyClassifier::default();
        let s = stats(&[(KILLS, 30), (MATCHES, 12), (MODIFIED, 1_700_000_500), ("odd_key", 4)]);

        let delta = subtract(&k, &s, &s);

        assert_eq!(delta[KILLS], 0);
        assert_eq!(delta[MATCHES], 0);
        assert_eq!(delta["odd_key"], 0);
        assert_eq!(delta[MODIFIED], 1_700_000_500);
    }

    #[test]
    fn test_subtract_is_additive() {
        let k = KeyClassifier::default();
        let e1 = stats(&[(KILLS, 5), (MATCHES, 2)]);
        let e2 = stats(&[(KILLS, 9), (MATCHES, 6), (MODIFIED, 100)]);
        let e3 = stats(&[(KILLS, 20), (MATCHES, 6), ("br_kills_gamepad_m0_playlist_trios", 3)]);

        let whole = subtract(&k, &e3, &e1);
        let first = subtract(&k, &e2, &e1);
        let second = subtract(&k, &e3, &e2);

        for (key, value) in &whole {
            if k.stat_kind(key) == Some(StatKind::LastModified) {
                continue;
            }
            let sum = first.get(key).copied().unwrap_or_default()
                + second.get(key).copied().unwrap_or_default();
            assert_eq!(*value, sum, "key {}", key);
        }
    }

    #[test]
    fn test_subtract_snapshots_order_checked() {
        let k = KeyClassifier::default();
        let early = snap(100, &[(KILLS, 1)]);
        let late = snap(200, &[(KILLS, 4)]);

        assert_eq!(subtract_snapshots(&k, &late, &early).unwrap()[KILLS], 3);
        assert_eq!(
            subtract_snapshots(&k, &early, &late),
            Err(WindowError::OutOfOrder {
                larger_end: 100,
                smaller_end: 200
            })
        );
    }

    #[test]
    fn test_subtract_extreme_values_saturate() {
        let k = KeyClassifier::default();
        let later = stats(&[(KILLS, i64::MAX), (MATCHES, i64::MIN)]);
        let earlier = stats(&[(KILLS, -1), (MATCHES, 1)]);

        let delta = subtract(&k, &later, &earlier);

        assert_eq!(delta[KILLS], i64::MAX);
        assert_eq!(delta[MATCHES], i64::MIN);
    }

    #[test]
    fn test_subtract_fractional_unknown_key() {
        let k = KeyClassifier::default();
        let mut later = stats(&[(KILLS, 6)]);
        later.insert("br_score_gamepad_m0_playlist_defaultsolo".to_string(), 20.5.into());
        let mut earlier = stats(&[(KILLS, 2)]);
        earlier.insert("br_score_gamepad_m0_playlist_defaultsolo".to_string(), 8.into());

        let delta = subtract(&k, &later, &earlier);

        assert_eq!(delta[KILLS], StatValue::Int(4));
        assert_eq!(
            delta["br_score_gamepad_m0_playlist_defaultsolo"],
            StatValue::Float(12.5)
        );
    }

    #[test]
    fn test_inputs_untouched() {
        let k = KeyClassifier::default();
        let later = stats(&[(KILLS, 30)]);
        let earlier = stats(&[(KILLS, 10)]);
        let _ = subtract(&k, &later, &earlier);
        assert_eq!(later[KILLS], 30);
        assert_eq!(earlier[KILLS], 10);
    }
}
