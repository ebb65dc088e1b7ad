//! Windowed retrieval.
//!
//! Isolates the activity of a caller's [`TimeWindow`] from an upstream that
//! only snapshots cumulative totals at irregular times:
//!
//! - **Triple**: fetch origin..end and origin..start, subtract the second
//!   from the first.
//! - **Direct**: a single query for the window, trusting upstream's own
//!   windowing. A window containing fewer than two upstream snapshots
//!   comes back empty.
//!
//! A window starting at or before the origin has no earlier snapshot to
//! peel away and is always fetched directly.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::KeyClassifier;
use crate::fetch::{FetchError, StatsSource};
use crate::models::{tomorrow_midnight_utc, RawStatMap, TimeWindow};
use crate::window::{subtract, WindowError};

/// Errors that can occur during retrieval.
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Window(#[from] WindowError),
}

/// How a window is isolated from upstream snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalStrategy {
    /// Two cumulative queries and a local subtraction
    #[default]
    Triple,

    /// One query using upstream's windowing
    Direct,
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalStrategy::Triple => write!(f, "triple"),
            RetrievalStrategy::Direct => write!(f, "direct"),
        }
    }
}

impl FromStr for RetrievalStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "triple" => Ok(RetrievalStrategy::Triple),
            "direct" => Ok(RetrievalStrategy::Direct),
            other => Err(format!("unknown retrieval strategy '{}'", other)),
        }
    }
}

/// Fetches snapshots and isolates a window's raw stats.
#[derive(Clone)]
pub struct WindowRetriever {
    source: Arc<dyn StatsSource>,
    classifier: Arc<KeyClassifier>,
    origin_time: i64,
}

impl WindowRetriever {
    /// `origin_time` is the epoch second where the game's recorded history starts.
    pub fn new(
        source: Arc<dyn StatsSource>,
        classifier: Arc<KeyClassifier>,
        origin_time: i64,
    ) -> Self {
        Self {
            source,
            classifier,
            origin_time,
        }
    }

    pub fn origin_time(&self) -> i64 {
        self.origin_time
    }

    /// Strategy actually used for `window`: lifetime windows force direct.
    pub fn effective_strategy(
        &self,
        window: TimeWindow,
        requested: RetrievalStrategy,
    ) -> RetrievalStrategy {
        if window.start_time <= self.origin_time {
            RetrievalStrategy::Direct
        } else {
            requested
        }
    }

    /// Raw stats accumulated within `window`.
    pub async fn retrieve_window(
        &self,
        account_id: &str,
        window: TimeWindow,
        strategy: RetrievalStrategy,
    ) -> Result<RawStatMap, RetrieveError> {
        self.retrieve_window_at(account_id, window, strategy, Utc::now())
            .await
    }

    /// Same as [`retrieve_window`](Self::retrieve_window) with an explicit clock.
    pub async fn retrieve_window_at(
        &self,
        account_id: &str,
        window: TimeWindow,
        strategy: RetrievalStrategy,
        now: DateTime<Utc>,
    ) -> Result<RawStatMap, RetrieveError> {
        let strategy = self.effective_strategy(window, strategy);
        debug!(%strategy, source = self.source.name(), "Retrieving window");

        match strategy {
            RetrievalStrategy::Direct => {
                let snapshot = self.source.fetch_snapshot(account_id, window).await?;
                Ok(snapshot.stats)
            }
            RetrievalStrategy::Triple => self.retrieve_by_subtraction(account_id, window, now).await,
        }
    }

    async fn retrieve_by_subtraction(
        &self,
        account_id: &str,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Result<RawStatMap, RetrieveError> {
        // Upstream only snapshots reliably up to tonight.
        let end_or_now = window.end_time.min(tomorrow_midnight_utc(now));
        if end_or_now <= window.start_time {
            warn!(
                start = window.start_time,
                horizon = end_or_now,
                "Window lies past the snapshot horizon, nothing to report"
            );
            return Ok(RawStatMap::new());
        }

        let later_query = TimeWindow::new(self.origin_time, end_or_now)?;
        let earlier_query = TimeWindow::new(self.origin_time, window.start_time)?;

        let (later, earlier) = tokio::try_join!(
            self.source.fetch_snapshot(account_id, later_query),
            self.source.fetch_snapshot(account_id, earlier_query),
        )?;

        let delta = subtract(&self.classifier, &later.stats, &earlier.stats);
        info!(
            account_id,
            keys = delta.len(),
            "Isolated window by snapshot subtraction"
        );
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Snapshot, StatValue};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;

    const ORIGIN: i64 = 1_000;

    const KILLS: &str = "br_kills_gamepad_m0_playlist_defaultsolo";
    const MATCHES: &str = "br_matchesplayed_gamepad_m0_playlist_defaultsolo";
    const MODIFIED: &str = "br_lastmodified_gamepad_m0_playlist_defaultsolo";

    /// Upstream double that sums timestamped increments falling in [start, end).
    struct TimelineSource {
        events: Vec<(i64, &'static str, i64)>,
        calls: Mutex<Vec<TimeWindow>>,
    }

    impl TimelineSource {
        fn new(events: Vec<(i64, &'static str, i64)>) -> Self {
            Self {
                events,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<TimeWindow> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatsSource for TimelineSource {
        fn name(&self) -> &'static str {
            "timeline"
        }

        async fn fetch_snapshot(
            &self,
            _account_id: &str,
            window: TimeWindow,
        ) -> Result<Snapshot, FetchError> {
            self.calls.lock().unwrap().push(window);
            let mut stats = RawStatMap::new();
            for &(t, key, value) in &self.events {
                if t >= window.start_time && t < window.end_time {
                    *stats.entry(key.to_string()).or_default() += StatValue::from(value);
                }
            }
            Ok(Snapshot::new(window, stats))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl StatsSource for FailingSource {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn fetch_snapshot(
            &self,
            _account_id: &str,
            _window: TimeWindow,
        ) -> Result<Snapshot, FetchError> {
            Err(FetchError::HttpStatus {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
        }
    }

    fn events() -> Vec<(i64, &'static str, i64)> {
        vec![
            (1_500, MATCHES, 4),
            (1_500, KILLS, 6),
            (2_500, MATCHES, 3),
            (2_500, KILLS, 9),
            (3_500, MATCHES, 1),
            (3_500, KILLS, 2),
        ]
    }

    fn retriever(source: Arc<dyn StatsSource>) -> WindowRetriever {
        WindowRetriever::new(source, Arc::new(KeyClassifier::default()), ORIGIN)
    }

    fn far_future() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_triple_subtracts_earlier_snapshot() {
        let source = Arc::new(TimelineSource::new(events()));
        let r = retriever(source.clone());

        let stats = r
            .retrieve_window_at(
                "acc",
                TimeWindow::new(2_000, 3_000).unwrap(),
                RetrievalStrategy::Triple,
                far_future(),
            )
            .await
            .unwrap();

        assert_eq!(stats[MATCHES], 3);
        assert_eq!(stats[KILLS], 9);

        let calls = source.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.contains(&TimeWindow::new(ORIGIN, 3_000).unwrap()));
        assert!(calls.contains(&TimeWindow::new(ORIGIN, 2_000).unwrap()));
    }

    #[tokio::test]
    async fn test_triple_matches_direct_with_full_coverage() {
        let source = Arc::new(TimelineSource::new(events()));
        let r = retriever(source);
        let window = TimeWindow::new(2_000, 4_000).unwrap();

        let triple = r
            .retrieve_window_at("acc", window, RetrievalStrategy::Triple, far_future())
            .await
            .unwrap();
        let direct = r
            .retrieve_window_at("acc", window, RetrievalStrategy::Direct, far_future())
            .await
            .unwrap();

        assert_eq!(triple, direct);
    }

    #[tokio::test]
    async fn test_lifetime_window_forces_direct() {
        let source = Arc::new(TimelineSource::new(events()));
        let r = retriever(source.clone());
        let window = TimeWindow::new(ORIGIN, 4_000).unwrap();

        assert_eq!(
            r.effective_strategy(window, RetrievalStrategy::Triple),
            RetrievalStrategy::Direct
        );

        let stats = r
            .retrieve_window_at("acc", window, RetrievalStrategy::Triple, far_future())
            .await
            .unwrap();

        assert_eq!(stats[MATCHES], 8);
        assert_eq!(source.calls(), vec![window]);
    }

    #[tokio::test]
    async fn test_end_clamped_to_tomorrow_midnight() {
        let source = Arc::new(TimelineSource::new(vec![]));
        let r = retriever(source.clone());
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
        let tomorrow = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap().timestamp();

        r.retrieve_window_at(
            "acc",
            TimeWindow::new(2_000, tomorrow + 86_400 * 30).unwrap(),
            RetrievalStrategy::Triple,
            now,
        )
        .await
        .unwrap();

        assert!(source
            .calls()
            .contains(&TimeWindow::new(ORIGIN, tomorrow).unwrap()));
    }

    #[tokio::test]
    async fn test_future_window_is_empty_without_requests() {
        let source = Arc::new(TimelineSource::new(events()));
        let r = retriever(source.clone());
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
        let next_year = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap().timestamp();

        let stats = r
            .retrieve_window_at(
                "acc",
                TimeWindow::new(next_year, next_year + 86_400).unwrap(),
                RetrievalStrategy::Triple,
                now,
            )
            .await
            .unwrap();

        assert!(stats.is_empty());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_lastmodified_taken_from_later_snapshot() {
        let source = Arc::new(TimelineSource::new(vec![
            (1_500, MODIFIED, 1_500),
            (2_500, MATCHES, 1),
        ]));
        let r = retriever(source);

        let stats = r
            .retrieve_window_at(
                "acc",
                TimeWindow::new(2_000, 3_000).unwrap(),
                RetrievalStrategy::Triple,
                far_future(),
            )
            .await
            .unwrap();

        assert_eq!(stats[MODIFIED], 1_500);
        assert_eq!(stats[MATCHES], 1);
    }

    #[tokio::test]
    async fn test_fetch_errors_propagate() {
        let r = retriever(Arc::new(FailingSource));

        for strategy in [RetrievalStrategy::Triple, RetrievalStrategy::Direct] {
            let err = r
                .retrieve_window_at(
                    "acc",
                    TimeWindow::new(2_000, 3_000).unwrap(),
                    strategy,
                    far_future(),
                )
                .await
                .unwrap_err();

            assert!(matches!(
                err,
                RetrieveError::Fetch(FetchError::HttpStatus { status: 503, .. })
            ));
        }
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("Triple".parse::<RetrievalStrategy>(), Ok(RetrievalStrategy::Triple));
        assert_eq!("direct".parse::<RetrievalStrategy>(), Ok(RetrievalStrategy::Direct));
        assert!("both".parse::<RetrievalStrategy>().is_err());
        assert_eq!(RetrievalStrategy::default(), RetrievalStrategy::Triple);
    }
}
