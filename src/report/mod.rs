//! Player reports.
//!
//! Runs the whole pipeline for one account and window:
//! 1. Retrieve the window's raw stats (triple or direct)
//! 2. Structure them into the taxonomy tree
//! 3. Annotate leaves with rates
//! 4. Filter down to the requested buckets
//!
//! and shapes the result as a structured tree, a raw map, or a
//! Tracker-Network style summary.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::calculate::{annotate, totals};
use crate::classify::{KeyClassifier, Taxonomy};
use crate::fetch::StatsSource;
use crate::filter::{filter, FilterSet};
use crate::models::{ParseTaxonomyError, RawStatMap, StatKind, StatLeaf, StatTree, TeamSize, TimeWindow};
use crate::retrieve::{RetrievalStrategy, RetrieveError, WindowRetriever};
use crate::structure::StatStructurer;

/// Errors that can occur while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),

    #[error("Invalid stat kind filter: {0}")]
    UnknownStatKind(#[from] ParseTaxonomyError),
}

/// Output shape of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Annotated, filtered taxonomy tree
    #[default]
    Structured,

    /// Isolated raw stat map
    Raw,

    /// Per-team-size totals plus an overall line
    Trn,
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportMode::Structured => write!(f, "structured"),
            ReportMode::Raw => write!(f, "raw"),
            ReportMode::Trn => write!(f, "trn"),
        }
    }
}

impl FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(ReportMode::Structured),
            "raw" => Ok(ReportMode::Raw),
            "trn" => Ok(ReportMode::Trn),
            other => Err(format!("unknown report mode '{}'", other)),
        }
    }
}

/// Caller options for [`PlayerReporter::get_player_report`].
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Taxonomy tokens such as "solo", "ranked", "zeroBuild"
    pub filters: Vec<String>,

    /// Stat kind names restricting raw output
    pub stat_kinds: Vec<String>,

    pub mode: ReportMode,

    pub strategy: RetrievalStrategy,
}

/// Tracker-Network style summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrnSummary {
    /// Totals across every remaining bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall: Option<StatLeaf>,

    #[serde(flatten)]
    pub team_sizes: BTreeMap<TeamSize, StatLeaf>,
}

impl TrnSummary {
    /// Collapse `tree` across build, game and comp modes.
    pub fn from_tree(tree: &StatTree) -> Self {
        if tree.is_empty() {
            return Self::default();
        }

        let mut by_size: BTreeMap<TeamSize, Vec<&StatLeaf>> = BTreeMap::new();
        for (quad, leaf) in tree.leaves() {
            by_size.entry(quad.team_size).or_default().push(leaf);
        }

        Self {
            overall: Some(totals(tree.leaves().map(|(_, leaf)| leaf))),
            team_sizes: by_size
                .into_iter()
                .map(|(size, leaves)| (size, totals(leaves)))
                .collect(),
        }
    }
}

/// A finished report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Structured(StatTree),
    Raw(RawStatMap),
    Trn(TrnSummary),
}

/// Builds player reports from a stats source.
#[derive(Clone)]
pub struct PlayerReporter {
    classifier: Arc<KeyClassifier>,
    retriever: WindowRetriever,
    structurer: StatStructurer,
}

impl PlayerReporter {
    /// Create a reporter over `source` with the given taxonomy and history origin.
    pub fn new(source: Arc<dyn StatsSource>, taxonomy: Taxonomy, origin_time: i64) -> Self {
        let classifier = Arc::new(KeyClassifier::new(taxonomy));
        Self {
            retriever: WindowRetriever::new(source, classifier.clone(), origin_time),
            structurer: StatStructurer::new(classifier.clone()),
            classifier,
        }
    }

    pub fn classifier(&self) -> &KeyClassifier {
        &self.classifier
    }

    /// Fetch and shape the report for `account_id` over `window`.
    pub async fn get_player_report(
        &self,
        account_id: &str,
        window: TimeWindow,
        options: &ReportOptions,
    ) -> Result<Report, ReportError> {
        self.get_player_report_at(account_id, window, options, Utc::now())
            .await
    }

    /// Same as [`get_player_report`](Self::get_player_report) with an explicit clock.
    pub async fn get_player_report_at(
        &self,
        account_id: &str,
        window: TimeWindow,
        options: &ReportOptions,
        now: DateTime<Utc>,
    ) -> Result<Report, ReportError> {
        let stat_kinds = parse_stat_kinds(&options.stat_kinds)?;

        info!(
            account_id,
            start = window.start_time,
            end = window.end_time,
            mode = %options.mode,
            "Building player report"
        );

        let raw = self
            .retriever
            .retrieve_window_at(account_id, window, options.strategy, now)
            .await?;

        Ok(self.shape(&raw, &options.filters, &stat_kinds, options.mode))
    }

    /// Shape an already isolated raw window. Pure.
    pub fn build_report(
        &self,
        raw: &RawStatMap,
        options: &ReportOptions,
    ) -> Result<Report, ReportError> {
        let stat_kinds = parse_stat_kinds(&options.stat_kinds)?;
        Ok(self.shape(raw, &options.filters, &stat_kinds, options.mode))
    }

    fn shape(
        &self,
        raw: &RawStatMap,
        filters: &[String],
        stat_kinds: &[StatKind],
        mode: ReportMode,
    ) -> Report {
        let filters = FilterSet::parse(filters);
        match mode {
            ReportMode::Raw => Report::Raw(self.raw_report(raw, &filters, stat_kinds)),
            ReportMode::Structured => {
                let tree = self.structurer.structure(raw, filters.includes_bots());
                Report::Structured(filter(&annotate(&tree), &filters))
            }
            ReportMode::Trn => {
                let tree = self.structurer.structure(raw, filters.includes_bots());
                Report::Trn(TrnSummary::from_tree(&filter(&tree, &filters)))
            }
        }
    }

    /// Raw keys restricted by stat kind and, when any filters were given,
    /// by taxonomy. Unclassifiable keys survive only unrestricted output.
    fn raw_report(
        &self,
        raw: &RawStatMap,
        filters: &FilterSet,
        stat_kinds: &[StatKind],
    ) -> RawStatMap {
        let unfiltered = *filters == FilterSet::default();
        raw.iter()
            .filter(|(key, _)| {
                let class = self.classifier.classify(key);
                let kind_ok = stat_kinds.is_empty()
                    || class.stat_kind.is_some_and(|k| stat_kinds.contains(&k));
                kind_ok && (unfiltered || filters.admits_key(&class))
            })
            .map(|(key, &value)| (key.clone(), value))
            .collect()
    }
}

fn parse_stat_kinds(names: &[String]) -> Result<Vec<StatKind>, ParseTaxonomyError> {
    names.iter().map(|name| name.parse()).collect()
}
