//! Structured stat tree: build mode -> game mode -> comp mode -> team size -> leaf.
//!
//! Leaves are their own type, so traversal never has to guess whether a
//! node is a bucket or a set of counters. Every transform builds a new tree.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{BuildMode, CompMode, GameMode, Quadruple, StatKind, StatValue, TeamSize};

pub type TeamSizeNode = BTreeMap<TeamSize, StatLeaf>;
pub type CompModeNode = BTreeMap<CompMode, TeamSizeNode>;
pub type GameModeNode = BTreeMap<GameMode, CompModeNode>;

/// Derived ratios attached to a leaf by the rate annotator.
///
/// Division by zero is not special-cased: a perfect win record gives an
/// infinite `kills_per_death`, zero kills an infinite `minutes_per_kill`.
/// Without a minutes counter both time rates are `NaN`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rates {
    pub win_rate: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top3_rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top5_rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top6_rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top10_rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top12_rate: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top25_rate: Option<f64>,

    /// Kills over matches not won.
    pub kills_per_death: f64,

    pub kills_per_20: f64,

    pub minutes_per_kill: f64,
}

impl Rates {
    /// Rate stored for a placement kind, if any.
    pub fn placement_rate(&self, kind: StatKind) -> Option<f64> {
        match kind {
            StatKind::Top3 => self.top3_rate,
            StatKind::Top5 => self.top5_rate,
            StatKind::Top6 => self.top6_rate,
            StatKind::Top10 => self.top10_rate,
            StatKind::Top12 => self.top12_rate,
            StatKind::Top25 => self.top25_rate,
            _ => None,
        }
    }

    pub fn set_placement_rate(&mut self, kind: StatKind, rate: f64) {
        let slot = match kind {
            StatKind::Top3 => &mut self.top3_rate,
            StatKind::Top5 => &mut self.top5_rate,
            StatKind::Top6 => &mut self.top6_rate,
            StatKind::Top10 => &mut self.top10_rate,
            StatKind::Top12 => &mut self.top12_rate,
            StatKind::Top25 => &mut self.top25_rate,
            _ => return,
        };
        *slot = Some(rate);
    }
}

/// Counters for one bucket, only for kinds actually observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatLeaf {
    #[serde(flatten)]
    pub counters: BTreeMap<StatKind, StatValue>,

    #[serde(flatten)]
    pub rates: Option<Rates>,
}

impl StatLeaf {
    pub fn from_counters<V: Into<StatValue>>(
        counters: impl IntoIterator<Item = (StatKind, V)>,
    ) -> Self {
        Self {
            counters: counters.into_iter().map(|(k, v)| (k, v.into())).collect(),
            rates: None,
        }
    }

    pub fn get(&self, kind: StatKind) -> Option<StatValue> {
        self.counters.get(&kind).copied()
    }

    /// Counter as a float, 0 when absent.
    pub fn value(&self, kind: StatKind) -> f64 {
        self.get(kind).map_or(0.0, StatValue::as_f64)
    }

    pub fn matches(&self) -> StatValue {
        self.get(StatKind::Matches).unwrap_or_default()
    }

    /// Fold a value in: counters add up, lastModified keeps the latest.
    pub fn accumulate(&mut self, kind: StatKind, value: StatValue) {
        let entry = self.counters.entry(kind).or_default();
        if kind.is_counter() {
            *entry += value;
        } else {
            *entry = (*entry).max(value);
        }
    }

    /// New leaf holding the counters of both; rates are dropped.
    pub fn merged(&self, other: &StatLeaf) -> StatLeaf {
        let mut out = StatLeaf::from_counters(self.counters.clone());
        for (&kind, &value) in &other.counters {
            out.accumulate(kind, value);
        }
        out
    }
}

/// The four-level report tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatTree {
    builds: BTreeMap<BuildMode, GameModeNode>,
}

impl StatTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from bucket leaves. Later duplicates replace earlier ones.
    pub fn from_leaves(leaves: impl IntoIterator<Item = (Quadruple, StatLeaf)>) -> Self {
        let mut tree = Self::new();
        for (quad, leaf) in leaves {
            tree.insert(quad, leaf);
        }
        tree
    }

    pub fn insert(&mut self, quad: Quadruple, leaf: StatLeaf) {
        self.builds
            .entry(quad.build_mode)
            .or_default()
            .entry(quad.game_mode)
            .or_default()
            .entry(quad.comp_mode)
            .or_default()
            .insert(quad.team_size, leaf);
    }

    pub fn get(&self, quad: &Quadruple) -> Option<&StatLeaf> {
        self.builds
            .get(&quad.build_mode)?
            .get(&quad.game_mode)?
            .get(&quad.comp_mode)?
            .get(&quad.team_size)
    }

    pub fn branch(&self, build_mode: BuildMode) -> Option<&GameModeNode> {
        self.builds.get(&build_mode)
    }

    pub fn build_modes(&self) -> impl Iterator<Item = BuildMode> + '_ {
        self.builds.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves().count()
    }

    /// Depth-first walk over every leaf, in report order.
    pub fn leaves(&self) -> impl Iterator<Item = (Quadruple, &StatLeaf)> + '_ {
        self.builds.iter().flat_map(|(&b, games)| {
            games.iter().flat_map(move |(&g, comps)| {
                comps.iter().flat_map(move |(&c, teams)| {
                    teams
                        .iter()
                        .map(move |(&t, leaf)| (Quadruple::new(b, g, c, t), leaf))
                })
            })
        })
    }

    /// New tree with every leaf replaced by `f(leaf)`.
    pub fn map_leaves(&self, f: impl Fn(&StatLeaf) -> StatLeaf) -> StatTree {
        StatTree::from_leaves(self.leaves().map(|(quad, leaf)| (quad, f(leaf))))
    }

    /// New tree keeping only buckets accepted by `keep`. Emptied branches vanish.
    pub fn retain(&self, keep: impl Fn(&Quadruple) -> bool) -> StatTree {
        StatTree::from_leaves(
            self.leaves()
                .filter(|(quad, _)| keep(quad))
                .map(|(quad, leaf)| (quad, leaf.clone())),
        )
    }
}
