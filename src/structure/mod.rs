//! Stat structuring.
//!
//! Buckets a flat window of raw stats into the four-level [`StatTree`].
//! A bucket only appears when its summed matches are non-zero, so an
//! all-zero window never shows up as real data.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::classify::KeyClassifier;
use crate::models::{CompMode, Quadruple, RawStatMap, StatKind, StatLeaf, StatTree};

/// Builds [`StatTree`]s from raw stat maps.
#[derive(Debug, Clone)]
pub struct StatStructurer {
    classifier: Arc<KeyClassifier>,
}

impl StatStructurer {
    pub fn new(classifier: Arc<KeyClassifier>) -> Self {
        Self { classifier }
    }

    /// Bucket `raw` by taxonomy quadruple.
    ///
    /// Keys with an unknown game mode, team size or stat kind are skipped.
    /// Values of keys landing in the same bucket and kind are summed (one
    /// key per input device, for instance). Bots buckets are only built
    /// when `include_bots` is set; unsupported combinations never are.
    pub fn structure(&self, raw: &RawStatMap, include_bots: bool) -> StatTree {
        let mut buckets: BTreeMap<Quadruple, StatLeaf> = BTreeMap::new();

        for (key, &value) in raw {
            let class = self.classifier.classify(key);
            let (Some(quad), Some(kind)) = (class.quadruple(), class.stat_kind) else {
                continue;
            };
            if !self.wanted(&quad, include_bots) {
                continue;
            }
            buckets.entry(quad).or_default().accumulate(kind, value);
        }

        let tree = StatTree::from_leaves(buckets.into_iter().filter(|(quad, leaf)| {
            let active = leaf.get(StatKind::Matches).is_some_and(|m| !m.is_zero());
            if !active {
                debug!(bucket = %quad, "Dropping bucket without matches");
            }
            active
        }));

        debug!(leaves = tree.len(), "Structured raw stats");
        tree
    }

    fn wanted(&self, quad: &Quadruple, include_bots: bool) -> bool {
        if quad.comp_mode == CompMode::Bots && !include_bots {
            return false;
        }
        self.classifier.supports(quad.game_mode, quad.team_size)
    }
}
