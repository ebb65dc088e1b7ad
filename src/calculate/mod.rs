//! Rate calculation.
//!
//! Derives per-leaf ratios from raw counters:
//! - Win rate and placement rates per match
//! - Kills per death, counting every match not won as a death
//! - Kills per 20 minutes and minutes per kill
//!
//! Zero denominators are not special-cased and yield `inf`/`NaN`, and a
//! leaf without a minutes counter gets `NaN` time rates. Callers presenting
//! rates must handle non-finite values.

use crate::models::{Rates, StatKind, StatLeaf, StatTree};

/// Annotate every leaf of `tree`. The input tree is left untouched.
pub fn annotate(tree: &StatTree) -> StatTree {
    tree.map_leaves(annotate_leaf)
}

/// Copy of `leaf` with its rates computed from its counters.
pub fn annotate_leaf(leaf: &StatLeaf) -> StatLeaf {
    StatLeaf {
        counters: leaf.counters.clone(),
        rates: Some(calculate_rates(leaf)),
    }
}

/// Compute the rate block for a leaf.
pub fn calculate_rates(leaf: &StatLeaf) -> Rates {
    let matches = leaf.value(StatKind::Matches);
    let wins = leaf.value(StatKind::Wins);
    let kills = leaf.value(StatKind::Kills);
    let minutes = leaf
        .get(StatKind::Minutes)
        .map_or(f64::NAN, |m| m.as_f64());

    let mut rates = Rates {
        win_rate: wins / matches,
        kills_per_death: calculate_kills_per_death(kills, matches, wins),
        kills_per_20: kills * 20.0 / minutes,
        minutes_per_kill: minutes / kills,
        ..Default::default()
    };

    for &kind in StatKind::PLACEMENTS {
        if let Some(count) = leaf.get(kind) {
            rates.set_placement_rate(kind, count.as_f64() / matches);
        }
    }

    rates
}

/// Kills over matches not won. A perfect record divides by zero.
pub fn calculate_kills_per_death(kills: f64, matches: f64, wins: f64) -> f64 {
    kills / (matches - wins)
}

/// Sum `leaves` into a single annotated leaf.
pub fn totals<'a>(leaves: impl IntoIterator<Item = &'a StatLeaf>) -> StatLeaf {
    let sum = leaves
        .into_iter()
        .fold(StatLeaf::default(), |acc, leaf| acc.merged(leaf));
    annotate_leaf(&sum)
}
