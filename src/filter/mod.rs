//! Result filtering.
//!
//! Filter tokens carry no category tag: each one constrains whichever
//! taxonomy dimension its vocabulary belongs to. Two defaults apply before
//! any explicit narrowing:
//! - build mode: only `zeroBuild` unless build modes are named
//! - comp mode: never `bots` unless `bots` is named

use std::collections::BTreeSet;

use tracing::debug;

use crate::classify::Classification;
use crate::models::{BuildMode, CompMode, GameMode, Quadruple, StatTree, TeamSize};

/// Filter tokens sorted into their taxonomy dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub build_modes: BTreeSet<BuildMode>,
    pub game_modes: BTreeSet<GameMode>,
    pub comp_modes: BTreeSet<CompMode>,
    pub team_sizes: BTreeSet<TeamSize>,
}

impl FilterSet {
    /// Sort `tokens` by vocabulary. Tokens in no vocabulary are ignored.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut set = FilterSet::default();
        for token in tokens {
            let token = token.as_ref();
            if let Ok(v) = token.parse::<BuildMode>() {
                set.build_modes.insert(v);
            } else if let Ok(v) = token.parse::<GameMode>() {
                set.game_modes.insert(v);
            } else if let Ok(v) = token.parse::<CompMode>() {
                set.comp_modes.insert(v);
            } else if let Ok(v) = token.parse::<TeamSize>() {
                set.team_sizes.insert(v);
            } else {
                debug!(token, "Ignoring unrecognised filter token");
            }
        }
        set
    }

    /// True when `bots` has been named explicitly.
    pub fn includes_bots(&self) -> bool {
        self.comp_modes.contains(&CompMode::Bots)
    }

    /// Whether a bucket survives this filter, defaults included.
    pub fn admits(&self, quad: &Quadruple) -> bool {
        admits_build(&self.build_modes, quad.build_mode)
            && admits_comp(&self.comp_modes, quad.comp_mode)
            && allowlisted(&self.game_modes, quad.game_mode)
            && allowlisted(&self.team_sizes, quad.team_size)
    }

    /// Whether a classified raw key survives this filter.
    ///
    /// Keys missing a game mode or team size pass those dimensions only
    /// when they are unconstrained.
    pub fn admits_key(&self, class: &Classification) -> bool {
        admits_build(&self.build_modes, class.build_mode)
            && admits_comp(&self.comp_modes, class.comp_mode)
            && class
                .game_mode
                .map_or(self.game_modes.is_empty(), |g| allowlisted(&self.game_modes, g))
            && class
                .team_size
                .map_or(self.team_sizes.is_empty(), |t| allowlisted(&self.team_sizes, t))
    }
}

fn admits_build(allowed: &BTreeSet<BuildMode>, mode: BuildMode) -> bool {
    if allowed.is_empty() {
        mode != BuildMode::Build
    } else {
        allowed.contains(&mode)
    }
}

fn admits_comp(allowed: &BTreeSet<CompMode>, mode: CompMode) -> bool {
    if mode == CompMode::Bots && !allowed.contains(&CompMode::Bots) {
        return false;
    }
    allowlisted(allowed, mode)
}

fn allowlisted<T: Ord>(allowed: &BTreeSet<T>, value: T) -> bool {
    allowed.is_empty() || allowed.contains(&value)
}

/// New tree holding only the buckets `filters` admits.
pub fn filter(tree: &StatTree, filters: &FilterSet) -> StatTree {
    tree.retain(|quad| filters.admits(quad))
}

/// Parse `tokens` and filter `tree` with them.
pub fn filter_tokens<S: AsRef<str>>(tree: &StatTree, tokens: &[S]) -> StatTree {
    filter(tree, &FilterSet::parse(tokens))
}
