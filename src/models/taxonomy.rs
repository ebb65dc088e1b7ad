//! Reporting taxonomy: the dimensions a stat key is bucketed by.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A token did not name any value of the requested taxonomy dimension.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {dimension} '{token}'")]
pub struct ParseTaxonomyError {
    pub dimension: &'static str,
    pub token: String,
}

macro_rules! taxonomy_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $dimension:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in report order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical report name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseTaxonomyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| ParseTaxonomyError {
                        dimension: $dimension,
                        token: s.to_string(),
                    })
            }
        }
    };
}

taxonomy_enum! {
    /// Whether building mechanics are enabled.
    BuildMode, "build mode" {
        ZeroBuild => "zeroBuild",
        Build => "build",
    }
}

taxonomy_enum! {
    /// Playlist family.
    GameMode, "game mode" {
        Regular => "regular",
        Reload => "reload",
    }
}

taxonomy_enum! {
    /// Competitive context.
    CompMode, "comp mode" {
        Pubs => "pubs",
        Ranked => "ranked",
        /// Practice matches against bots.
        Bots => "bots",
    }
}

taxonomy_enum! {
    TeamSize, "team size" {
        Solo => "solo",
        Duo => "duo",
        Trio => "trio",
        Squad => "squad",
    }
}

taxonomy_enum! {
    /// Input device a counter was recorded with.
    InputType, "input type" {
        Gamepad => "gamepad",
        KeyboardMouse => "keyboardmouse",
    }
}

taxonomy_enum! {
    /// What a counter measures.
    StatKind, "stat kind" {
        Matches => "matches",
        Kills => "kills",
        /// First place finishes.
        Wins => "wins",
        Top3 => "top3",
        Top5 => "top5",
        Top6 => "top6",
        Top10 => "top10",
        Top12 => "top12",
        Top25 => "top25",
        Minutes => "minutes",
        /// Epoch seconds of the latest update, not a count.
        LastModified => "lastModified",
    }
}

impl StatKind {
    /// Placement counters that get a per-match rate.
    pub const PLACEMENTS: &'static [StatKind] = &[
        StatKind::Top3,
        StatKind::Top5,
        StatKind::Top6,
        StatKind::Top10,
        StatKind::Top12,
        StatKind::Top25,
    ];

    /// True for kinds that accumulate and can be differenced.
    pub fn is_counter(&self) -> bool {
        !matches!(self, StatKind::LastModified)
    }
}

/// One reporting bucket: (build mode, game mode, comp mode, team size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quadruple {
    pub build_mode: BuildMode,
    pub game_mode: GameMode,
    pub comp_mode: CompMode,
    pub team_size: TeamSize,
}

impl Quadruple {
    pub fn new(
        build_mode: BuildMode,
        game_mode: GameMode,
        comp_mode: CompMode,
        team_size: TeamSize,
    ) -> Self {
        Self {
            build_mode,
            game_mode,
            comp_mode,
            team_size,
        }
    }

    /// Every combination of the fixed taxonomy, in report order.
    pub fn all() -> impl Iterator<Item = Quadruple> {
        BuildMode::ALL.iter().flat_map(|&b| {
            GameMode::ALL.iter().flat_map(move |&g| {
                CompMode::ALL.iter().flat_map(move |&c| {
                    TeamSize::ALL
                        .iter()
                        .map(move |&t| Quadruple::new(b, g, c, t))
                })
            })
        })
    }
}

impl fmt::Display for Quadruple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.build_mode, self.game_mode, self.comp_mode, self.team_size
        )
    }
}
