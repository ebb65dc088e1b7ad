//! Stat key classification.
//!
//! Upstream keys such as `br_kills_gamepad_m0_playlist_nobuildbr_duo` embed
//! every taxonomy dimension as a substring. Classification is driven by
//! ordered marker tables held in [`Taxonomy`]; the first marker contained
//! in the key wins. A dimension with no matching marker is left as `None`
//! ("unknown") instead of rejecting the key.

use serde::{Deserialize, Serialize};

use crate::models::{
    BuildMode, CompMode, GameMode, InputType, Quadruple, StatKind, TeamSize,
};

/// A substring marker and the taxonomy value it signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker<T> {
    pub pattern: String,
    pub value: T,
}

impl<T> Marker<T> {
    pub fn new(pattern: impl Into<String>, value: T) -> Self {
        Self {
            pattern: pattern.into(),
            value,
        }
    }
}

/// A game mode / team size combination the upstream never offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsupportedBucket {
    pub game_mode: GameMode,
    pub team_size: TeamSize,
}

/// Marker vocabularies for every dimension.
///
/// Order inside each table is significant. Comp modes have no pubs entry:
/// pubs is what a key is when no other comp marker is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    pub zero_build: Vec<String>,
    pub game_modes: Vec<Marker<GameMode>>,
    pub comp_modes: Vec<Marker<CompMode>>,
    pub team_sizes: Vec<Marker<TeamSize>>,
    pub input_types: Vec<Marker<InputType>>,
    pub stat_kinds: Vec<Marker<StatKind>>,
    pub unsupported: Vec<UnsupportedBucket>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            zero_build: vec!["nobuild".to_string()],
            game_modes: vec![
                Marker::new("playlist_defaultsolo", GameMode::Regular),
                Marker::new("playlist_defaultduo", GameMode::Regular),
                Marker::new("playlist_trios", GameMode::Regular),
                Marker::new("playlist_defaultsquad", GameMode::Regular),
                Marker::new("playlist_nobuildbr_", GameMode::Regular),
                Marker::new("playlist_habanero", GameMode::Regular),
                Marker::new("playlist_bots_", GameMode::Regular),
                Marker::new("punchberry", GameMode::Reload),
                Marker::new("blastberry", GameMode::Reload),
            ],
            comp_modes: vec![
                Marker::new("habanero", CompMode::Ranked),
                Marker::new("bots", CompMode::Bots),
            ],
            team_sizes: vec![
                Marker::new("solo", TeamSize::Solo),
                Marker::new("duo", TeamSize::Duo),
                Marker::new("trio", TeamSize::Trio),
                Marker::new("squad", TeamSize::Squad),
            ],
            input_types: vec![
                Marker::new("gamepad", InputType::Gamepad),
                Marker::new("keyboardmouse", InputType::KeyboardMouse),
            ],
            stat_kinds: vec![
                Marker::new("br_matchesplayed_", StatKind::Matches),
                Marker::new("br_kills_", StatKind::Kills),
                Marker::new("br_placetop1_", StatKind::Wins),
                Marker::new("br_placetop3_", StatKind::Top3),
                Marker::new("br_placetop5_", StatKind::Top5),
                Marker::new("br_placetop6_", StatKind::Top6),
                Marker::new("br_placetop10_", StatKind::Top10),
                Marker::new("br_placetop12_", StatKind::Top12),
                Marker::new("br_placetop25_", StatKind::Top25),
                Marker::new("br_minutesplayed_", StatKind::Minutes),
                Marker::new("br_lastmodified_", StatKind::LastModified),
            ],
            unsupported: vec![UnsupportedBucket {
                game_mode: GameMode::Reload,
                team_size: TeamSize::Trio,
            }],
        }
    }
}

/// Every dimension of one key. `None` means the dimension is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub build_mode: BuildMode,
    pub game_mode: Option<GameMode>,
    pub comp_mode: CompMode,
    pub team_size: Option<TeamSize>,
    pub input_type: Option<InputType>,
    pub stat_kind: Option<StatKind>,
}

impl Classification {
    /// The reporting bucket, when both game mode and team size are known.
    pub fn quadruple(&self) -> Option<Quadruple> {
        Some(Quadruple::new(
            self.build_mode,
            self.game_mode?,
            self.comp_mode,
            self.team_size?,
        ))
    }
}

/// Maps stat keys onto the taxonomy using a fixed [`Taxonomy`].
#[derive(Debug, Clone, Default)]
pub struct KeyClassifier {
    taxonomy: Taxonomy,
}

impl KeyClassifier {
    /// Create a classifier. Markers are matched case-insensitively.
    pub fn new(mut taxonomy: Taxonomy) -> Self {
        for pattern in &mut taxonomy.zero_build {
            pattern.make_ascii_lowercase();
        }
        lowercase(&mut taxonomy.game_modes);
        lowercase(&mut taxonomy.comp_modes);
        lowercase(&mut taxonomy.team_sizes);
        lowercase(&mut taxonomy.input_types);
        lowercase(&mut taxonomy.stat_kinds);
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Classify every dimension of `key`. Total: never fails.
    pub fn classify(&self, key: &str) -> Classification {
        let key = key.to_ascii_lowercase();
        let t = &self.taxonomy;

        let build_mode = if t.zero_build.iter().any(|m| key.contains(m.as_str())) {
            BuildMode::ZeroBuild
        } else {
            BuildMode::Build
        };

        Classification {
            build_mode,
            game_mode: first_match(&t.game_modes, &key),
            comp_mode: first_match(&t.comp_modes, &key).unwrap_or(CompMode::Pubs),
            team_size: first_match(&t.team_sizes, &key),
            input_type: first_match(&t.input_types, &key),
            stat_kind: first_match(&t.stat_kinds, &key),
        }
    }

    /// Only the stat kind of `key`.
    pub fn stat_kind(&self, key: &str) -> Option<StatKind> {
        first_match(&self.taxonomy.stat_kinds, &key.to_ascii_lowercase())
    }

    /// Whether the upstream offers this game mode at this team size.
    pub fn supports(&self, game_mode: GameMode, team_size: TeamSize) -> bool {
        !self
            .taxonomy
            .unsupported
            .iter()
            .any(|u| u.game_mode == game_mode && u.team_size == team_size)
    }
}

fn lowercase<T>(markers: &mut [Marker<T>]) {
    for marker in markers {
        marker.pattern.make_ascii_lowercase();
    }
}

fn first_match<T: Copy>(markers: &[Marker<T>], key: &str) -> Option<T> {
    markers
        .iter()
        .find(|m| key.contains(m.pattern.as_str()))
        .map(|m| m.value)
}
