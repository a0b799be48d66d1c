// Server configuration.
//
// Loaded from a JSON file; every field has a default so a minimal file (or
// `{}`) is valid. Times are milliseconds. `positions` is the rotation of
// starting SFENs used by tournaments (standalone matches use the first one).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use usi_arena_protocol::TimeControl;

/// SFEN of the 5x5 starting array.
pub const DEFAULT_START_SFEN: &str = "rbsgk/4p/5/P4/KGSBR b - 1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("byoyomi and increment cannot both be non-zero")]
    MixedTimeControl,
    #[error("at least one starting position is required")]
    NoPositions,
    #[error("a tournament needs at least one game")]
    EmptyTournament,
}

/// Who is charged when a position repeats (without continuous check).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SennichiteRule {
    /// Nobody wins.
    #[default]
    Draw,
    /// The side whose move completed the repetition loses.
    MoverLoses,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TournamentConfig {
    /// Games per pairing; fixes the length of the outcome string.
    pub games: usize,
    /// Swap colours every game and advance the starting position every two
    /// games, so each position is played from both sides.
    #[serde(default)]
    pub swap_colors: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub btime: u64,
    pub wtime: u64,
    pub byoyomi: u64,
    pub binc: u64,
    pub winc: u64,
    pub games_dir: PathBuf,
    pub positions: Vec<String>,
    pub sennichite: SennichiteRule,
    pub tournament: Option<TournamentConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8000,
            btime: 600_000,
            wtime: 600_000,
            byoyomi: 10_000,
            binc: 0,
            winc: 0,
            games_dir: PathBuf::from("games"),
            positions: vec![DEFAULT_START_SFEN.into()],
            sennichite: SennichiteRule::Draw,
            tournament: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.byoyomi > 0 && (self.binc > 0 || self.winc > 0) {
            return Err(ConfigError::MixedTimeControl);
        }
        if self.positions.is_empty() {
            return Err(ConfigError::NoPositions);
        }
        if self.tournament.as_ref().is_some_and(|t| t.games == 0) {
            return Err(ConfigError::EmptyTournament);
        }
        Ok(())
    }

    /// Initial clocks of every game.
    pub fn time_control(&self) -> TimeControl {
        TimeControl {
            btime: self.btime,
            wtime: self.wtime,
            byoyomi: self.byoyomi,
            binc: self.binc,
            winc: self.winc,
        }
    }
}
