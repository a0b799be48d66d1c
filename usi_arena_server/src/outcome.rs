// How a game ended.

use std::fmt;

use serde::{Deserialize, Serialize};
use usi_arena_protocol::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameOverReason {
    Resign,
    IllegalMove,
    TimeUp,
    Sennichite,
    Disconnect,
}

impl GameOverReason {
    /// Name shown to viewers and written to JSON records.
    pub fn as_str(self) -> &'static str {
        match self {
            GameOverReason::Resign => "RESIGN",
            GameOverReason::IllegalMove => "ILLEGAL_MOVE",
            GameOverReason::TimeUp => "TIME_UP",
            GameOverReason::Sennichite => "SENNICHITE",
            GameOverReason::Disconnect => "DISCONNECT",
        }
    }

    /// Special-move token used after `%` in CSA records.
    pub fn csa_token(self) -> &'static str {
        match self {
            GameOverReason::Resign => "TORYO",
            GameOverReason::IllegalMove => "ILLEGAL_MOVE",
            GameOverReason::TimeUp => "TIME_UP",
            GameOverReason::Sennichite => "SENNICHITE",
            GameOverReason::Disconnect => "CHUDAN",
        }
    }
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a session. `winner` is `None` for a draw or for a
/// game that never started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameResult {
    pub reason: GameOverReason,
    pub winner: Option<Color>,
}
