// Core value types for the arena protocol.
//
// Lightweight newtypes and plain structs shared by `message.rs` and by both
// the server (`usi_arena_server`) and the engine client (`usi_arena_client`).
// Connection and session ids are compact server-assigned integers, not UUIDs.
//
// `Position` is the structured form of a USI position: a base SFEN plus the
// list of moves played from it. Ponder continuation and "what did the
// opponent just play" are list operations on it, never string inspection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned id of one network connection (engine client or viewer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Server-assigned id of one match session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Side to move. `Black` (sente) moves first from the standard start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Black,
    White,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::Black, Color::White];

    /// Seat index: 0 for Black, 1 for White.
    pub fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        if index % 2 == 0 {
            Color::Black
        } else {
            Color::White
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// CSA move prefix (`+` for Black, `-` for White).
    pub fn csa_mark(self) -> char {
        match self {
            Color::Black => '+',
            Color::White => '-',
        }
    }
}

/// A base SFEN plus the moves played from it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub sfen: String,
    pub moves: Vec<String>,
}

impl Position {
    pub fn new(sfen: impl Into<String>) -> Self {
        Self {
            sfen: sfen.into(),
            moves: Vec::new(),
        }
    }

    /// The most recent move, i.e. what the side to move is answering.
    pub fn last_move(&self) -> Option<&str> {
        self.moves.last().map(String::as_str)
    }

    /// A copy of this position with `extra` moves appended.
    pub fn extended<'a>(&self, extra: impl IntoIterator<Item = &'a str>) -> Self {
        let mut next = self.clone();
        next.moves.extend(extra.into_iter().map(str::to_owned));
        next
    }

    /// Render as the argument of a USI `position` command:
    /// `sfen <sfen> [moves <m1> <m2> ...]`.
    pub fn to_usi(&self) -> String {
        let mut out = format!("sfen {}", self.sfen);
        if !self.moves.is_empty() {
            out.push_str(" moves");
            for mv in &self.moves {
                out.push(' ');
                out.push_str(mv);
            }
        }
        out
    }
}

/// Clock state handed to an engine (`go`) and to viewers. All values in ms.
///
/// A match uses either byoyomi (increments zero) or increments (byoyomi
/// zero); both fields always exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeControl {
    pub btime: u64,
    pub wtime: u64,
    pub byoyomi: u64,
    pub binc: u64,
    pub winc: u64,
}

impl TimeControl {
    pub fn uses_increment(&self) -> bool {
        self.binc > 0 || self.winc > 0
    }

    /// The time fields of a USI `go` command, without the `go` keyword.
    pub fn to_go_fields(&self) -> String {
        if self.uses_increment() {
            format!(
                "btime {} wtime {} binc {} winc {}",
                self.btime, self.wtime, self.binc, self.winc
            )
        } else {
            format!(
                "btime {} wtime {} byoyomi {}",
                self.btime, self.wtime, self.byoyomi
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_without_history() {
        let pos = Position::new("rbsgk/4p/5/P4/KGSBR b - 1");
        assert_eq!(pos.to_usi(), "sfen rbsgk/4p/5/P4/KGSBR b - 1");
        assert_eq!(pos.last_move(), None);
    }

    #[test]
    fn extended_appends_moves_keyword_once() {
        let pos = Position::new("rbsgk/4p/5/P4/KGSBR b - 1");
        let once = pos.extended(["5e4d"]);
        let twice = once.extended(["1a2b", "4d3c"]);
        assert_eq!(
            twice.to_usi(),
            "sfen rbsgk/4p/5/P4/KGSBR b - 1 moves 5e4d 1a2b 4d3c"
        );
        assert_eq!(twice.last_move(), Some("4d3c"));
        // The original is untouched.
        assert!(pos.moves.is_empty());
    }

    #[test]
    fn go_fields_pick_byoyomi_or_increment() {
        let byoyomi = TimeControl {
            btime: 60_000,
            wtime: 50_000,
            byoyomi: 5_000,
            binc: 0,
            winc: 0,
        };
        assert_eq!(
            byoyomi.to_go_fields(),
            "btime 60000 wtime 50000 byoyomi 5000"
        );

        let fischer = TimeControl {
            byoyomi: 0,
            binc: 2_000,
            winc: 2_000,
            ..byoyomi
        };
        assert_eq!(
            fischer.to_go_fields(),
            "btime 60000 wtime 50000 binc 2000 winc 2000"
        );
    }

    #[test]
    fn color_helpers() {
        assert_eq!(Color::Black.opponent(), Color::White);
        assert_eq!(Color::from_index(3), Color::White);
        assert_eq!(Color::White.index(), 1);
        assert_eq!(Color::White.csa_mark(), '-');
    }
}
