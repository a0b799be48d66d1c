// Board-logic collaborator seam.
//
// The referee never interprets game rules itself. Everything about legal
// moves, repetition and position encoding comes from an implementation of
// `Board`, created per session by a `BoardFactory`. A move the board does
// not list as legal is an illegal move, full stop.
//
// `mock` (test builds, or the `testing` feature) provides `MockBoard`, a
// scripted stand-in: it accepts a fixed set of move strings and reports a
// scripted repetition verdict for chosen moves. It is a test collaborator,
// not a rules engine.

use std::collections::BTreeSet;

use thiserror::Error;
use usi_arena_protocol::Color;

/// Repetition verdict after the last applied move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repetition {
    None,
    /// Fourfold repetition (sennichite).
    Plain,
    /// Repetition reached through continuous checks; the checking side loses.
    ByCheck,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("invalid position: {0}")]
    InvalidPosition(String),
}

/// One game's board, owned by exactly one session.
pub trait Board: Send {
    /// Reset to `sfen` with an empty move history.
    fn set_position(&mut self, sfen: &str) -> Result<(), BoardError>;

    fn legal_moves(&self) -> BTreeSet<String>;

    /// Apply a move previously found in `legal_moves`.
    fn apply_move(&mut self, mv: &str);

    fn repetition(&self) -> Repetition;

    fn side_to_move(&self) -> Color;

    /// Moves applied since the last `set_position`.
    fn ply(&self) -> usize;

    /// SFEN of the current position.
    fn sfen(&self) -> String;

    /// Optional rendering for viewers.
    fn svg(&self) -> Option<String> {
        None
    }
}

pub trait BoardFactory: Send + Sync {
    fn new_board(&self) -> Box<dyn Board>;
}

/// Side to move encoded in an SFEN string (`b` = Black, `w` = White).
pub fn sfen_side_to_move(sfen: &str) -> Result<Color, BoardError> {
    match sfen.split_whitespace().nth(1) {
        Some("b") => Ok(Color::Black),
        Some("w") => Ok(Color::White),
        _ => Err(BoardError::InvalidPosition(sfen.to_owned())),
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod mock {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Arc;

    use usi_arena_protocol::Color;

    use super::{Board, BoardError, BoardFactory, Repetition, sfen_side_to_move};

    /// Moves the default factory accepts.
    pub const DEFAULT_MOVES: &[&str] = &[
        "5e4d", "1a2b", "4d3c", "2b3b", "3c2c", "3b4b", "2c1c", "4b5b", "1c2c", "5b4b",
    ];

    /// Scripted board: a fixed legal set, and a repetition verdict attached
    /// to particular move strings.
    pub struct MockBoard {
        start: String,
        first_mover: Color,
        moves: Vec<String>,
        legal: Arc<BTreeSet<String>>,
        verdicts: Arc<BTreeMap<String, Repetition>>,
    }

    impl Board for MockBoard {
        fn set_position(&mut self, sfen: &str) -> Result<(), BoardError> {
            self.first_mover = sfen_side_to_move(sfen)?;
            self.start = sfen.to_owned();
            self.moves.clear();
            Ok(())
        }

        fn legal_moves(&self) -> BTreeSet<String> {
            (*self.legal).clone()
        }

        fn apply_move(&mut self, mv: &str) {
            self.moves.push(mv.to_owned());
        }

        fn repetition(&self) -> Repetition {
            self.moves
                .last()
                .and_then(|mv| self.verdicts.get(mv))
                .copied()
                .unwrap_or(Repetition::None)
        }

        fn side_to_move(&self) -> Color {
            if self.moves.len() % 2 == 0 {
                self.first_mover
            } else {
                self.first_mover.opponent()
            }
        }

        fn ply(&self) -> usize {
            self.moves.len()
        }

        fn sfen(&self) -> String {
            if self.moves.is_empty() {
                self.start.clone()
            } else {
                format!("{} moves {}", self.start, self.moves.join(" "))
            }
        }
    }

    #[derive(Clone)]
    pub struct MockBoardFactory {
        legal: Arc<BTreeSet<String>>,
        verdicts: Arc<BTreeMap<String, Repetition>>,
    }

    impl Default for MockBoardFactory {
        fn default() -> Self {
            Self::new(DEFAULT_MOVES.iter().copied())
        }
    }

    impl MockBoardFactory {
        pub fn new<'a>(legal: impl IntoIterator<Item = &'a str>) -> Self {
            Self {
                legal: Arc::new(legal.into_iter().map(str::to_owned).collect()),
                verdicts: Arc::new(BTreeMap::new()),
            }
        }

        /// Make `mv` legal and report `verdict` right after it is played.
        pub fn with_verdict(mut self, mv: &str, verdict: Repetition) -> Self {
            Arc::make_mut(&mut self.legal).insert(mv.to_owned());
            Arc::make_mut(&mut self.verdicts).insert(mv.to_owned(), verdict);
            self
        }
    }

    impl BoardFactory for MockBoardFactory {
        fn new_board(&self) -> Box<dyn Board> {
            Box::new(MockBoard {
                start: String::new(),
                first_mover: Color::Black,
                moves: Vec::new(),
                legal: Arc::clone(&self.legal),
                verdicts: Arc::clone(&self.verdicts),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockBoardFactory;
    use super::*;

    #[test]
    fn side_to_move_from_sfen() {
        assert_eq!(
            sfen_side_to_move("rbsgk/4p/5/P4/KGSBR b - 1"),
            Ok(Color::Black)
        );
        assert_eq!(
            sfen_side_to_move("rbsgk/4p/5/P4/KGSBR w - 2"),
            Ok(Color::White)
        );
        assert!(sfen_side_to_move("garbage").is_err());
    }

    #[test]
    fn mock_board_alternates_and_reports_verdicts() {
        let factory = MockBoardFactory::default().with_verdict("9i9h", Repetition::Plain);
        let mut board = factory.new_board();
        board.set_position("rbsgk/4p/5/P4/KGSBR w - 1").unwrap();
        assert_eq!(board.side_to_move(), Color::White);
        assert!(board.legal_moves().contains("9i9h"));

        board.apply_move("5e4d");
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.repetition(), Repetition::None);

        board.apply_move("9i9h");
        assert_eq!(board.repetition(), Repetition::Plain);
        assert_eq!(board.ply(), 2);

        board.set_position("rbsgk/4p/5/P4/KGSBR b - 1").unwrap();
        assert_eq!(board.ply(), 0);
    }
}
