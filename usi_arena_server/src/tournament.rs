// Tournament bookkeeping for one pairing of engines.
//
// A tournament is created by the first engine name that finds no tournament
// to join, and completed by the first different name that comes looking. It
// has a fixed number of games; each game has a slot in the outcome string:
//
//   ' '  unscheduled     '*'  in progress
//   '+'  first seat (Black) won     '-'  second seat (White) won
//
// The outcome string never changes length. A game that ends without a
// winner (draw, or abandoned before it started) goes back to ' ' and is
// replayed. When no ' ' or '*' is left, the summary is produced exactly
// once (`take_summary`) and the tournament is frozen.
//
// Sessions themselves live in the registry; a tournament only remembers
// which session id plays which slot. See `registry.rs` for how engines are
// matched to tournaments and sessions.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use usi_arena_protocol::{Color, SessionId, TournamentEntry};

use crate::outcome::GameOverReason;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Unscheduled,
    InProgress,
    FirstSeatWin,
    SecondSeatWin,
}

impl Outcome {
    pub fn as_char(self) -> char {
        match self {
            Outcome::Unscheduled => ' ',
            Outcome::InProgress => '*',
            Outcome::FirstSeatWin => '+',
            Outcome::SecondSeatWin => '-',
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Outcome::FirstSeatWin | Outcome::SecondSeatWin)
    }
}

#[derive(Debug)]
pub struct Tournament {
    pub id: usize,
    players: Vec<String>,
    outcomes: Vec<Outcome>,
    sessions: Vec<Option<SessionId>>,
    reasons: Vec<Option<GameOverReason>>,
    wins: BTreeMap<String, u32>,
    persisted: bool,
}

impl Tournament {
    pub fn new(id: usize, first_player: impl Into<String>, games: usize) -> Self {
        let first_player = first_player.into();
        let mut wins = BTreeMap::new();
        wins.insert(first_player.clone(), 0);
        Self {
            id,
            players: vec![first_player],
            outcomes: vec![Outcome::Unscheduled; games],
            sessions: vec![None; games],
            reasons: vec![None; games],
            wins,
            persisted: false,
        }
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.players.iter().any(|p| p == name)
    }

    /// Still waiting for its second engine.
    pub fn is_open(&self) -> bool {
        self.players.len() < 2
    }

    /// Add the second engine. Returns false if full or `name` already plays.
    pub fn join(&mut self, name: &str) -> bool {
        if !self.is_open() || self.has_player(name) {
            return false;
        }
        self.players.push(name.to_owned());
        self.wins.insert(name.to_owned(), 0);
        true
    }

    pub fn games(&self) -> usize {
        self.outcomes.len()
    }

    pub fn outcome(&self, slot: usize) -> Option<Outcome> {
        self.outcomes.get(slot).copied()
    }

    pub fn outcome_string(&self) -> String {
        self.outcomes.iter().map(|o| o.as_char()).collect()
    }

    /// Every game has a winner.
    pub fn is_resolved(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_resolved())
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn wins(&self, name: &str) -> u32 {
        self.wins.get(name).copied().unwrap_or(0)
    }

    /// Sessions currently attached to in-progress slots.
    pub fn live_sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.outcomes
            .iter()
            .zip(&self.sessions)
            .filter(|(o, _)| **o == Outcome::InProgress)
            .filter_map(|(_, s)| *s)
    }

    /// Claim the lowest unscheduled slot for a new session.
    pub fn allocate_slot(&mut self) -> Option<usize> {
        if self.persisted {
            return None;
        }
        let slot = self
            .outcomes
            .iter()
            .position(|o| *o == Outcome::Unscheduled)?;
        self.outcomes[slot] = Outcome::InProgress;
        Some(slot)
    }

    pub fn attach_session(&mut self, slot: usize, session: SessionId) {
        if let Some(entry) = self.sessions.get_mut(slot) {
            *entry = Some(session);
        }
    }

    /// Index into the starting-position rotation for `slot`.
    pub fn position_index(slot: usize, swap_colors: bool, rotation_len: usize) -> usize {
        let round = if swap_colors { slot / 2 } else { slot };
        round % rotation_len.max(1)
    }

    /// Colour `name` must take in `slot` when colours swap every game: the
    /// first player is Black on even slots and White on odd ones.
    pub fn swapped_color(&self, slot: usize, name: &str) -> Option<Color> {
        let player = self.players.iter().position(|p| p == name)?;
        Some(Color::from_index(player + slot))
    }

    /// Record a finished game. A winner resolves the slot; no winner puts
    /// the slot back up for replay. Ignored once frozen or if the slot is
    /// not in progress.
    pub fn record_result(
        &mut self,
        slot: usize,
        winner: Option<(Color, &str)>,
        reason: GameOverReason,
    ) {
        if self.persisted || self.outcome(slot) != Some(Outcome::InProgress) {
            return;
        }
        match winner {
            Some((color, name)) => {
                self.outcomes[slot] = match color {
                    Color::Black => Outcome::FirstSeatWin,
                    Color::White => Outcome::SecondSeatWin,
                };
                self.reasons[slot] = Some(reason);
                *self.wins.entry(name.to_owned()).or_insert(0) += 1;
            }
            None => self.release_slot(slot),
        }
    }

    /// Put an in-progress slot back up for scheduling.
    pub fn release_slot(&mut self, slot: usize) {
        if self.persisted || self.outcome(slot) != Some(Outcome::InProgress) {
            return;
        }
        self.outcomes[slot] = Outcome::Unscheduled;
        self.sessions[slot] = None;
        self.reasons[slot] = None;
    }

    /// The summary text, the first time it is asked for after every game
    /// is resolved; `None` before that and ever after.
    pub fn take_summary(&mut self) -> Option<String> {
        if self.persisted || !self.is_resolved() {
            return None;
        }
        self.persisted = true;
        Some(self.summary())
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        for name in &self.players {
            let _ = writeln!(out, "{name}: {} wins", self.wins(name));
        }
        let _ = writeln!(out, "result: [{}]", self.outcome_string());
        for (slot, (outcome, reason)) in self.outcomes.iter().zip(&self.reasons).enumerate() {
            let reason = reason.map_or("-", GameOverReason::as_str);
            let _ = writeln!(out, "game {}: {} {reason}", slot + 1, outcome.as_char());
        }
        out
    }

    pub fn entry(&self) -> TournamentEntry {
        let player1 = self.players.first().cloned().unwrap_or_default();
        let player2 = self.players.get(1).cloned().unwrap_or_default();
        TournamentEntry {
            player1_win: self.wins(&player1),
            player2_win: self.wins(&player2),
            player1,
            player2,
            result: self.outcome_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairing(games: usize) -> Tournament {
        let mut t = Tournament::new(0, "Alpha", games);
        assert!(t.join("Beta"));
        t
    }

    #[test]
    fn join_requires_a_new_name_and_room() {
        let mut t = Tournament::new(0, "Alpha", 2);
        assert!(t.is_open());
        assert!(!t.join("Alpha"));
        assert!(t.join("Beta"));
        assert!(!t.is_open());
        assert!(!t.join("Gamma"));
    }

    #[test]
    fn slots_are_allocated_lowest_first() {
        let mut t = pairing(3);
        assert_eq!(t.allocate_slot(), Some(0));
        assert_eq!(t.allocate_slot(), Some(1));
        assert_eq!(t.outcome_string(), "** ");
        t.record_result(0, None, GameOverReason::Sennichite);
        assert_eq!(t.allocate_slot(), Some(0));
        assert_eq!(t.allocate_slot(), Some(2));
        assert_eq!(t.allocate_slot(), None);
    }

    #[test]
    fn outcome_length_is_fixed() {
        let mut t = pairing(4);
        while let Some(slot) = t.allocate_slot() {
            assert_eq!(t.outcome_string().len(), 4);
            t.record_result(slot, Some((Color::Black, "Alpha")), GameOverReason::Resign);
        }
        assert_eq!(t.outcome_string(), "++++");
        assert_eq!(t.games(), 4);
    }

    #[test]
    fn results_count_wins_by_name() {
        let mut t = pairing(2);
        let s0 = t.allocate_slot().unwrap();
        let s1 = t.allocate_slot().unwrap();
        t.record_result(s0, Some((Color::Black, "Alpha")), GameOverReason::Resign);
        t.record_result(s1, Some((Color::Black, "Beta")), GameOverReason::TimeUp);
        assert_eq!(t.outcome_string(), "++");
        assert_eq!(t.wins("Alpha"), 1);
        assert_eq!(t.wins("Beta"), 1);
        let entry = t.entry();
        assert_eq!(entry.player1, "Alpha");
        assert_eq!(entry.player2_win, 1);
    }

    #[test]
    fn summary_is_taken_exactly_once_after_resolution() {
        let mut t = pairing(2);
        let s0 = t.allocate_slot().unwrap();
        t.record_result(s0, Some((Color::White, "Beta")), GameOverReason::IllegalMove);
        assert_eq!(t.take_summary(), None);

        let s1 = t.allocate_slot().unwrap();
        assert_eq!(t.take_summary(), None);
        t.record_result(s1, Some((Color::Black, "Beta")), GameOverReason::Resign);

        let summary = t.take_summary().unwrap();
        assert!(summary.contains("Beta: 2 wins"));
        assert!(summary.contains("result: [-+]"));
        assert!(summary.contains("game 1: - ILLEGAL_MOVE"));
        assert_eq!(t.take_summary(), None);
        assert!(t.is_persisted());

        // Frozen afterwards.
        t.record_result(s1, None, GameOverReason::Disconnect);
        assert_eq!(t.outcome_string(), "-+");
        assert_eq!(t.allocate_slot(), None);
    }

    #[test]
    fn results_for_unscheduled_slots_are_ignored() {
        let mut t = pairing(2);
        t.record_result(1, Some((Color::Black, "Alpha")), GameOverReason::Resign);
        assert_eq!(t.outcome_string(), "  ");
        assert_eq!(t.wins("Alpha"), 0);
    }

    #[test]
    fn swapped_colors_alternate_by_slot() {
        let t = pairing(4);
        assert_eq!(t.swapped_color(0, "Alpha"), Some(Color::Black));
        assert_eq!(t.swapped_color(0, "Beta"), Some(Color::White));
        assert_eq!(t.swapped_color(1, "Alpha"), Some(Color::White));
        assert_eq!(t.swapped_color(3, "Beta"), Some(Color::Black));
        assert_eq!(t.swapped_color(0, "Gamma"), None);
    }

    #[test]
    fn positions_repeat_for_both_colors_when_swapping() {
        let indices: Vec<usize> = (0..6)
            .map(|slot| Tournament::position_index(slot, true, 2))
            .collect();
        assert_eq!(indices, vec![0, 0, 1, 1, 0, 0]);
        assert_eq!(Tournament::position_index(5, false, 3), 2);
    }
}
