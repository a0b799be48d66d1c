// Game record accumulation and serialization.
//
// `KifRecorder` keeps the seats' names, the starting SFEN and one
// `MoveRecord` per ply (move token + think time). It is appended to only by
// the session, strictly in ply order, right after the board accepts a move,
// so `len()` always equals the board's ply count.
//
// Two output grammars:
// - CSA v2.2 text: version line, `N+`/`N-` names, the fixed five-line
//   diagram of the 5x5 starting array, then `±<move>` and `T<ms>` per ply,
//   closed by `%<reason>`.
// - JSON: names, start position, full position (start + moves), reason or
//   the "on going" sentinel, and the tournament slot.

use serde::Serialize;
use usi_arena_protocol::{Color, Position};

use crate::outcome::GameOverReason;

/// Board diagram of the fixed starting array, one `P` line per rank.
pub const CSA_START_DIAGRAM: [&str; 5] = [
    "P1-HI-KA-GI-KI-OU",
    "P2 *  *  *  * -FU",
    "P3 *  *  *  *  * ",
    "P4+FU *  *  *  * ",
    "P5+OU+KI+GI+KA+HI",
];

/// `gameover` value of a record whose game has not ended.
pub const ONGOING: &str = "on going";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub ply: usize,
    pub mv: String,
    pub elapsed_ms: u64,
}

#[derive(Clone, Debug)]
pub struct KifRecorder {
    names: [String; 2],
    start_position: String,
    first_mover: Color,
    slot: Option<usize>,
    moves: Vec<MoveRecord>,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    sente: &'a str,
    gote: &'a str,
    start_position: &'a str,
    position: String,
    moves: Vec<&'a str>,
    times: Vec<u64>,
    gameover: &'a str,
    slot: Option<usize>,
}

impl KifRecorder {
    pub fn new(start_position: impl Into<String>, first_mover: Color, slot: Option<usize>) -> Self {
        Self {
            names: [String::new(), String::new()],
            start_position: start_position.into(),
            first_mover,
            slot,
            moves: Vec::new(),
        }
    }

    pub fn set_name(&mut self, color: Color, name: impl Into<String>) {
        self.names[color.index()] = name.into();
    }

    pub fn name(&self, color: Color) -> &str {
        &self.names[color.index()]
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub fn push(&mut self, mv: impl Into<String>, elapsed_ms: u64) {
        self.moves.push(MoveRecord {
            ply: self.moves.len() + 1,
            mv: mv.into(),
            elapsed_ms,
        });
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    /// Think times in ply order; always as long as `moves()`.
    pub fn elapsed_times(&self) -> Vec<u64> {
        self.moves.iter().map(|m| m.elapsed_ms).collect()
    }

    /// Start position plus every recorded move.
    pub fn position(&self) -> Position {
        Position {
            sfen: self.start_position.clone(),
            moves: self.moves.iter().map(|m| m.mv.clone()).collect(),
        }
    }

    fn mover_of(&self, index: usize) -> Color {
        if index % 2 == 0 {
            self.first_mover
        } else {
            self.first_mover.opponent()
        }
    }

    /// One line per ply for viewers, e.g. `"3: +4d3c"`.
    pub fn display_lines(&self) -> Vec<String> {
        self.moves
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}: {}{}", m.ply, self.mover_of(i).csa_mark(), m.mv))
            .collect()
    }

    pub fn to_csa(&self, reason: Option<GameOverReason>) -> String {
        let mut lines = Vec::with_capacity(8 + self.moves.len() * 2 + 1);
        lines.push("V2.2".to_owned());
        lines.push(format!("N+{}", self.names[0]));
        lines.push(format!("N-{}", self.names[1]));
        lines.extend(CSA_START_DIAGRAM.iter().map(|l| (*l).to_owned()));
        for (i, m) in self.moves.iter().enumerate() {
            lines.push(format!("{}{}", self.mover_of(i).csa_mark(), m.mv));
            lines.push(format!("T{}", m.elapsed_ms));
        }
        if let Some(reason) = reason {
            lines.push(format!("%{}", reason.csa_token()));
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    pub fn to_json(&self, reason: Option<GameOverReason>) -> serde_json::Result<String> {
        let position = self.position();
        let record = JsonRecord {
            sente: &self.names[0],
            gote: &self.names[1],
            start_position: &self.start_position,
            position: position.to_usi(),
            moves: self.moves.iter().map(|m| m.mv.as_str()).collect(),
            times: self.elapsed_times(),
            gameover: reason.map_or(ONGOING, GameOverReason::as_str),
            slot: self.slot,
        };
        serde_json::to_string_pretty(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rbsgk/4p/5/P4/KGSBR b - 1";

    fn recorder() -> KifRecorder {
        let mut kif = KifRecorder::new(START, Color::Black, Some(3));
        kif.set_name(Color::Black, "Alpha");
        kif.set_name(Color::White, "Beta");
        kif.push("5e4d", 1_200);
        kif.push("1a2b", 800);
        kif
    }

    #[test]
    fn csa_layout() {
        let csa = recorder().to_csa(Some(GameOverReason::Resign));
        let lines: Vec<&str> = csa.lines().collect();
        assert_eq!(lines[0], "V2.2");
        assert_eq!(lines[1], "N+Alpha");
        assert_eq!(lines[2], "N-Beta");
        assert_eq!(&lines[3..8], &CSA_START_DIAGRAM);
        assert_eq!(&lines[8..12], &["+5e4d", "T1200", "-1a2b", "T800"]);
        assert_eq!(lines[12], "%TORYO");
        assert_eq!(lines.len(), 13);
    }

    #[test]
    fn csa_marks_follow_first_mover() {
        let mut kif = KifRecorder::new("rbsgk/4p/5/P4/KGSBR w - 1", Color::White, None);
        kif.push("1a2b", 5);
        let csa = kif.to_csa(None);
        assert!(csa.contains("\n-1a2b\nT5\n"));
        assert!(!csa.contains('%'));
        assert_eq!(kif.display_lines(), vec!["1: -1a2b".to_owned()]);
    }

    #[test]
    fn json_record_fields() {
        let kif = recorder();
        let value: serde_json::Value =
            serde_json::from_str(&kif.to_json(Some(GameOverReason::TimeUp)).unwrap()).unwrap();
        assert_eq!(value["sente"], "Alpha");
        assert_eq!(value["gote"], "Beta");
        assert_eq!(value["start_position"], START);
        assert_eq!(value["position"], format!("sfen {START} moves 5e4d 1a2b"));
        assert_eq!(value["gameover"], "TIME_UP");
        assert_eq!(value["slot"], 3);
        assert_eq!(value["times"], serde_json::json!([1200, 800]));
    }

    #[test]
    fn json_marks_unfinished_games() {
        let kif = KifRecorder::new(START, Color::Black, None);
        let value: serde_json::Value = serde_json::from_str(&kif.to_json(None).unwrap()).unwrap();
        assert_eq!(value["gameover"], ONGOING);
        assert!(value["slot"].is_null());
    }

    #[test]
    fn plies_are_numbered_in_order() {
        let kif = recorder();
        let plies: Vec<usize> = kif.moves().iter().map(|m| m.ply).collect();
        assert_eq!(plies, vec![1, 2]);
        assert_eq!(kif.len(), kif.elapsed_times().len());
    }
}
