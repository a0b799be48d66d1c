// USI line grammar: the few engine responses the client reads and the
// commands it writes.
//
// Responses are matched on their first whitespace-separated token. Anything
// the client does not wait for (`info` lines, `option` declarations) is
// skipped by the caller.

use usi_arena_protocol::{Position, TimeControl};

/// Best-move tokens that end the game rather than name a move.
pub const RESIGN: &str = "resign";
pub const WIN: &str = "win";

/// Engine identity collected from `id` lines during the handshake.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineInfo {
    pub name: Option<String>,
    pub author: Option<String>,
}

impl EngineInfo {
    /// Record one `id <key> <value>` line; unknown keys are ignored.
    pub fn record(&mut self, key: &str, value: &str) {
        match key {
            "name" => self.name = Some(value.to_owned()),
            "author" => self.author = Some(value.to_owned()),
            _ => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BestMove {
    pub mv: String,
    pub ponder: Option<String>,
}

impl BestMove {
    /// True for `resign` and `win`, after which there is nothing to ponder.
    pub fn ends_game(&self) -> bool {
        self.mv == RESIGN || self.mv == WIN
    }
}

pub fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// `id name Foo Engine` -> `("name", "Foo Engine")`.
pub fn parse_id(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim().strip_prefix("id")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let (key, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    Some((key, value.trim()))
}

/// `bestmove <mv> [ponder <mv>]`.
pub fn parse_bestmove(line: &str) -> Option<BestMove> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "bestmove" {
        return None;
    }
    let mv = tokens.next()?.to_owned();
    let ponder = match (tokens.next(), tokens.next()) {
        (Some("ponder"), Some(p)) => Some(p.to_owned()),
        _ => None,
    };
    Some(BestMove { mv, ponder })
}

pub fn position_command(position: &Position) -> String {
    format!("position {}", position.to_usi())
}

pub fn go_command(time: &TimeControl) -> String {
    format!("go {}", time.to_go_fields())
}

pub fn go_ponder_command(time: &TimeControl) -> String {
    format!("go ponder {}", time.to_go_fields())
}

pub fn setoption_command(name: &str, value: &str) -> String {
    format!("setoption name {name} value {value}")
}
