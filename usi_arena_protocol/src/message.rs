// Protocol messages for client-server communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by engine clients and viewers to the server.
// - `ServerMessage`: sent by the server to engine clients and viewers.
//
// Engine clients use `Usi`, `Readyok` and `Bestmove`; viewers use `Watch`;
// `Matching`, `Download` and `Tournament` are queries answered only to the
// asking connection. All types derive `Serialize`/`Deserialize` for JSON
// framing (see `framing.rs`).
//
// The `Usi` seat request is deliberately lenient on the wire (both fields
// optional) and validated at the boundary by `SeatRequest::from_fields`, so
// a client that omits its name gets a clean `ProtocolViolation` instead of a
// deserialisation failure that would drop the connection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Position, SessionId, TimeControl};

/// Messages sent by a client to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Request a seat, announcing the engine's `id name` / `id author`.
    Usi {
        name: Option<String>,
        author: Option<String>,
    },
    /// The engine answered `isready`.
    Readyok,
    /// The engine's move (or `resign`).
    Bestmove { mv: String },
    /// Attach as a viewer of a session.
    Watch { session_id: SessionId },
    /// List all sessions.
    Matching,
    /// Fetch the CSA record of a session.
    Download { session_id: SessionId },
    /// List all tournaments.
    Tournament,
    /// Leaving gracefully.
    Goodbye,
}

/// Messages sent by the server to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    Error { message: String },
    Info { message: String },
    /// Forward `isready` to the engine and answer `Readyok`.
    Isready,
    Usinewgame,
    /// It is this engine's turn.
    NextMove {
        position: Position,
        time: TimeControl,
    },
    /// The game is over; shut the engine down and leave.
    Disconnect,
    /// The game is over but the tournament continues: restart the engine
    /// and request a seat again.
    RestartEngine,
    /// Snapshot for viewers.
    Display(DisplayInfo),
    /// Answer to `Matching`.
    Matching { games: Vec<MatchingEntry> },
    /// Answer to `Download`.
    Download { kif: String, filename: String },
    /// Answer to `Tournament`.
    Tournament { tournaments: Vec<TournamentEntry> },
}

/// What a viewer needs to render a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub svg: Option<String>,
    pub kif: Vec<String>,
    pub sente: String,
    pub gote: String,
    pub timelimit: TimeControl,
    pub side_to_move: u8,
    pub ongoing: bool,
    /// Termination reason, empty while the game is not over.
    pub gameover: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchingEntry {
    pub gameover: String,
    pub ongoing: bool,
    pub link: String,
    pub player1: String,
    pub player2: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TournamentEntry {
    pub player1: String,
    pub player2: String,
    pub player1_win: u32,
    pub player2_win: u32,
    /// One character per scheduled game: ` `, `*`, `+` or `-`.
    pub result: String,
}

/// A seat request with its required fields present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatRequest {
    pub name: String,
    pub author: String,
}

/// A message that is well-formed JSON but misses a required field.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("You send a request but name field is None.")]
    MissingName,
    #[error("You send a request but author field is None.")]
    MissingAuthor,
}

impl SeatRequest {
    /// Validate the optional wire fields of a `Usi` message.
    pub fn from_fields(
        name: Option<String>,
        author: Option<String>,
    ) -> Result<Self, ProtocolViolation> {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .ok_or(ProtocolViolation::MissingName)?;
        let author = author.ok_or(ProtocolViolation::MissingAuthor)?;
        Ok(Self { name, author })
    }
}
