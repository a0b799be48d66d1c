// usi_arena_protocol: wire protocol between the match server and clients.
//
// This crate defines the message types, framing, and serialization used by
// the match server (`usi_arena_server`), the engine client
// (`usi_arena_client`) and viewers. It has no dependency on either side.
//
// Module overview:
// - `types.rs`:    Ids (`ConnectionId`, `SessionId`), `Color`, the structured
//                  `Position` and the `TimeControl` clock snapshot.
// - `message.rs`:  `ClientMessage` / `ServerMessage` enums, viewer and query
//                  payloads, and seat-request validation.
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream:
//                  4-byte big-endian length prefix, then JSON payload.
//
// Design decisions:
// - **JSON serialization.** Viewers and tooling can read it directly.
// - **No async runtime.** Blocking `std::io` streams on both sides; each
//   side runs one reader thread per stream.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{FrameError, MAX_MESSAGE_SIZE, read_frame, recv, send, write_frame};
pub use message::{
    ClientMessage, DisplayInfo, MatchingEntry, ProtocolViolation, SeatRequest, ServerMessage,
    TournamentEntry,
};
pub use types::{Color, ConnectionId, Position, SessionId, TimeControl};
