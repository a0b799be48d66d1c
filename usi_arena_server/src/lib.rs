// usi_arena_server: match referee and coordinator for the USI match arena.
//
// The server accepts TCP connections from engine clients (one per engine)
// and from viewers, seats engines into match sessions two at a time, relays
// positions and clocks to the side to move, judges every returned move, and
// writes a game record when a session ends. Optionally, engines are paired
// into fixed-length tournaments with colour swapping.
//
// Module overview:
// - `board.rs`:      The `Board` trait the referee consults for move
//                    legality and repetition, plus a scripted mock board.
// - `clock.rs`:      Per-side time accounting (byoyomi or increment).
// - `kif.rs`:        Move record of one game and its CSA/JSON renderings.
// - `outcome.rs`:    Game-over reasons and results.
// - `session.rs`:    `MatchSession`, the per-game state machine.
// - `tournament.rs`: Outcome string, slot allocation and win counts.
// - `registry.rs`:   Matchmaking, message routing and exit housekeeping.
// - `records.rs`:    Writing game and tournament records to disk.
// - `transport.rs`:  The `Outbox` seam between sessions and sockets.
// - `server.rs`:     TCP listener, reader threads, and the main event loop.
// - `config.rs`:     JSON server configuration.
//
// Dependencies: `usi_arena_protocol` (shared message types and framing).
// The rules of the game are not implemented here: embedders pass a
// `BoardFactory` to `start_server`.

pub mod board;
pub mod clock;
pub mod config;
pub mod kif;
pub mod outcome;
pub mod records;
pub mod registry;
pub mod server;
pub mod session;
pub mod tournament;
pub mod transport;

pub use board::{Board, BoardError, BoardFactory, Repetition};
pub use config::{ServerConfig, SennichiteRule, TournamentConfig};
pub use outcome::{GameOverReason, GameResult};
pub use server::{ServerHandle, start_server};
