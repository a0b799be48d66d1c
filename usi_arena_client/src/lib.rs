// usi_arena_client: connects a local USI engine to the match arena.
//
// The client starts an engine as a child process, speaks USI to it over its
// stdin/stdout, and relays between the engine and the arena server: seat
// requests, the readiness handshake, positions to search, and best moves
// back. It can ponder on the engine's predicted reply.
//
// Module overview:
// - `usi.rs`:    USI line parsing and command formatting.
// - `engine.rs`: `EngineBridge`, the child process, its reader thread and
//                the ponder state machine.
// - `net.rs`:    `NetClient`, the framed TCP connection to the server.
// - `runner.rs`: The event loop joining the two.
// - `config.rs`: JSON client configuration.
// - `error.rs`:  Error types.
//
// The `arena-client` binary (`main.rs`) wraps `runner::run` with a CLI.

pub mod config;
pub mod engine;
pub mod error;
pub mod net;
pub mod runner;
pub mod usi;

pub use config::ClientConfig;
pub use engine::{EngineBridge, PonderState};
pub use error::{BridgeError, ClientError, ConfigError};
pub use net::NetClient;
pub use runner::{RunOutcome, run};
