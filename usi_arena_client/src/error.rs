// Error types for the engine client.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use usi_arena_protocol::FrameError;

/// Failures talking to the local engine process.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The engine's output closed: it exited or crashed. Every wait on the
    /// engine fails with this from then on.
    #[error("engine process terminated")]
    EngineTerminated,
    #[error("cannot start engine `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("engine I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("engine protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config has an empty engine command")]
    EmptyCommand,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("network error: {0}")]
    Frame(#[from] FrameError),
    #[error("cannot connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("server closed the connection")]
    ConnectionClosed,
    #[error("server reported an error: {0}")]
    Server(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
