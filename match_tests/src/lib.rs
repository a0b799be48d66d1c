// Helpers for end-to-end match tests.
//
// Starts a real arena server (with the scripted mock board) and runs real
// arena clients on background threads, each driving a real child process:
// the `mock_engine` binary built from this crate. The only test-specific
// code is here: starting things, waiting for them, and inspecting the games
// directory afterwards.
//
// Integration tests locate the engine binary through
// `env!("CARGO_BIN_EXE_mock_engine")` and pass it in; that variable is only
// defined when compiling tests.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use usi_arena_client::{ClientConfig, ClientError, RunOutcome};
use usi_arena_server::board::mock::MockBoardFactory;
use usi_arena_server::{ServerConfig, ServerHandle, TournamentConfig, start_server};

/// Server config for tests: OS-assigned port, records under `games_dir`.
pub fn arena_config(games_dir: &Path, tournament: Option<TournamentConfig>) -> ServerConfig {
    ServerConfig {
        port: 0,
        games_dir: games_dir.to_path_buf(),
        tournament,
        ..ServerConfig::default()
    }
}

pub fn start_arena(config: ServerConfig) -> (ServerHandle, SocketAddr) {
    start_server(config, Arc::new(MockBoardFactory::default())).expect("server failed to start")
}

/// Client config running the mock engine as `name` with extra flags.
pub fn mock_engine(binary: &str, name: &str, flags: &[&str]) -> ClientConfig {
    let mut args = vec!["--name".to_owned(), name.to_owned()];
    args.extend(flags.iter().map(|f| (*f).to_owned()));
    ClientConfig::for_program(binary, args)
}

/// Run a client to completion on its own thread.
pub fn spawn_client(
    config: ClientConfig,
    addr: SocketAddr,
) -> JoinHandle<Result<RunOutcome, ClientError>> {
    thread::spawn(move || usi_arena_client::run(&config, &addr.to_string()))
}

/// Files in `dir` whose names end with `suffix`, sorted.
pub fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .is_some_and(|n| n.to_string_lossy().ends_with(suffix))
                })
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

/// Number of plies recorded in a CSA game record.
pub fn csa_plies(csa: &str) -> usize {
    csa.lines()
        .filter(|l| l.starts_with('T') && l[1..].chars().all(|c| c.is_ascii_digit()))
        .count()
}
