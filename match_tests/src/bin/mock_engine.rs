// Scripted USI engine for end-to-end tests.
//
// Speaks enough USI for the arena client: the `usi` handshake, `isready`,
// `position`, `go`, `go ponder`, `ponderhit`, `stop` and `quit`. It does no
// search. The move it plays is looked up in a script by ply (the number of
// moves in the last `position` command), so two copies of this engine
// sharing one script play a fixed game against each other.
//
// Usage:
//   mock_engine [OPTIONS]
//     --name <NAME>        `id name` (default: mock)
//     --author <AUTHOR>    `id author` (default: tester)
//     --no-author          Omit `id author`
//     --moves <M1,M2,..>   Move script (default: the mock board's moves)
//     --resign-at <PLY>    Resign instead of moving at this ply or later
//     --ponder             Attach `ponder <next scripted move>` to bestmove
//     --ponder-miss        Predict a move the opponent will never play
//     --delay-ms <MS>      Sleep before answering `go`
//     --log <FILE>         Append every received line to FILE

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use usi_arena_server::board::mock::DEFAULT_MOVES;

const NEVER_PLAYED: &str = "9i9h";

struct Script {
    name: String,
    author: Option<String>,
    moves: Vec<String>,
    resign_at: usize,
    ponder: bool,
    ponder_miss: bool,
    delay: Duration,
    log: Option<PathBuf>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            name: "mock".into(),
            author: Some("tester".into()),
            moves: DEFAULT_MOVES.iter().map(|m| (*m).to_owned()).collect(),
            resign_at: usize::MAX,
            ponder: false,
            ponder_miss: false,
            delay: Duration::ZERO,
            log: None,
        }
    }
}

impl Script {
    /// `bestmove` line for the position with `ply` moves played.
    fn answer(&self, ply: usize) -> String {
        let Some(mv) = self.moves.get(ply).filter(|_| ply < self.resign_at) else {
            return "bestmove resign".into();
        };
        let predicted = if self.ponder_miss {
            Some(NEVER_PLAYED)
        } else {
            self.moves.get(ply + 1).map(String::as_str)
        };
        match predicted.filter(|_| self.ponder) {
            Some(p) => format!("bestmove {mv} ponder {p}"),
            None => format!("bestmove {mv}"),
        }
    }
}

fn main() {
    let script = parse_args();
    let mut log = script.log.as_deref().and_then(open_log);
    let stdin = io::stdin();
    let mut out = io::stdout().lock();

    let mut ply = 0;
    let mut pondering = false;
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if let Some(file) = log.as_mut() {
            let _ = writeln!(file, "{line}");
        }
        let mut tokens = line.split_whitespace();
        let reply = match tokens.next() {
            Some("usi") => {
                let mut lines = vec![format!("id name {}", script.name)];
                if let Some(author) = &script.author {
                    lines.push(format!("id author {author}"));
                }
                lines.push("option name USI_Hash type spin default 16 min 1 max 1024".into());
                lines.push("usiok".into());
                Some(lines.join("\n"))
            }
            Some("isready") => Some("readyok".into()),
            Some("position") => {
                ply = tokens.skip_while(|t| *t != "moves").skip(1).count();
                None
            }
            Some("go") => {
                if tokens.next() == Some("ponder") {
                    pondering = true;
                    None
                } else {
                    thread::sleep(script.delay);
                    Some(script.answer(ply))
                }
            }
            Some("ponderhit" | "stop") if pondering => {
                pondering = false;
                Some(script.answer(ply))
            }
            Some("quit") => break,
            _ => None,
        };
        let Some(reply) = reply else { continue };
        if writeln!(out, "{reply}").and_then(|()| out.flush()).is_err() {
            break;
        }
    }
}

fn open_log(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Parse command-line arguments into a `Script`. Uses simple
/// `std::env::args()` matching.
fn parse_args() -> Script {
    let mut script = Script::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--name" => {
                i += 1;
                script.name = value(&args, i, "--name");
            }
            "--author" => {
                i += 1;
                script.author = Some(value(&args, i, "--author"));
            }
            "--no-author" => script.author = None,
            "--moves" => {
                i += 1;
                script.moves = value(&args, i, "--moves")
                    .split(',')
                    .map(str::to_owned)
                    .collect();
            }
            "--resign-at" => {
                i += 1;
                script.resign_at = number(&args, i, "--resign-at");
            }
            "--ponder" => script.ponder = true,
            "--ponder-miss" => script.ponder_miss = true,
            "--delay-ms" => {
                i += 1;
                script.delay = Duration::from_millis(number(&args, i, "--delay-ms"));
            }
            "--log" => {
                i += 1;
                script.log = Some(PathBuf::from(value(&args, i, "--log")));
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    script
}

fn value(args: &[String], i: usize, flag: &str) -> String {
    args.get(i).cloned().unwrap_or_else(|| {
        eprintln!("{flag} requires a value");
        std::process::exit(1);
    })
}

fn number<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    value(args, i, flag).parse().unwrap_or_else(|_| {
        eprintln!("{flag} requires a number");
        std::process::exit(1);
    })
}
