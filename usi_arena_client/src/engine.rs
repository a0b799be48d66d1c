// Bridge between the arena and one local USI engine process.
//
// `EngineBridge` owns the child process, its stdin, and the receiving end of
// a channel fed by exactly one reader thread that forwards each stdout line
// in order. Every wait is a blocking `recv()`; when the engine's stdout
// closes, the reader thread exits, the sender drops, and every pending or
// later wait fails with `BridgeError::EngineTerminated`.
//
// Pondering is layered over the line protocol:
//
//   Idle --request_move--> AwaitingBestmove --bestmove (no ponder)--> Idle
//   AwaitingBestmove --bestmove X ponder Y--> Pondering(Y)
//   Pondering(Y) --request_move, opponent played Y--> ponderhit, AwaitingBestmove
//   Pondering(Y) --request_move, opponent played Z--> stop, Stopping
//   Stopping --bestmove (discarded)--> Idle --> position/go as usual
//
// After a ponderhit no new `position`/`go` is sent; the running search's
// bestmove is the answer.

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use usi_arena_protocol::{Position, TimeControl};

use crate::config::ClientConfig;
use crate::error::BridgeError;
use crate::usi::{self, BestMove, EngineInfo};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PonderState {
    Idle,
    Pondering(String),
    Stopping,
    AwaitingBestmove,
}

pub struct EngineBridge {
    input: Box<dyn Write + Send>,
    lines: Receiver<String>,
    child: Option<Child>,
    reader_thread: Option<JoinHandle<()>>,
    ponder: PonderState,
    info: EngineInfo,
    shut_down: bool,
}

impl EngineBridge {
    /// Start the configured engine and its reader thread. No USI traffic
    /// happens until `handshake`.
    pub fn spawn(config: &ClientConfig) -> Result<Self, BridgeError> {
        let (program, args) = config.program_and_args();
        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }
        let mut child = command.spawn().map_err(|source| BridgeError::Spawn {
            command: program.clone(),
            source,
        })?;
        log::info!("started engine {program} (pid {})", child.id());

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Protocol("engine stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Protocol("engine stdout not captured".into()))?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                let line = line.trim_end_matches('\r').to_owned();
                log::debug!("<: {line}");
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let mut bridge = Self::from_parts(Box::new(stdin), rx);
        bridge.child = Some(child);
        bridge.reader_thread = Some(reader_thread);
        Ok(bridge)
    }

    /// A bridge over an arbitrary line sink and line source, with no child
    /// process. Closing the source's sender reads as engine termination.
    pub fn from_parts(input: Box<dyn Write + Send>, lines: Receiver<String>) -> Self {
        Self {
            input,
            lines,
            child: None,
            reader_thread: None,
            ponder: PonderState::Idle,
            info: EngineInfo::default(),
            shut_down: false,
        }
    }

    pub fn info(&self) -> &EngineInfo {
        &self.info
    }

    pub fn ponder_state(&self) -> &PonderState {
        &self.ponder
    }

    /// `usi`, collect `id` lines until `usiok`, then one `setoption` per
    /// option.
    pub fn handshake(&mut self, options: &[(String, String)]) -> Result<&EngineInfo, BridgeError> {
        self.send("usi")?;
        loop {
            let line = self.recv()?;
            if let Some((key, value)) = usi::parse_id(&line) {
                self.info.record(key, value);
            } else if usi::first_token(&line) == Some("usiok") {
                break;
            }
        }
        for (name, value) in options {
            self.send(&usi::setoption_command(name, value))?;
        }
        Ok(&self.info)
    }

    pub fn is_ready(&mut self) -> Result<(), BridgeError> {
        self.send("isready")?;
        self.wait_for("readyok")?;
        Ok(())
    }

    pub fn new_game(&mut self) -> Result<(), BridgeError> {
        self.ponder = PonderState::Idle;
        self.send("usinewgame")
    }

    /// Ask for a move in `position` (whose last move is the opponent's
    /// reply) and start pondering on the engine's predicted answer, if any.
    pub fn request_move(
        &mut self,
        position: &Position,
        time: &TimeControl,
    ) -> Result<BestMove, BridgeError> {
        let result = self.search(position, time);
        if result.is_err() {
            self.ponder = PonderState::Idle;
        }
        result
    }

    fn search(&mut self, position: &Position, time: &TimeControl) -> Result<BestMove, BridgeError> {
        let ponder_hit = match &self.ponder {
            PonderState::Pondering(predicted) => {
                Some(position.last_move() == Some(predicted.as_str()))
            }
            _ => None,
        };
        match ponder_hit {
            Some(true) => {
                self.send("ponderhit")?;
                self.ponder = PonderState::AwaitingBestmove;
            }
            Some(false) => {
                self.send("stop")?;
                self.ponder = PonderState::Stopping;
                let stale = self.wait_bestmove()?;
                log::debug!("discarded ponder result {}", stale.mv);
                self.ponder = PonderState::Idle;
            }
            None => {}
        }

        if self.ponder == PonderState::Idle {
            self.send(&usi::position_command(position))?;
            self.send(&usi::go_command(time))?;
            self.ponder = PonderState::AwaitingBestmove;
        }

        let best = self.wait_bestmove()?;
        self.ponder = PonderState::Idle;
        if let Some(predicted) = best.ponder.as_deref().filter(|_| !best.ends_game()) {
            let ponder_position = position.extended([best.mv.as_str(), predicted]);
            self.send(&usi::position_command(&ponder_position))?;
            self.send(&usi::go_ponder_command(time))?;
            self.ponder = PonderState::Pondering(predicted.to_owned());
        }
        Ok(best)
    }

    /// Send `quit` and wait for the process to exit. A second call is a
    /// no-op. An engine that already died is not an error.
    pub fn shutdown(&mut self) -> Result<(), BridgeError> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        if matches!(self.ponder, PonderState::Pondering(_)) {
            self.send_ignoring_exit("stop")?;
        }
        self.ponder = PonderState::Idle;
        self.send_ignoring_exit("quit")?;
        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            log::info!("engine exited with {status}");
        }
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    /// Force-terminate the engine after a fatal protocol error.
    pub fn kill(&mut self) {
        self.shut_down = true;
        self.ponder = PonderState::Idle;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::warn!("cannot kill engine: {e}");
            }
            let _ = child.wait();
        }
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
    }

    fn send(&mut self, line: &str) -> Result<(), BridgeError> {
        log::debug!(">: {line}");
        let written = writeln!(self.input, "{line}").and_then(|()| self.input.flush());
        match written {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Err(BridgeError::EngineTerminated),
            Err(e) => Err(e.into()),
        }
    }

    fn send_ignoring_exit(&mut self, line: &str) -> Result<(), BridgeError> {
        match self.send(line) {
            Err(BridgeError::EngineTerminated) => Ok(()),
            other => other,
        }
    }

    fn recv(&self) -> Result<String, BridgeError> {
        self.lines.recv().map_err(|_| BridgeError::EngineTerminated)
    }

    fn wait_for(&self, token: &str) -> Result<String, BridgeError> {
        loop {
            let line = self.recv()?;
            if usi::first_token(&line) == Some(token) {
                return Ok(line);
            }
        }
    }

    fn wait_bestmove(&self) -> Result<BestMove, BridgeError> {
        loop {
            let line = self.wait_for("bestmove")?;
            match usi::parse_bestmove(&line) {
                Some(best) => return Ok(best),
                None => log::warn!("malformed bestmove line: {line}"),
            }
        }
    }
}

impl Drop for EngineBridge {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("engine shutdown failed: {e}");
        }
    }
}
