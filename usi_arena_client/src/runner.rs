// Client event loop: one server connection driving one engine.
//
// The engine is started and handshaken before connecting, so the seat
// request can carry the engine's `id name` / `id author`. Server messages
// are then handled strictly in order:
//
//   isready        -> engine isready/readyok -> readyok
//   usinewgame     -> engine usinewgame
//   nextmove       -> engine search (with pondering) -> bestmove
//   restart_engine -> quit engine, start a fresh one, request a seat again
//   disconnect     -> quit engine, leave
//   error          -> quit engine, leave with the server's message
//
// Any engine failure is fatal: the engine is killed, the server is told
// goodbye (which it treats as a disconnect), and the error is returned.

use usi_arena_protocol::{ClientMessage, ServerMessage};

use crate::config::ClientConfig;
use crate::engine::EngineBridge;
use crate::error::ClientError;
use crate::net::NetClient;

/// How a run ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The server sent `disconnect`.
    Dismissed,
    /// The server closed the connection.
    ConnectionClosed,
}

/// Start the engine, connect to `addr`, and play until dismissed.
pub fn run(config: &ClientConfig, addr: &str) -> Result<RunOutcome, ClientError> {
    let mut engine = start_engine(config)?;
    let mut net = NetClient::connect(addr)?;
    let result = serve(config, &mut engine, &mut net);
    match &result {
        Ok(_) => engine.shutdown()?,
        Err(e @ ClientError::Bridge(_)) => {
            log::error!("{e}");
            engine.kill();
            net.disconnect();
        }
        Err(e) => {
            log::error!("{e}");
            if let Err(e) = engine.shutdown() {
                log::warn!("engine shutdown failed: {e}");
            }
            net.disconnect();
        }
    }
    result
}

fn start_engine(config: &ClientConfig) -> Result<EngineBridge, ClientError> {
    let mut engine = EngineBridge::spawn(config)?;
    let info = engine.handshake(&config.options())?;
    log::info!(
        "engine {} by {}",
        info.name.as_deref().unwrap_or("<unnamed>"),
        info.author.as_deref().unwrap_or("<unknown>")
    );
    Ok(engine)
}

fn seat_request(engine: &EngineBridge) -> ClientMessage {
    let info = engine.info();
    ClientMessage::Usi {
        name: info.name.clone(),
        author: info.author.clone(),
    }
}

fn serve(
    config: &ClientConfig,
    engine: &mut EngineBridge,
    net: &mut NetClient,
) -> Result<RunOutcome, ClientError> {
    net.send(&seat_request(engine))?;
    loop {
        let msg = match net.recv() {
            Ok(msg) => msg,
            Err(ClientError::ConnectionClosed) => {
                log::info!("server closed the connection");
                return Ok(RunOutcome::ConnectionClosed);
            }
            Err(e) => return Err(e),
        };
        match msg {
            ServerMessage::Info { message } => log::info!("server: {message}"),
            ServerMessage::Error { message } => return Err(ClientError::Server(message)),
            ServerMessage::Isready => {
                engine.is_ready()?;
                net.send(&ClientMessage::Readyok)?;
            }
            ServerMessage::Usinewgame => engine.new_game()?,
            ServerMessage::NextMove { position, time } => {
                let best = engine.request_move(&position, &time)?;
                log::info!("playing {}", best.mv);
                net.send(&ClientMessage::Bestmove { mv: best.mv })?;
            }
            ServerMessage::RestartEngine => {
                log::info!("restarting engine for the next game");
                engine.shutdown()?;
                *engine = start_engine(config)?;
                net.send(&seat_request(engine))?;
            }
            ServerMessage::Disconnect => {
                log::info!("dismissed by server");
                net.disconnect();
                return Ok(RunOutcome::Dismissed);
            }
            other => log::debug!("ignoring {other:?}"),
        }
    }
}
