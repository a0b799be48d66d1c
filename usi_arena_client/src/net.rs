// TCP client for connecting to the arena server.
//
// Architecture:
// - `connect()` opens the TCP stream on the calling thread, then spawns a
//   background reader thread.
// - The reader thread calls `framing::recv()` in a loop and pushes each
//   `ServerMessage` into an `mpsc` channel. It exits on EOF or a malformed
//   frame, which drops the sender.
// - The caller holds a `BufWriter<TcpStream>` for sending and blocks on the
//   channel with `recv()`.
//
// Writes are flushed synchronously per message; the messages are small.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use usi_arena_protocol::framing;
use usi_arena_protocol::{ClientMessage, ServerMessage};

use crate::error::ClientError;

pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
}

impl NetClient {
    /// Connect to `addr` (`host:port`) and start the reader thread.
    pub fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).map_err(|source| ClientError::Connect {
            addr: addr.to_owned(),
            source,
        })?;
        let reader_stream = stream.try_clone().map_err(|source| ClientError::Connect {
            addr: addr.to_owned(),
            source,
        })?;
        log::info!("connected to {addr}");

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            let mut reader = BufReader::new(reader_stream);
            loop {
                match framing::recv::<_, ServerMessage>(&mut reader) {
                    Ok(msg) => {
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        if !e.is_eof() {
                            log::warn!("server stream: {e}");
                        }
                        break;
                    }
                }
            }
        });

        Ok(Self {
            writer: BufWriter::new(stream),
            inbox: rx,
            _reader_thread: Some(reader_thread),
        })
    }

    pub fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        framing::send(&mut self.writer, msg)?;
        Ok(())
    }

    /// Block until the next server message. Fails once the connection is
    /// closed and every queued message has been taken.
    pub fn recv(&self) -> Result<ServerMessage, ClientError> {
        self.inbox.recv().map_err(|_| ClientError::ConnectionClosed)
    }

    /// Send `Goodbye`; the server treats it as a disconnect.
    pub fn disconnect(&mut self) {
        let _ = self.send(&ClientMessage::Goodbye);
    }
}
