// TCP server and main event loop for the match arena.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per connection): call `framing::recv()` in a
//   loop and send `InternalEvent::MessageFrom` to the main thread. On EOF,
//   a read error, a malformed frame, or `Goodbye`, they send
//   `InternalEvent::Disconnected` and exit.
// - **Main thread**: owns the `SessionRegistry` and the `TcpOutbox`,
//   receives events from the channel, and dispatches them one at a time.
//   Every session transition therefore happens on this thread.
//
// The main thread is the only writer to TCP streams (through `TcpOutbox`).
// Reader threads only read. Connection ids are handed out by the main thread
// in accept order.
//
// Clocks are judged when a move arrives, so the loop needs no timer; it
// wakes periodically only to check the `keep_running` flag that
// `ServerHandle::stop` clears.

use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use usi_arena_protocol::framing;
use usi_arena_protocol::{ClientMessage, ConnectionId};

use crate::board::BoardFactory;
use crate::config::ServerConfig;
use crate::registry::SessionRegistry;
use crate::transport::TcpOutbox;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        connection: ConnectionId,
        message: ClientMessage,
    },
    Disconnected {
        connection: ConnectionId,
    },
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for its main loop to exit.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Start the server on a background thread. Returns a handle for stopping
/// it and the bound address (port 0 in the config lets the OS pick).
pub fn start_server(
    config: ServerConfig,
    boards: Arc<dyn BoardFactory>,
) -> io::Result<(ServerHandle, SocketAddr)> {
    config.validate().map_err(io::Error::other)?;
    let listener = TcpListener::bind((config.bind.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    log::info!("listening on {addr}");

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();
    let registry = SessionRegistry::new(config, boards);

    let thread = thread::spawn(move || {
        run_server(listener, registry, keep_running_clone);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main loop. Runs until `keep_running` is cleared.
fn run_server(listener: TcpListener, mut registry: SessionRegistry, keep_running: Arc<AtomicBool>) {
    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();
    let mut outbox = TcpOutbox::default();
    let mut next_connection = 0u32;

    // Non-blocking so the accept thread can notice shutdown.
    if let Err(e) = listener.set_nonblocking(true) {
        log::error!("cannot make listener non-blocking: {e}");
        return;
    }

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    log::debug!("accepted {peer}");
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    log::error!("accept failed: {e}");
                    break;
                }
            }
        }
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => match event {
                InternalEvent::NewConnection { stream } => {
                    let connection = ConnectionId(next_connection);
                    next_connection += 1;
                    accept_connection(connection, stream, &mut outbox, &tx, &keep_running);
                }
                InternalEvent::MessageFrom {
                    connection,
                    message,
                } => {
                    log::debug!("{connection} -> {message:?}");
                    registry.handle_message(connection, message, Instant::now(), &mut outbox);
                }
                InternalEvent::Disconnected { connection } => {
                    log::info!("connection {connection} closed");
                    registry.disconnect(connection, &mut outbox);
                    outbox.remove(connection);
                }
            },
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    log::info!("server stopped with {} open connections", outbox.len());
}

/// Register the write half and spawn the reader thread for a new connection.
fn accept_connection(
    connection: ConnectionId,
    stream: TcpStream,
    outbox: &mut TcpOutbox,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    let read_half = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            log::warn!("cannot clone stream for connection {connection}: {e}");
            return;
        }
    };
    outbox.insert(connection, stream);
    log::info!("connection {connection} opened");

    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    thread::spawn(move || {
        reader_loop(
            BufReader::new(read_half),
            connection,
            tx_reader,
            keep_running_reader,
        );
    });
}

/// Reader loop for a single connection. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    connection: ConnectionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match framing::recv::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::Goodbye) => break,
            Ok(message) => {
                if tx
                    .send(InternalEvent::MessageFrom {
                        connection,
                        message,
                    })
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => {
                if !e.is_eof() {
                    log::warn!("connection {connection}: {e}");
                }
                break;
            }
        }
    }
    let _ = tx.send(InternalEvent::Disconnected { connection });
}
