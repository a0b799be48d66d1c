// Outbound message seam.
//
// Sessions and the registry never touch sockets. They address messages to a
// `ConnectionId` through an `Outbox`; broadcasting to a session's viewers is
// just a loop over its viewer list. `server.rs` implements `Outbox` over the
// TCP write halves it owns; `MemoryOutbox` records messages for tests.
//
// `TcpOutbox` writes on the dispatch thread, so every write half carries a
// write timeout. A peer that stops reading is cut off once a write times
// out: its writer is dropped and the socket shut down, which ends its reader
// thread and surfaces as an ordinary disconnect.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use usi_arena_protocol::framing;
use usi_arena_protocol::{ConnectionId, ServerMessage};

pub trait Outbox {
    fn send(&mut self, to: ConnectionId, msg: &ServerMessage);

    fn send_all(&mut self, to: &[ConnectionId], msg: &ServerMessage) {
        for id in to {
            self.send(*id, msg);
        }
    }
}

/// How long one message may take to reach a peer's socket buffer.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Write halves of all live connections, keyed by id.
pub struct TcpOutbox {
    writers: BTreeMap<ConnectionId, BufWriter<TcpStream>>,
    write_timeout: Duration,
}

impl Default for TcpOutbox {
    fn default() -> Self {
        Self::with_write_timeout(WRITE_TIMEOUT)
    }
}

impl TcpOutbox {
    pub fn with_write_timeout(write_timeout: Duration) -> Self {
        Self {
            writers: BTreeMap::new(),
            write_timeout,
        }
    }

    pub fn insert(&mut self, id: ConnectionId, stream: TcpStream) {
        if let Err(e) = stream.set_write_timeout(Some(self.write_timeout)) {
            log::warn!("connection {id}: cannot set write timeout: {e}");
        }
        self.writers.insert(id, BufWriter::new(stream));
    }

    pub fn remove(&mut self, id: ConnectionId) {
        self.writers.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl Outbox for TcpOutbox {
    /// A failed or timed-out write drops the connection; its reader thread
    /// then reports the disconnect.
    fn send(&mut self, to: ConnectionId, msg: &ServerMessage) {
        let Some(writer) = self.writers.get_mut(&to) else {
            return;
        };
        let Err(e) = framing::send(writer, msg) else {
            return;
        };
        log::warn!("write to connection {to} failed, dropping it: {e}");
        if let Some(writer) = self.writers.remove(&to) {
            let _ = writer.get_ref().shutdown(Shutdown::Both);
        }
    }
}

/// Records every message in send order.
#[derive(Default, Debug)]
pub struct MemoryOutbox {
    pub sent: Vec<(ConnectionId, ServerMessage)>,
}

impl MemoryOutbox {
    /// Messages sent to `id`, in order.
    pub fn to(&self, id: ConnectionId) -> Vec<&ServerMessage> {
        self.sent
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, msg)| msg)
            .collect()
    }

    pub fn take(&mut self) -> Vec<(ConnectionId, ServerMessage)> {
        std::mem::take(&mut self.sent)
    }
}

impl Outbox for MemoryOutbox {
    fn send(&mut self, to: ConnectionId, msg: &ServerMessage) {
        self.sent.push((to, msg.clone()));
    }
}
