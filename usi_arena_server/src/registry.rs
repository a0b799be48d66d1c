// Session registry: matchmaking, routing, and game exit housekeeping.
//
// The registry owns every `MatchSession`, every `Tournament`, and the map from
// connection to what that connection is doing (seated in a session, or
// watching one). The server's main loop feeds it one `ClientMessage` at a
// time, so all of this state is touched from a single thread.
//
// Seating without a tournament: join any open standalone session, otherwise
// open a new one on the first configured position.
//
// Seating with a tournament: an engine name goes back to the unresolved
// tournament it already plays in; failing that it joins a tournament still
// waiting for a second (different) name; failing that it starts a new one.
// Inside the tournament it takes the empty seat of a session the other engine
// is waiting in, or claims the lowest unscheduled slot and opens a session
// for it. With `swap_colors`, seat colour is fixed by slot parity.
//
// When a session finishes, `finalize` runs exactly once for it (a session
// only yields a `GameResult` on its first finish): viewers get the final
// display, the tournament slot is recorded, the seats are told to either
// restart their engine for the next tournament game or disconnect, and the
// game and tournament records are written.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use thiserror::Error;
use usi_arena_protocol::{
    ClientMessage, Color, ConnectionId, ProtocolViolation, SeatRequest, ServerMessage, SessionId,
    TournamentEntry,
};

use crate::board::{BoardError, BoardFactory};
use crate::config::{ServerConfig, TournamentConfig};
use crate::outcome::GameResult;
use crate::records::{self, RecordStore};
use crate::session::{MatchSession, Rejection, TournamentSlot};
use crate::tournament::Tournament;
use crate::transport::Outbox;

/// What a connection is currently attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Membership {
    Seat(SessionId),
    Viewer(SessionId),
}

/// Why a seat request was not honoured.
#[derive(Debug, Error)]
pub enum SeatError {
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
    #[error("already seated in session {0}")]
    AlreadySeated(SessionId),
    #[error("no game is available for this engine")]
    NoGameAvailable,
    #[error("no starting position is configured")]
    NoStartPosition,
    #[error("cannot set up the starting position: {0}")]
    Board(#[from] BoardError),
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

pub struct SessionRegistry {
    config: ServerConfig,
    boards: Arc<dyn BoardFactory>,
    records: RecordStore,
    sessions: BTreeMap<SessionId, MatchSession>,
    memberships: BTreeMap<ConnectionId, Membership>,
    tournaments: Vec<Tournament>,
    next_session_id: u32,
}

impl SessionRegistry {
    pub fn new(config: ServerConfig, boards: Arc<dyn BoardFactory>) -> Self {
        let records = RecordStore::new(config.games_dir.clone());
        Self {
            config,
            boards,
            records,
            sessions: BTreeMap::new(),
            memberships: BTreeMap::new(),
            tournaments: Vec::new(),
            next_session_id: 0,
        }
    }

    pub fn session(&self, id: SessionId) -> Option<&MatchSession> {
        self.sessions.get(&id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &MatchSession> {
        self.sessions.values()
    }

    pub fn tournaments(&self) -> &[Tournament] {
        &self.tournaments
    }

    pub fn membership(&self, connection: ConnectionId) -> Option<Membership> {
        self.memberships.get(&connection).copied()
    }

    pub fn handle_message(
        &mut self,
        connection: ConnectionId,
        msg: ClientMessage,
        now: Instant,
        out: &mut dyn Outbox,
    ) {
        match msg {
            ClientMessage::Usi { name, author } => {
                if let Err(e) = self.request_seat(connection, name, author, out) {
                    log::info!("connection {connection}: seat request refused: {e}");
                    let reply = match e {
                        SeatError::NoGameAvailable => ServerMessage::Info {
                            message: e.to_string(),
                        },
                        _ => ServerMessage::Error {
                            message: e.to_string(),
                        },
                    };
                    out.send(connection, &reply);
                }
            }
            ClientMessage::Readyok => {
                let Some(Membership::Seat(id)) = self.membership(connection) else {
                    log::warn!("connection {connection}: readyok without a seat");
                    return;
                };
                let Some(session) = self.sessions.get_mut(&id) else {
                    return;
                };
                if let Err(e) = session.ready_ok(connection, now, out) {
                    log::warn!("session {id}: readyok from {connection} ignored: {e}");
                }
            }
            ClientMessage::Bestmove { mv } => self.best_move(connection, &mv, now, out),
            ClientMessage::Watch { session_id } => self.watch(connection, session_id, out),
            ClientMessage::Matching => {
                let games = self.sessions.values().map(MatchSession::matching_entry).collect();
                out.send(connection, &ServerMessage::Matching { games });
            }
            ClientMessage::Download { session_id } => {
                let reply = match self.download(session_id) {
                    Some((kif, filename)) => ServerMessage::Download { kif, filename },
                    None => ServerMessage::Error {
                        message: format!("no session {session_id}"),
                    },
                };
                out.send(connection, &reply);
            }
            ClientMessage::Tournament => {
                let tournaments = self.tournament_entries();
                out.send(connection, &ServerMessage::Tournament { tournaments });
            }
            ClientMessage::Goodbye => self.disconnect(connection, out),
        }
    }

    /// A connection closed (or said goodbye). Seats finish their session;
    /// viewers just stop receiving updates.
    pub fn disconnect(&mut self, connection: ConnectionId, out: &mut dyn Outbox) {
        match self.memberships.remove(&connection) {
            Some(Membership::Seat(id)) => {
                let result = self
                    .sessions
                    .get_mut(&id)
                    .and_then(|session| session.disconnect(connection));
                if let Some(result) = result {
                    self.finalize(id, result, out);
                }
            }
            Some(Membership::Viewer(id)) => self.leave_viewing(connection, id),
            None => {}
        }
    }

    /// CSA text and download filename of a session's record.
    pub fn download(&self, id: SessionId) -> Option<(String, String)> {
        let session = self.sessions.get(&id)?;
        let kif = session.kif();
        let reason = session.result().map(|r| r.reason);
        let stem = records::file_stem(
            session.created_at(),
            kif.name(Color::Black),
            kif.name(Color::White),
        );
        Some((kif.to_csa(reason), format!("{stem}.csa")))
    }

    pub fn tournament_entries(&self) -> Vec<TournamentEntry> {
        self.tournaments.iter().map(Tournament::entry).collect()
    }

    fn request_seat(
        &mut self,
        connection: ConnectionId,
        name: Option<String>,
        author: Option<String>,
        out: &mut dyn Outbox,
    ) -> Result<(), SeatError> {
        let request = SeatRequest::from_fields(name, author)?;
        match self.membership(connection) {
            Some(Membership::Seat(id)) if self.is_live(id) => {
                return Err(SeatError::AlreadySeated(id));
            }
            Some(Membership::Viewer(id)) => self.leave_viewing(connection, id),
            _ => {}
        }

        let id = match self.config.tournament.clone() {
            Some(tournament) => self.seat_in_tournament(connection, request, &tournament, out)?,
            None => self.seat_standalone(connection, request, out)?,
        };
        self.memberships.insert(connection, Membership::Seat(id));
        Ok(())
    }

    fn seat_standalone(
        &mut self,
        connection: ConnectionId,
        request: SeatRequest,
        out: &mut dyn Outbox,
    ) -> Result<SessionId, SeatError> {
        let open = self
            .sessions
            .values()
            .find(|s| s.tournament().is_none() && s.is_open())
            .map(|s| s.id);
        let id = match open {
            Some(id) => id,
            None => {
                let start = self
                    .config
                    .positions
                    .first()
                    .cloned()
                    .ok_or(SeatError::NoStartPosition)?;
                self.open_session(&start, None)?
            }
        };
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SeatError::NoGameAvailable)?;
        let color = session.free_seat().ok_or(SeatError::NoGameAvailable)?;
        session.take_seat(connection, request, color, out)?;
        Ok(id)
    }

    fn seat_in_tournament(
        &mut self,
        connection: ConnectionId,
        request: SeatRequest,
        config: &TournamentConfig,
        out: &mut dyn Outbox,
    ) -> Result<SessionId, SeatError> {
        let index = self.tournament_for(&request.name, config.games);
        let tournament = &self.tournaments[index];

        // The other engine may already be waiting in a session of ours.
        let waiting = tournament.live_sessions().find(|id| {
            self.sessions
                .get(id)
                .is_some_and(|s| s.is_open() && !s.has_player_named(&request.name))
        });
        if let Some(id) = waiting {
            let session = self
                .sessions
                .get_mut(&id)
                .ok_or(SeatError::NoGameAvailable)?;
            let color = match (config.swap_colors, session.tournament()) {
                (true, Some(slot)) => tournament.swapped_color(slot.slot, &request.name),
                _ => session.free_seat(),
            }
            .ok_or(SeatError::NoGameAvailable)?;
            session.take_seat(connection, request, color, out)?;
            return Ok(id);
        }

        let slot = self.tournaments[index]
            .allocate_slot()
            .ok_or(SeatError::NoGameAvailable)?;
        let rotation = self.config.positions.len();
        let start = self
            .config
            .positions
            .get(Tournament::position_index(slot, config.swap_colors, rotation))
            .cloned()
            .ok_or(SeatError::NoStartPosition);
        let at = TournamentSlot {
            tournament: index,
            slot,
        };
        let opened = start.and_then(|start| {
            self.open_session(&start, Some(at))
                .map_err(SeatError::from)
        });
        let id = match opened {
            Ok(id) => id,
            Err(e) => {
                self.tournaments[index].release_slot(slot);
                return Err(e);
            }
        };
        let tournament = &mut self.tournaments[index];
        tournament.attach_session(slot, id);
        log::info!(
            "tournament {}: game {} opened as session {id}",
            tournament.id,
            slot + 1
        );

        let color = if config.swap_colors {
            tournament.swapped_color(slot, &request.name)
        } else {
            Some(Color::Black)
        }
        .ok_or(SeatError::NoGameAvailable)?;
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(SeatError::NoGameAvailable)?;
        session.take_seat(connection, request, color, out)?;
        Ok(id)
    }

    /// Index of the tournament `name` should play in, joining or creating
    /// one as needed.
    fn tournament_for(&mut self, name: &str, games: usize) -> usize {
        if let Some(index) = self
            .tournaments
            .iter()
            .position(|t| t.has_player(name) && !t.is_resolved())
        {
            return index;
        }
        if let Some(index) = self
            .tournaments
            .iter_mut()
            .position(|t| t.join(name))
        {
            log::info!("tournament {index}: {name} joined");
            return index;
        }
        let index = self.tournaments.len();
        self.tournaments.push(Tournament::new(index, name, games));
        log::info!("tournament {index}: created by {name} ({games} games)");
        index
    }

    fn open_session(
        &mut self,
        start_sfen: &str,
        tournament: Option<TournamentSlot>,
    ) -> Result<SessionId, BoardError> {
        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;
        let session = MatchSession::new(
            id,
            self.boards.new_board(),
            start_sfen,
            &self.config.time_control(),
            self.config.sennichite,
            tournament,
        )?;
        self.sessions.insert(id, session);
        log::debug!("session {id}: opened on {start_sfen}");
        Ok(id)
    }

    fn best_move(&mut self, connection: ConnectionId, mv: &str, now: Instant, out: &mut dyn Outbox) {
        let Some(Membership::Seat(id)) = self.membership(connection) else {
            out.send(
                connection,
                &ServerMessage::Error {
                    message: Rejection::NotSeated.to_string(),
                },
            );
            return;
        };
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };
        match session.best_move(connection, mv, now, out) {
            Ok(Some(result)) => self.finalize(id, result, out),
            Ok(None) => {}
            Err(e) => log::warn!("session {id}: bestmove {mv} from {connection} discarded: {e}"),
        }
    }

    fn watch(&mut self, connection: ConnectionId, id: SessionId, out: &mut dyn Outbox) {
        let seated = match self.membership(connection) {
            Some(Membership::Seat(seated)) => Some(seated),
            _ => None,
        };
        if let Some(seated) = seated.filter(|s| self.is_live(*s)) {
            out.send(
                connection,
                &ServerMessage::Error {
                    message: format!("seated in session {seated}, cannot watch"),
                },
            );
            return;
        }
        if !self.sessions.contains_key(&id) {
            out.send(
                connection,
                &ServerMessage::Error {
                    message: format!("no session {id}"),
                },
            );
            return;
        }
        if let Some(Membership::Viewer(previous)) = self.membership(connection) {
            self.leave_viewing(connection, previous);
        }
        if let Some(session) = self.sessions.get_mut(&id) {
            session.add_viewer(connection, out);
            self.memberships.insert(connection, Membership::Viewer(id));
        }
    }

    fn leave_viewing(&mut self, connection: ConnectionId, id: SessionId) {
        if let Some(session) = self.sessions.get_mut(&id) {
            session.remove_viewer(connection);
        }
    }

    /// Session exists and has not finished.
    fn is_live(&self, id: SessionId) -> bool {
        self.sessions.get(&id).is_some_and(|s| !s.is_finished())
    }

    /// Exit housekeeping for a session that just finished.
    fn finalize(&mut self, id: SessionId, result: GameResult, out: &mut dyn Outbox) {
        let Some(session) = self.sessions.get(&id) else {
            return;
        };
        session.broadcast_display(out);

        let seats = session.live_seats();
        for connection in &seats {
            if self.memberships.get(connection) == Some(&Membership::Seat(id)) {
                self.memberships.remove(connection);
            }
        }

        let mut tournament_continues = false;
        let mut summary = None;
        let played = session
            .tournament()
            .and_then(|slot| Some((slot, self.tournaments.get_mut(slot.tournament)?)));
        if let Some((slot, tournament)) = played {
            let winner = result
                .winner
                .and_then(|color| session.seat(color).map(|c| (color, c.name.as_str())));
            tournament.record_result(slot.slot, winner, result.reason);
            log::info!(
                "tournament {}: [{}]",
                tournament.id,
                tournament.outcome_string()
            );
            summary = tournament
                .take_summary()
                .map(|text| (tournament.players().to_vec(), text));
            tournament_continues = !tournament.is_resolved();
        }

        let notice = if tournament_continues {
            ServerMessage::RestartEngine
        } else {
            ServerMessage::Disconnect
        };
        out.send_all(&seats, &notice);

        if session.seated_count() == 2 {
            match self
                .records
                .write_game(session.created_at(), session.kif(), Some(result.reason))
            {
                Ok(path) => log::info!("session {id}: record written to {}", path.display()),
                Err(e) => log::error!("session {id}: cannot write record: {e}"),
            }
        }
        if let Some((players, text)) = summary {
            match self.records.write_tournament(Local::now(), &players, &text) {
                Ok(path) => log::info!("tournament summary written to {}", path.display()),
                Err(e) => log::error!("cannot write tournament summary: {e}"),
            }
        }
    }
}
