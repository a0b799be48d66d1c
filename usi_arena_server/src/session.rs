// Per-game referee state machine.
//
// `MatchSession` owns one game: the board, both seats, the viewer list, the
// clock and the game record. The registry drives it from the server's
// single-threaded event loop, so every transition of one session is applied
// atomically with respect to other events for it. No internal locking.
//
// Lifecycle:
//   WaitingForPlayers --second seat--> Readying --both readyok--> InProgress(color)
//   InProgress(color) --bestmove--> InProgress(other) | Finished(reason)
//   any --seat disconnect--> Finished(DISCONNECT)
//
// A bestmove is judged in this order: `resign`; membership in the board's
// legal set; the clock (an overrun never reaches the board); then the
// board's repetition verdict after applying it. `Finished` is terminal for
// play, but the session stays around for viewers and record download.
//
// `finish` is the single entry to `Finished` and is a no-op once finished,
// so near-simultaneous terminations (time-up racing a disconnect) settle on
// whichever came first. Exit housekeeping (notifying seats, persisting the
// record, tournament bookkeeping) lives in the registry, which acts on the
// `GameResult` a transition returns.

use std::time::Instant;

use chrono::{DateTime, Local};
use thiserror::Error;
use usi_arena_protocol::{
    Color, ConnectionId, DisplayInfo, MatchingEntry, SeatRequest, ServerMessage, SessionId,
    TimeControl,
};

use crate::board::{Board, BoardError, Repetition};
use crate::clock::Clock;
use crate::config::SennichiteRule;
use crate::kif::KifRecorder;
use crate::outcome::{GameOverReason, GameResult};
use crate::transport::Outbox;

/// Move string an engine sends to give up.
pub const RESIGN: &str = "resign";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    WaitingForPlayers,
    Readying,
    InProgress(Color),
    Finished(GameOverReason),
}

/// Why an inbound event was ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("connection has no seat in this session")]
    NotSeated,
    #[error("seat is already taken")]
    SeatTaken,
    #[error("session is not accepting that now ({0:?})")]
    WrongState(SessionState),
    #[error("not this seat's turn")]
    NotYourTurn,
}

/// A seated engine.
#[derive(Clone, Debug)]
pub struct Client {
    pub connection: ConnectionId,
    pub name: String,
    pub author: String,
    pub ready_ok: bool,
    pub has_disconnected: bool,
}

/// Which tournament game a session plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TournamentSlot {
    pub tournament: usize,
    pub slot: usize,
}

pub struct MatchSession {
    pub id: SessionId,
    board: Box<dyn Board>,
    seats: [Option<Client>; 2],
    viewers: Vec<ConnectionId>,
    clock: Clock,
    kif: KifRecorder,
    state: SessionState,
    sennichite: SennichiteRule,
    tournament: Option<TournamentSlot>,
    result: Option<GameResult>,
    created_at: DateTime<Local>,
}

impl MatchSession {
    pub fn new(
        id: SessionId,
        mut board: Box<dyn Board>,
        start_sfen: &str,
        time: &TimeControl,
        sennichite: SennichiteRule,
        tournament: Option<TournamentSlot>,
    ) -> Result<Self, BoardError> {
        board.set_position(start_sfen)?;
        let kif = KifRecorder::new(
            start_sfen,
            board.side_to_move(),
            tournament.map(|t| t.slot),
        );
        Ok(Self {
            id,
            board,
            seats: [None, None],
            viewers: Vec::new(),
            clock: Clock::new(time),
            kif,
            state: SessionState::WaitingForPlayers,
            sennichite,
            tournament,
            result: None,
            created_at: Local::now(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Finished(_))
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    /// The winning colour of a finished game; `None` while playing, for a
    /// draw, or for a game abandoned before it started.
    pub fn winner(&self) -> Option<Color> {
        self.result.and_then(|r| r.winner)
    }

    pub fn kif(&self) -> &KifRecorder {
        &self.kif
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn board_ply(&self) -> usize {
        self.board.ply()
    }

    pub fn tournament(&self) -> Option<TournamentSlot> {
        self.tournament
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn seat(&self, color: Color) -> Option<&Client> {
        self.seats[color.index()].as_ref()
    }

    pub fn seat_of(&self, connection: ConnectionId) -> Option<Color> {
        Color::ALL.into_iter().find(|c| {
            self.seats[c.index()]
                .as_ref()
                .is_some_and(|client| client.connection == connection)
        })
    }

    pub fn seated_count(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    /// First empty seat, Black before White.
    pub fn free_seat(&self) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|c| self.seats[c.index()].is_none())
    }

    /// Waiting with exactly one seat filled.
    pub fn is_open(&self) -> bool {
        self.state == SessionState::WaitingForPlayers && self.seated_count() == 1
    }

    pub fn has_player_named(&self, name: &str) -> bool {
        self.seats.iter().flatten().any(|c| c.name == name)
    }

    /// Connections of seats that are still attached.
    pub fn live_seats(&self) -> Vec<ConnectionId> {
        self.seats
            .iter()
            .flatten()
            .filter(|c| !c.has_disconnected)
            .map(|c| c.connection)
            .collect()
    }

    pub fn viewers(&self) -> &[ConnectionId] {
        &self.viewers
    }

    /// Seat a client at `color`. Seating the second client sends `isready`
    /// to both and moves to `Readying`.
    pub fn take_seat(
        &mut self,
        connection: ConnectionId,
        request: SeatRequest,
        color: Color,
        out: &mut dyn Outbox,
    ) -> Result<(), Rejection> {
        if self.state != SessionState::WaitingForPlayers {
            return Err(Rejection::WrongState(self.state));
        }
        if self.seats[color.index()].is_some() {
            return Err(Rejection::SeatTaken);
        }

        log::info!(
            "session {}: {} ({}) seated as {color:?}",
            self.id,
            request.name,
            request.author
        );
        self.kif.set_name(color, request.name.clone());
        self.seats[color.index()] = Some(Client {
            connection,
            name: request.name,
            author: request.author,
            ready_ok: false,
            has_disconnected: false,
        });
        out.send(
            connection,
            &ServerMessage::Info {
                message: format!("seated as {color:?} in session {}", self.id),
            },
        );

        if self.seated_count() == 2 {
            self.state = SessionState::Readying;
            out.send_all(&self.live_seats(), &ServerMessage::Isready);
        }
        Ok(())
    }

    /// A seat answered `isready`. When both have, the game starts.
    pub fn ready_ok(
        &mut self,
        connection: ConnectionId,
        now: Instant,
        out: &mut dyn Outbox,
    ) -> Result<(), Rejection> {
        if self.state != SessionState::Readying {
            return Err(Rejection::WrongState(self.state));
        }
        let color = self.seat_of(connection).ok_or(Rejection::NotSeated)?;
        if let Some(client) = self.seats[color.index()].as_mut() {
            client.ready_ok = true;
        }

        let all_ready = self.seats.iter().flatten().all(|c| c.ready_ok);
        if all_ready {
            out.send_all(&self.live_seats(), &ServerMessage::Usinewgame);
            let first = self.board.side_to_move();
            log::info!("session {}: game started, {first:?} to move", self.id);
            self.begin_turn(first, now, out);
        }
        Ok(())
    }

    /// Judge a move from `connection`. Returns the result if this move
    /// ended the game.
    pub fn best_move(
        &mut self,
        connection: ConnectionId,
        mv: &str,
        now: Instant,
        out: &mut dyn Outbox,
    ) -> Result<Option<GameResult>, Rejection> {
        let SessionState::InProgress(to_move) = self.state else {
            return Err(Rejection::WrongState(self.state));
        };
        let color = self.seat_of(connection).ok_or(Rejection::NotSeated)?;
        if color != to_move {
            return Err(Rejection::NotYourTurn);
        }
        let opponent = to_move.opponent();

        if mv == RESIGN {
            return Ok(self.finish(GameOverReason::Resign, Some(opponent)));
        }
        if !self.board.legal_moves().contains(mv) {
            log::info!("session {}: {to_move:?} played illegal move {mv}", self.id);
            return Ok(self.finish(GameOverReason::IllegalMove, Some(opponent)));
        }

        let settlement = self.clock.settle_turn(to_move, now);
        if settlement.over_byoyomi {
            return Ok(self.finish(GameOverReason::TimeUp, Some(opponent)));
        }

        self.board.apply_move(mv);
        self.kif.push(mv, settlement.elapsed_ms);
        debug_assert_eq!(self.kif.len(), self.board.ply());

        match self.board.repetition() {
            Repetition::ByCheck => Ok(self.finish(GameOverReason::IllegalMove, Some(opponent))),
            Repetition::Plain => {
                let winner = match self.sennichite {
                    SennichiteRule::Draw => None,
                    SennichiteRule::MoverLoses => Some(opponent),
                };
                Ok(self.finish(GameOverReason::Sennichite, winner))
            }
            Repetition::None => {
                self.begin_turn(opponent, now, out);
                Ok(None)
            }
        }
    }

    /// A connection went away. Seats are finished at most once; viewers are
    /// simply dropped. Returns the result if this disconnect ended the game.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Option<GameResult> {
        let Some(color) = self.seat_of(connection) else {
            self.remove_viewer(connection);
            return None;
        };
        let client = self.seats[color.index()].as_mut()?;
        if client.has_disconnected {
            return None;
        }
        client.has_disconnected = true;

        // A game that never got its first `nextmove` has no winner.
        let winner = match self.state {
            SessionState::InProgress(_) => Some(color.opponent()),
            SessionState::WaitingForPlayers
            | SessionState::Readying
            | SessionState::Finished(_) => None,
        };
        self.finish(GameOverReason::Disconnect, winner)
    }

    /// Enter `Finished`. Returns `None` if the session was already finished.
    pub fn finish(&mut self, reason: GameOverReason, winner: Option<Color>) -> Option<GameResult> {
        if self.is_finished() {
            return None;
        }
        let result = GameResult { reason, winner };
        log::info!(
            "session {}: finished by {reason} after {} plies, winner {winner:?}",
            self.id,
            self.kif.len()
        );
        self.state = SessionState::Finished(reason);
        self.result = Some(result);
        Some(result)
    }

    pub fn add_viewer(&mut self, connection: ConnectionId, out: &mut dyn Outbox) {
        if !self.viewers.contains(&connection) {
            self.viewers.push(connection);
        }
        out.send(connection, &ServerMessage::Display(self.display_info()));
    }

    pub fn remove_viewer(&mut self, connection: ConnectionId) {
        self.viewers.retain(|v| *v != connection);
    }

    pub fn broadcast_display(&self, out: &mut dyn Outbox) {
        if !self.viewers.is_empty() {
            out.send_all(&self.viewers, &ServerMessage::Display(self.display_info()));
        }
    }

    pub fn display_info(&self) -> DisplayInfo {
        DisplayInfo {
            svg: self.board.svg(),
            kif: self.kif.display_lines(),
            sente: self.kif.name(Color::Black).to_owned(),
            gote: self.kif.name(Color::White).to_owned(),
            timelimit: self.clock.time_control(),
            side_to_move: u8::from(self.board.side_to_move() == Color::White),
            ongoing: matches!(self.state, SessionState::InProgress(_)),
            gameover: self.gameover_label(),
        }
    }

    pub fn matching_entry(&self) -> MatchingEntry {
        MatchingEntry {
            gameover: self.gameover_label(),
            ongoing: matches!(self.state, SessionState::InProgress(_)),
            link: format!("/display/{}", self.id),
            player1: self.kif.name(Color::Black).to_owned(),
            player2: self.kif.name(Color::White).to_owned(),
        }
    }

    fn gameover_label(&self) -> String {
        self.result
            .map(|r| r.reason.as_str().to_owned())
            .unwrap_or_default()
    }

    /// Start `color`'s clock and ask its seat for a move.
    fn begin_turn(&mut self, color: Color, now: Instant, out: &mut dyn Outbox) {
        self.state = SessionState::InProgress(color);
        self.clock.start_turn(color, now);
        if let Some(client) = self.seat(color) {
            let msg = ServerMessage::NextMove {
                position: self.kif.position(),
                time: self.clock.time_control(),
            };
            out.send(client.connection, &msg);
        }
        self.broadcast_display(out);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::board::BoardFactory;
    use crate::board::mock::MockBoardFactory;
    use crate::config::DEFAULT_START_SFEN;
    use crate::transport::MemoryOutbox;

    const A: ConnectionId = ConnectionId(1);
    const B: ConnectionId = ConnectionId(2);
    const VIEWER: ConnectionId = ConnectionId(9);

    const TIME: TimeControl = TimeControl {
        btime: 10_000,
        wtime: 10_000,
        byoyomi: 5_000,
        binc: 0,
        winc: 0,
    };

    fn request(name: &str) -> SeatRequest {
        SeatRequest {
            name: name.into(),
            author: "tester".into(),
        }
    }

    fn session_with(factory: &MockBoardFactory, rule: SennichiteRule) -> MatchSession {
        MatchSession::new(
            SessionId(0),
            factory.new_board(),
            DEFAULT_START_SFEN,
            &TIME,
            rule,
            None,
        )
        .unwrap()
    }

    /// Seat A (Black) and B (White), ready both, return the start instant.
    fn started(session: &mut MatchSession, out: &mut MemoryOutbox) -> Instant {
        session
            .take_seat(A, request("Alpha"), Color::Black, out)
            .unwrap();
        session
            .take_seat(B, request("Beta"), Color::White, out)
            .unwrap();
        let t0 = Instant::now();
        session.ready_ok(A, t0, out).unwrap();
        session.ready_ok(B, t0, out).unwrap();
        t0
    }

    #[test]
    fn second_seat_triggers_isready() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();

        session
            .take_seat(A, request("Alpha"), Color::Black, &mut out)
            .unwrap();
        assert_eq!(session.state(), SessionState::WaitingForPlayers);
        assert!(session.is_open());

        session
            .take_seat(B, request("Beta"), Color::White, &mut out)
            .unwrap();
        assert_eq!(session.state(), SessionState::Readying);
        assert!(out.to(A).contains(&&ServerMessage::Isready));
        assert!(out.to(B).contains(&&ServerMessage::Isready));
    }

    #[test]
    fn taken_seat_is_refused() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        session
            .take_seat(A, request("Alpha"), Color::Black, &mut out)
            .unwrap();
        assert_eq!(
            session.take_seat(B, request("Beta"), Color::Black, &mut out),
            Err(Rejection::SeatTaken)
        );
        assert_eq!(session.seated_count(), 1);
    }

    #[test]
    fn both_readyok_starts_game_for_first_mover() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        session
            .take_seat(A, request("Alpha"), Color::Black, &mut out)
            .unwrap();
        session
            .take_seat(B, request("Beta"), Color::White, &mut out)
            .unwrap();
        out.take();

        let t0 = Instant::now();
        session.ready_ok(A, t0, &mut out).unwrap();
        assert_eq!(session.state(), SessionState::Readying);
        session.ready_ok(B, t0, &mut out).unwrap();
        assert_eq!(session.state(), SessionState::InProgress(Color::Black));

        let to_a = out.to(A);
        assert_eq!(to_a[0], &ServerMessage::Usinewgame);
        match to_a[1] {
            ServerMessage::NextMove { position, time } => {
                assert_eq!(position.sfen, DEFAULT_START_SFEN);
                assert!(position.moves.is_empty());
                assert_eq!(*time, TIME);
            }
            other => panic!("expected NextMove, got {other:?}"),
        }
        assert_eq!(out.to(B), vec![&ServerMessage::Usinewgame]);
    }

    #[test]
    fn bestmove_before_game_is_rejected() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        session
            .take_seat(A, request("Alpha"), Color::Black, &mut out)
            .unwrap();
        let err = session
            .best_move(A, "5e4d", Instant::now(), &mut out)
            .unwrap_err();
        assert_eq!(err, Rejection::WrongState(SessionState::WaitingForPlayers));
        assert_eq!(session.state(), SessionState::WaitingForPlayers);
        assert_eq!(session.kif().len(), 0);
    }

    #[test]
    fn moves_alternate_and_are_recorded() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        let t0 = started(&mut session, &mut out);
        out.take();

        let t1 = t0 + Duration::from_millis(1_500);
        assert_eq!(session.best_move(A, "5e4d", t1, &mut out), Ok(None));
        assert_eq!(session.state(), SessionState::InProgress(Color::White));
        assert_eq!(session.clock().remaining(Color::Black), 8_500);

        match out.to(B)[0] {
            ServerMessage::NextMove { position, time } => {
                assert_eq!(position.moves, vec!["5e4d".to_owned()]);
                assert_eq!(time.btime, 8_500);
            }
            other => panic!("expected NextMove, got {other:?}"),
        }

        let t2 = t1 + Duration::from_millis(700);
        assert_eq!(session.best_move(B, "1a2b", t2, &mut out), Ok(None));
        assert_eq!(session.kif().elapsed_times(), vec![1_500, 700]);
        assert_eq!(session.kif().len(), session.board_ply());
    }

    #[test]
    fn stale_bestmove_from_wrong_seat_is_discarded() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        let t0 = started(&mut session, &mut out);

        assert_eq!(
            session.best_move(B, "1a2b", t0, &mut out),
            Err(Rejection::NotYourTurn)
        );
        assert_eq!(session.state(), SessionState::InProgress(Color::Black));
        assert_eq!(session.board_ply(), 0);
    }

    #[test]
    fn resign_finishes_for_opponent() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        let t0 = started(&mut session, &mut out);

        let result = session.best_move(A, RESIGN, t0, &mut out).unwrap().unwrap();
        assert_eq!(result.reason, GameOverReason::Resign);
        assert_eq!(result.winner, Some(Color::White));
        assert_eq!(session.winner(), Some(Color::White));
        assert_eq!(
            session.state(),
            SessionState::Finished(GameOverReason::Resign)
        );
    }

    #[test]
    fn move_outside_legal_set_is_illegal() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        let t0 = started(&mut session, &mut out);

        let result = session.best_move(A, "9a9b", t0, &mut out).unwrap().unwrap();
        assert_eq!(result.reason, GameOverReason::IllegalMove);
        assert_eq!(result.winner, Some(Color::White));
        assert_eq!(session.board_ply(), 0);
    }

    #[test]
    fn overrun_by_one_ms_is_time_up_and_move_not_applied() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        let t0 = started(&mut session, &mut out);

        let late = t0 + Duration::from_millis(TIME.btime + TIME.byoyomi + 1);
        let result = session.best_move(A, "5e4d", late, &mut out).unwrap().unwrap();
        assert_eq!(result.reason, GameOverReason::TimeUp);
        assert_eq!(session.board_ply(), 0);
        assert_eq!(session.kif().len(), 0);
    }

    #[test]
    fn exactly_at_byoyomi_limit_is_in_time() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        let t0 = started(&mut session, &mut out);

        let edge = t0 + Duration::from_millis(TIME.btime + TIME.byoyomi);
        assert_eq!(session.best_move(A, "5e4d", edge, &mut out), Ok(None));
    }

    #[test]
    fn repetition_by_check_is_illegal_for_mover() {
        let factory = MockBoardFactory::default().with_verdict("2b3b", Repetition::ByCheck);
        let mut session = session_with(&factory, SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        let t0 = started(&mut session, &mut out);

        session.best_move(A, "5e4d", t0, &mut out).unwrap();
        let result = session.best_move(B, "2b3b", t0, &mut out).unwrap().unwrap();
        assert_eq!(result.reason, GameOverReason::IllegalMove);
        assert_eq!(result.winner, Some(Color::Black));
        // The move was played before the verdict.
        assert_eq!(session.kif().len(), 2);
    }

    #[test]
    fn plain_repetition_follows_rule() {
        let factory = MockBoardFactory::default().with_verdict("2b3b", Repetition::Plain);

        let mut draw = session_with(&factory, SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        let t0 = started(&mut draw, &mut out);
        draw.best_move(A, "5e4d", t0, &mut out).unwrap();
        let result = draw.best_move(B, "2b3b", t0, &mut out).unwrap().unwrap();
        assert_eq!(result.reason, GameOverReason::Sennichite);
        assert_eq!(result.winner, None);

        let mut strict = session_with(&factory, SennichiteRule::MoverLoses);
        let t0 = started(&mut strict, &mut out);
        strict.best_move(A, "5e4d", t0, &mut out).unwrap();
        let result = strict.best_move(B, "2b3b", t0, &mut out).unwrap().unwrap();
        assert_eq!(result.winner, Some(Color::Black));
    }

    #[test]
    fn disconnect_is_idempotent_and_first_finish_wins() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        let t0 = started(&mut session, &mut out);

        let result = session.disconnect(B).unwrap();
        assert_eq!(result.reason, GameOverReason::Disconnect);
        assert_eq!(result.winner, Some(Color::Black));

        assert_eq!(session.disconnect(B), None);
        assert_eq!(session.live_seats(), vec![A]);
        assert_eq!(session.disconnect(A), None);
        assert_eq!(
            session.best_move(A, "5e4d", t0, &mut out),
            Err(Rejection::WrongState(SessionState::Finished(
                GameOverReason::Disconnect
            )))
        );
        assert_eq!(session.finish(GameOverReason::TimeUp, None), None);
        assert!(session.live_seats().is_empty());
    }

    #[test]
    fn lone_seat_disconnect_has_no_winner() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        session
            .take_seat(A, request("Alpha"), Color::Black, &mut out)
            .unwrap();
        let result = session.disconnect(A).unwrap();
        assert_eq!(result.winner, None);
    }

    #[test]
    fn disconnect_before_both_ready_has_no_winner() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        session
            .take_seat(A, request("Alpha"), Color::Black, &mut out)
            .unwrap();
        session
            .take_seat(B, request("Beta"), Color::White, &mut out)
            .unwrap();
        session.ready_ok(A, Instant::now(), &mut out).unwrap();
        assert_eq!(session.state(), SessionState::Readying);

        let result = session.disconnect(B).unwrap();
        assert_eq!(result.reason, GameOverReason::Disconnect);
        assert_eq!(result.winner, None);
        assert_eq!(session.winner(), None);
    }

    #[test]
    fn viewers_get_snapshots_and_leave_independently() {
        let mut session = session_with(&MockBoardFactory::default(), SennichiteRule::Draw);
        let mut out = MemoryOutbox::default();
        session.add_viewer(VIEWER, &mut out);
        match out.to(VIEWER)[0] {
            ServerMessage::Display(info) => {
                assert!(!info.ongoing);
                assert_eq!(info.gameover, "");
            }
            other => panic!("expected Display, got {other:?}"),
        }

        let t0 = started(&mut session, &mut out);
        session.best_move(A, "5e4d", t0, &mut out).unwrap();
        let displays = out
            .to(VIEWER)
            .into_iter()
            .filter(|m| matches!(m, ServerMessage::Display(_)))
            .count();
        assert_eq!(displays, 3);

        assert_eq!(session.disconnect(VIEWER), None);
        assert!(session.viewers().is_empty());
        assert_eq!(session.state(), SessionState::InProgress(Color::White));
    }
}
