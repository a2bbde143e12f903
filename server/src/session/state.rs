use std::collections::HashMap;

use chess::{Color, Move, MoveOutcome};
use tokio::time::Instant;

use super::commands::SessionError;
use super::connection::{ConnectionId, Outbox};
use super::snapshot::GameSnapshot;
use crate::persistence::{GameId, GameRecord};
use crate::protocol::ServerMessage;

struct Member {
    username: String,
    outbox: Outbox,
}

/// Internal mutable state, owned entirely by the room actor. No locks.
pub(crate) struct RoomState {
    record: GameRecord,
    members: HashMap<ConnectionId, Member>,
    /// When membership last became empty; `None` while anyone is connected.
    idle_since: Option<Instant>,
}

impl RoomState {
    pub fn new(record: GameRecord) -> Self {
        Self {
            record,
            members: HashMap::new(),
            idle_since: Some(Instant::now()),
        }
    }

    pub fn game_id(&self) -> GameId {
        self.record.game_id
    }

    pub fn idle_since(&self) -> Option<Instant> {
        self.idle_since
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::of(&self.record)
    }

    /// Register `conn`, replacing any earlier registration of the same
    /// connection, send it the board and announce it to everyone else.
    pub fn connect(&mut self, conn: ConnectionId, username: String, outbox: Outbox) {
        let _ = outbox.send(ServerMessage::LoadGame {
            game: self.snapshot(),
        });
        let notice = ServerMessage::notification(format!("{username} connected"));
        self.members.insert(conn, Member { username, outbox });
        self.idle_since = None;
        self.broadcast_except(conn, &notice);
    }

    /// Unregister `conn` and tell the remaining members who left.
    pub fn leave(&mut self, conn: ConnectionId) -> Result<(), SessionError> {
        let member = self
            .members
            .remove(&conn)
            .ok_or(SessionError::NotConnected(self.record.game_id))?;
        if self.members.is_empty() {
            self.idle_since = Some(Instant::now());
        }
        self.broadcast(&ServerMessage::notification(format!(
            "{} left",
            member.username
        )));
        Ok(())
    }

    /// Colour `username` may move with right now.
    pub fn authorize_move(&self, username: &str) -> Result<Color, SessionError> {
        let game = &self.record.game;
        if game.is_over() {
            return Err(SessionError::TerminalRoom);
        }
        let turn = game.turn();
        if self.record.holds_seat(username, turn) {
            Ok(turn)
        } else if self.record.holds_seat(username, turn.opposite()) {
            Err(SessionError::IllegalMove("not your turn".into()))
        } else {
            Err(SessionError::Authorization("move"))
        }
    }

    /// Colour `username` resigns for. A user holding both seats resigns the
    /// side to move.
    pub fn authorize_resign(&self, username: &str) -> Result<Color, SessionError> {
        let game = &self.record.game;
        if game.is_over() {
            return Err(SessionError::TerminalRoom);
        }
        [game.turn(), game.turn().opposite()]
            .into_iter()
            .find(|&color| self.record.holds_seat(username, color))
            .ok_or(SessionError::Authorization("resign"))
    }

    /// Validate `mv` against a copy of the record. Nothing is committed.
    pub fn try_move(&self, mv: Move) -> Result<(GameRecord, MoveOutcome), SessionError> {
        let mut next = self.record.clone();
        let outcome = next
            .game
            .make_move(mv)
            .map_err(|e| SessionError::IllegalMove(e.to_string()))?;
        Ok((next, outcome))
    }

    /// Resign `color` on a copy of the record. Nothing is committed.
    pub fn try_resign(&self, color: Color) -> Result<GameRecord, SessionError> {
        let mut next = self.record.clone();
        next.game.resign(color).map_err(|_| SessionError::TerminalRoom)?;
        Ok(next)
    }

    /// Install a persisted move and fan it out: the board to everyone, the
    /// move text to everyone but the mover, then any check or end notice.
    pub fn commit_move(
        &mut self,
        next: GameRecord,
        mover: ConnectionId,
        username: &str,
        outcome: &MoveOutcome,
    ) {
        self.record = next;
        self.broadcast(&ServerMessage::LoadGame {
            game: self.snapshot(),
        });
        self.broadcast_except(
            mover,
            &ServerMessage::notification(describe_move(username, outcome.mv)),
        );

        let to_move = self.display_name(self.record.game.turn());
        let follow_up = if outcome.checkmate {
            Some(format!("{to_move} is in checkmate"))
        } else if outcome.check {
            Some(format!("{to_move} is in check"))
        } else if outcome.stalemate {
            Some("Game drawn by stalemate".to_owned())
        } else {
            None
        };
        if let Some(text) = follow_up {
            self.broadcast(&ServerMessage::notification(text));
        }
    }

    /// Install a persisted resignation and announce it to the whole room.
    pub fn commit_resign(&mut self, next: GameRecord, username: &str) {
        self.record = next;
        self.broadcast(&ServerMessage::LoadGame {
            game: self.snapshot(),
        });
        self.broadcast(&ServerMessage::notification(format!("{username} resigned")));
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    fn display_name(&self, color: Color) -> String {
        self.record
            .username_for(color)
            .map(str::to_owned)
            .unwrap_or_else(|| color.to_string())
    }

    fn broadcast(&self, msg: &ServerMessage) {
        for member in self.members.values() {
            let _ = member.outbox.send(msg.clone());
        }
    }

    fn broadcast_except(&self, skip: ConnectionId, msg: &ServerMessage) {
        for (id, member) in &self.members {
            if *id != skip {
                let _ = member.outbox.send(msg.clone());
            }
        }
    }
}

/// `alice moved e2 to e4`, with `=Q` appended for a promotion.
fn describe_move(username: &str, mv: Move) -> String {
    let mut text = format!("{username} moved {} to {}", mv.start, mv.end);
    if let Some(kind) = mv.promotion {
        text.push('=');
        text.push(kind.to_char_upper());
    }
    text
}
