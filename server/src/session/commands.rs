use chess::Move;
use tokio::sync::oneshot;

use super::connection::{ConnectionId, Outbox};
use super::snapshot::GameSnapshot;
use crate::persistence::{GameId, PersistenceError};

/// Why a room command was rejected. Delivered only to the requesting
/// connection, never broadcast.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("bad request: {0}")]
    Protocol(String),
    #[error("unauthorized")]
    Auth,
    #[error("observers cannot {0}")]
    Authorization(&'static str),
    #[error("{0}")]
    IllegalMove(String),
    #[error("game is over")]
    TerminalRoom,
    #[error("storage failure: {0}")]
    Persistence(String),
    #[error("not connected to game {0}")]
    NotConnected(GameId),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PersistenceError> for SessionError {
    fn from(err: PersistenceError) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Commands sent to a room actor. Each embeds a oneshot for the reply,
/// except `Disconnect`, which nobody waits on.
pub(crate) enum RoomCommand {
    Connect {
        conn: ConnectionId,
        username: String,
        outbox: Outbox,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    MakeMove {
        conn: ConnectionId,
        username: String,
        mv: Move,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Resign {
        username: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Disconnect {
        conn: ConnectionId,
    },
    GetSnapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
}

impl RoomCommand {
    /// Answer a command the actor will never run.
    pub(crate) fn reject(self, err: SessionError) {
        match self {
            Self::Connect { reply, .. }
            | Self::MakeMove { reply, .. }
            | Self::Resign { reply, .. }
            | Self::Leave { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            // Dropping the sender is the only answer these have.
            Self::Disconnect { .. } | Self::GetSnapshot { .. } => {}
        }
    }
}
