use chess::Move;
use tokio::sync::{mpsc, oneshot};

use super::commands::{RoomCommand, SessionError};
use super::connection::{ConnectionId, Outbox};
use super::snapshot::GameSnapshot;
use crate::persistence::GameId;

/// Cheap, cloneable handle to a room actor.
#[derive(Clone)]
pub struct RoomHandle {
    game_id: GameId,
    cmd_tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub(crate) fn new(game_id: GameId, cmd_tx: mpsc::Sender<RoomCommand>) -> Self {
        Self { game_id, cmd_tx }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// True once the actor has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    pub async fn connect(
        &self,
        conn: ConnectionId,
        username: String,
        outbox: Outbox,
    ) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Connect {
            conn,
            username,
            outbox,
            reply: tx,
        })
        .await?;
        rx.await.map_err(reply_dropped)?
    }

    pub async fn make_move(
        &self,
        conn: ConnectionId,
        username: String,
        mv: Move,
    ) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::MakeMove {
            conn,
            username,
            mv,
            reply: tx,
        })
        .await?;
        rx.await.map_err(reply_dropped)?
    }

    pub async fn resign(&self, username: String) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Resign { username, reply: tx })
            .await?;
        rx.await.map_err(reply_dropped)?
    }

    pub async fn leave(&self, conn: ConnectionId) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Leave { conn, reply: tx }).await?;
        rx.await.map_err(reply_dropped)?
    }

    /// Drop `conn` from the room without waiting for the actor.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let _ = self.cmd_tx.send(RoomCommand::Disconnect { conn }).await;
    }

    pub async fn get_snapshot(&self) -> Result<GameSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::GetSnapshot { reply: tx }).await?;
        rx.await.map_err(reply_dropped)
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), SessionError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::Internal("Room actor closed".into()))
    }
}

fn reply_dropped(_: oneshot::error::RecvError) -> SessionError {
    SessionError::Internal("Reply dropped".into())
}
