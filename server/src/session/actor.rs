use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tracing::Instrument;

use super::commands::{RoomCommand, SessionError};
use super::connection::ConnectionId;
use super::state::RoomState;
use crate::persistence::GameRepository;

/// The room actor loop.
/// Owns the room's game and membership and runs commands one at a time, so
/// every mutation of a game is serialized without locks.
pub(crate) async fn run_room_actor<G: GameRepository>(
    state: RoomState,
    repo: Arc<G>,
    cmd_rx: mpsc::Receiver<RoomCommand>,
    idle_ttl: Duration,
) {
    let game_id = state.game_id();
    run_room_actor_inner(state, repo, cmd_rx, idle_ttl)
        .instrument(tracing::info_span!("room", game_id))
        .await;
}

async fn run_room_actor_inner<G: GameRepository>(
    mut state: RoomState,
    repo: Arc<G>,
    mut cmd_rx: mpsc::Receiver<RoomCommand>,
    idle_ttl: Duration,
) {
    tracing::info!("Room actor started");

    loop {
        let deadline = state.idle_since().map(|since| since + idle_ttl);

        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => handle_command(&mut state, &*repo, cmd).await,
                    None => break,
                }
            }

            _ = time::sleep_until(deadline.unwrap_or_else(time::Instant::now)), if deadline.is_some() => {
                tracing::info!(idle_secs = idle_ttl.as_secs(), "Room idle, unloading");
                break;
            }
        }
    }

    // Anything queued behind the shutdown is bounced; the registry retries it
    // against a fresh room.
    cmd_rx.close();
    while let Some(cmd) = cmd_rx.recv().await {
        cmd.reject(SessionError::Internal("Room closed".into()));
    }

    tracing::info!("Room actor exited");
}

async fn handle_command<G: GameRepository>(state: &mut RoomState, repo: &G, cmd: RoomCommand) {
    match cmd {
        RoomCommand::Connect {
            conn,
            username,
            outbox,
            reply,
        } => {
            tracing::info!(%conn, %username, "Connect");
            state.connect(conn, username, outbox);
            let _ = reply.send(Ok(()));
        }
        RoomCommand::MakeMove {
            conn,
            username,
            mv,
            reply,
        } => {
            let result = make_move(state, repo, conn, &username, mv).await;
            match &result {
                Ok(()) => tracing::info!(%username, %mv, "Move committed"),
                Err(e) => tracing::debug!(%username, %mv, error = %e, "Move rejected"),
            }
            let _ = reply.send(result);
        }
        RoomCommand::Resign { username, reply } => {
            let result = resign(state, repo, &username).await;
            match &result {
                Ok(()) => tracing::info!(%username, "Resigned"),
                Err(e) => tracing::debug!(%username, error = %e, "Resign rejected"),
            }
            let _ = reply.send(result);
        }
        RoomCommand::Leave { conn, reply } => {
            let result = state.leave(conn);
            tracing::info!(%conn, members = state.member_count(), "Leave");
            let _ = reply.send(result);
        }
        RoomCommand::Disconnect { conn } => {
            if state.leave(conn).is_ok() {
                tracing::info!(%conn, members = state.member_count(), "Connection dropped, removed from room");
            }
        }
        RoomCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
    }
}

/// Validate on a copy, persist, and only then install and broadcast.
async fn make_move<G: GameRepository>(
    state: &mut RoomState,
    repo: &G,
    conn: ConnectionId,
    username: &str,
    mv: chess::Move,
) -> Result<(), SessionError> {
    state.authorize_move(username)?;
    let (next, outcome) = state.try_move(mv)?;
    repo.save_game(&next).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to persist move");
        SessionError::from(e)
    })?;
    state.commit_move(next, conn, username, &outcome);
    Ok(())
}

async fn resign<G: GameRepository>(
    state: &mut RoomState,
    repo: &G,
    username: &str,
) -> Result<(), SessionError> {
    let color = state.authorize_resign(username)?;
    let next = state.try_resign(color)?;
    repo.save_game(&next).await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to persist resignation");
        SessionError::from(e)
    })?;
    state.commit_resign(next, username);
    Ok(())
}
