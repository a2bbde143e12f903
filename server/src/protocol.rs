//! JSON wire format of the room protocol.
//!
//! Client frames are tagged by `type` (`CONNECT`, `MAKE_MOVE`, `RESIGN`,
//! `LEAVE`) and carry `gameId` and `authToken`. Server frames are
//! `LOAD_GAME`, `NOTIFICATION` and `ERROR`.

use chess::Move;
use serde::{Deserialize, Serialize};

use crate::persistence::GameId;
use crate::session::{GameSnapshot, SessionError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClientCommand {
    Connect {
        game_id: GameId,
        auth_token: String,
    },
    MakeMove {
        game_id: GameId,
        auth_token: String,
        #[serde(rename = "move")]
        mv: Move,
    },
    Resign {
        game_id: GameId,
        auth_token: String,
    },
    Leave {
        game_id: GameId,
        auth_token: String,
    },
}

impl ClientCommand {
    pub fn game_id(&self) -> GameId {
        match self {
            Self::Connect { game_id, .. }
            | Self::MakeMove { game_id, .. }
            | Self::Resign { game_id, .. }
            | Self::Leave { game_id, .. } => *game_id,
        }
    }

    pub fn auth_token(&self) -> &str {
        match self {
            Self::Connect { auth_token, .. }
            | Self::MakeMove { auth_token, .. }
            | Self::Resign { auth_token, .. }
            | Self::Leave { auth_token, .. } => auth_token,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "CONNECT",
            Self::MakeMove { .. } => "MAKE_MOVE",
            Self::Resign { .. } => "RESIGN",
            Self::Leave { .. } => "LEAVE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    LoadGame {
        game: GameSnapshot,
    },
    Notification {
        message: String,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

impl ServerMessage {
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }

    pub fn error(err: &SessionError) -> Self {
        Self::Error {
            error_message: format!("Error: {err}"),
        }
    }
}

/// Decode one text frame. Off-board squares are rejected here so the engine
/// only ever sees addressable positions.
pub fn parse_command(text: &str) -> Result<ClientCommand, SessionError> {
    let cmd: ClientCommand =
        serde_json::from_str(text).map_err(|e| SessionError::Protocol(e.to_string()))?;

    if let ClientCommand::MakeMove { mv, .. } = &cmd {
        for square in [mv.start, mv.end] {
            if !square.is_on_board() {
                return Err(SessionError::Protocol(format!(
                    "square {square} is off the board"
                )));
            }
        }
    }
    Ok(cmd)
}
