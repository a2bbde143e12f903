mod memory_store;
pub mod sqlite;
mod traits;

pub use memory_store::MemoryGameStore;
pub use traits::GameRepository;

use std::time::{SystemTime, UNIX_EPOCH};

use chess::{Color, Game};
use serde::Serialize;

/// Identifier of a stored game, shared by its room.
pub type GameId = i64;

/// A game as the persistence collaborator stores it: the engine state plus
/// the seat bindings that decide who may move or resign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub game_id: GameId,
    pub name: String,
    pub white_username: Option<String>,
    pub black_username: Option<String>,
    pub game: Game,
}

impl GameRecord {
    pub fn new(
        game_id: GameId,
        name: impl Into<String>,
        white_username: Option<String>,
        black_username: Option<String>,
    ) -> Self {
        Self {
            game_id,
            name: name.into(),
            white_username,
            black_username,
            game: Game::new(),
        }
    }

    /// Username bound to `color`, if the seat is taken.
    pub fn username_for(&self, color: Color) -> Option<&str> {
        match color {
            Color::White => self.white_username.as_deref(),
            Color::Black => self.black_username.as_deref(),
        }
    }

    pub fn holds_seat(&self, username: &str, color: Color) -> bool {
        self.username_for(color) == Some(username)
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            game_id: self.game_id,
            white_username: self.white_username.clone(),
            black_username: self.black_username.clone(),
            name: self.name.clone(),
        }
    }
}

/// Listing entry for a stored game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game_id: GameId,
    pub white_username: Option<String>,
    pub black_username: Option<String>,
    pub name: String,
}

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Game not found: {0}")]
    GameNotFound(GameId),
    #[error("Corrupt record for game {game_id}: {reason}")]
    Corrupt { game_id: GameId, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Get the current unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
