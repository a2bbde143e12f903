use chess::{Color, EndReason, GamePhase, Piece};
use serde::Serialize;

use crate::persistence::{GameId, GameRecord};

/// Room status as clients see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Active,
    Checkmate,
    Stalemate,
    Resigned,
}

/// Complete, immutable view of a room's game.
/// Sent as the LOAD_GAME payload on connect and after every commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub game_id: GameId,
    pub name: String,
    pub white_username: Option<String>,
    pub black_username: Option<String>,
    pub fen: String,
    pub turn: Color,
    /// `board[row - 1][col - 1]`, row 1 first.
    pub board: Vec<Vec<Option<Piece>>>,
    pub status: GameStatus,
    pub winner: Option<Color>,
    pub in_check: bool,
}

impl GameSnapshot {
    pub fn of(record: &GameRecord) -> Self {
        let game = &record.game;
        let (status, winner) = match game.phase() {
            GamePhase::Active => (GameStatus::Active, None),
            GamePhase::Ended { reason, winner } => {
                let status = match reason {
                    EndReason::Checkmate => GameStatus::Checkmate,
                    EndReason::Stalemate => GameStatus::Stalemate,
                    EndReason::Resigned => GameStatus::Resigned,
                };
                (status, winner)
            }
        };

        Self {
            game_id: record.game_id,
            name: record.name.clone(),
            white_username: record.white_username.clone(),
            black_username: record.black_username.clone(),
            fen: game.to_fen(),
            turn: game.turn(),
            board: game.board().rows().iter().map(|row| row.to_vec()).collect(),
            status,
            winner,
            in_check: game.is_in_check(game.turn()),
        }
    }
}
