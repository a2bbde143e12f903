//! Async repository trait for the games a room is built from.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send`, which room actors spawned with
//! `tokio::spawn` require. Backends are used through static dispatch
//! (the session registry is generic over the repository).

use std::future::Future;

use super::{GameId, GameRecord, GameSummary, PersistenceError};

/// Repository for games and their seat bindings.
///
/// `save_game` is the commit point for a room: a move or resignation is
/// only broadcast after it returns `Ok`.
pub trait GameRepository: Send + Sync {
    fn create_game(
        &self,
        name: &str,
        white_username: Option<&str>,
        black_username: Option<&str>,
    ) -> impl Future<Output = Result<GameId, PersistenceError>> + Send;
    fn load_game(
        &self,
        game_id: GameId,
    ) -> impl Future<Output = Result<GameRecord, PersistenceError>> + Send;
    fn save_game(
        &self,
        record: &GameRecord,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn list_games(&self) -> impl Future<Output = Result<Vec<GameSummary>, PersistenceError>> + Send;
}
