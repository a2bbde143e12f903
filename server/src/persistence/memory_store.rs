//! In-process game store.

use std::collections::BTreeMap;

use tokio::sync::RwLock;

use super::traits::GameRepository;
use super::{GameId, GameRecord, GameSummary, PersistenceError};

#[derive(Default)]
struct Inner {
    games: BTreeMap<GameId, GameRecord>,
    next_id: GameId,
}

/// [`GameRepository`] backed by a map. Ids start at 1.
#[derive(Default)]
pub struct MemoryGameStore {
    inner: RwLock<Inner>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameRepository for MemoryGameStore {
    async fn create_game(
        &self,
        name: &str,
        white_username: Option<&str>,
        black_username: Option<&str>,
    ) -> Result<GameId, PersistenceError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let game_id = inner.next_id;
        let record = GameRecord::new(
            game_id,
            name,
            white_username.map(str::to_owned),
            black_username.map(str::to_owned),
        );
        inner.games.insert(game_id, record);
        Ok(game_id)
    }

    async fn load_game(&self, game_id: GameId) -> Result<GameRecord, PersistenceError> {
        self.inner
            .read()
            .await
            .games
            .get(&game_id)
            .cloned()
            .ok_or(PersistenceError::GameNotFound(game_id))
    }

    async fn save_game(&self, record: &GameRecord) -> Result<(), PersistenceError> {
        let mut inner = self.inner.write().await;
        let slot = inner
            .games
            .get_mut(&record.game_id)
            .ok_or(PersistenceError::GameNotFound(record.game_id))?;
        *slot = record.clone();
        Ok(())
    }

    async fn list_games(&self) -> Result<Vec<GameSummary>, PersistenceError> {
        Ok(self
            .inner
            .read()
            .await
            .games
            .values()
            .map(GameRecord::summary)
            .collect())
    }
}
