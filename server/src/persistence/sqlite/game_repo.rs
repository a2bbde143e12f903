//! SQLite-backed repository for games.

use chess::Game;
use sqlx::SqlitePool;

use super::helpers::{decode_phase, encode_phase};
use crate::persistence::traits::GameRepository;
use crate::persistence::{now_timestamp, GameId, GameRecord, GameSummary, PersistenceError};

type GameRow = (i64, String, Option<String>, Option<String>, String, String, Option<String>);

/// SQLite implementation of [`GameRepository`].
pub struct SqliteGameRepository {
    pool: SqlitePool,
}

impl SqliteGameRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn decode_row(row: GameRow) -> Result<GameRecord, PersistenceError> {
    let (game_id, name, white_username, black_username, fen, status, winner) = row;
    let corrupt = |reason: String| PersistenceError::Corrupt { game_id, reason };

    let parsed = Game::from_fen(&fen).map_err(|e| corrupt(e.to_string()))?;
    let phase = decode_phase(&status, winner.as_deref())
        .ok_or_else(|| corrupt(format!("unknown status {status:?}")))?;

    Ok(GameRecord {
        game_id,
        name,
        white_username,
        black_username,
        game: Game::restore(parsed.board().clone(), parsed.turn(), phase),
    })
}

impl GameRepository for SqliteGameRepository {
    async fn create_game(
        &self,
        name: &str,
        white_username: Option<&str>,
        black_username: Option<&str>,
    ) -> Result<GameId, PersistenceError> {
        let now = now_timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO games
                (name, white_username, black_username, fen, status, winner, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'Active', NULL, ?, ?)
            "#,
        )
        .bind(name)
        .bind(white_username)
        .bind(black_username)
        .bind(Game::new().to_fen())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn load_game(&self, game_id: GameId) -> Result<GameRecord, PersistenceError> {
        let row: Option<GameRow> = sqlx::query_as(
            r#"
            SELECT game_id, name, white_username, black_username, fen, status, winner
            FROM games
            WHERE game_id = ?
            "#,
        )
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_row)
            .unwrap_or(Err(PersistenceError::GameNotFound(game_id)))
    }

    async fn save_game(&self, record: &GameRecord) -> Result<(), PersistenceError> {
        let (status, winner) = encode_phase(record.game.phase());

        let result = sqlx::query(
            r#"
            UPDATE games
            SET name = ?, white_username = ?, black_username = ?,
                fen = ?, status = ?, winner = ?, updated_at = ?
            WHERE game_id = ?
            "#,
        )
        .bind(&record.name)
        .bind(&record.white_username)
        .bind(&record.black_username)
        .bind(record.game.to_fen())
        .bind(status)
        .bind(winner)
        .bind(now_timestamp())
        .bind(record.game_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::GameNotFound(record.game_id));
        }
        Ok(())
    }

    async fn list_games(&self) -> Result<Vec<GameSummary>, PersistenceError> {
        let rows: Vec<(i64, Option<String>, Option<String>, String)> = sqlx::query_as(
            r#"
            SELECT game_id, white_username, black_username, name
            FROM games
            ORDER BY game_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(game_id, white_username, black_username, name)| GameSummary {
                game_id,
                white_username,
                black_username,
                name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::Database;
    use chess::{Color, EndReason, GamePhase, Move};

    async fn repo() -> SqliteGameRepository {
        let db = Database::new_in_memory().await.unwrap();
        SqliteGameRepository::new(db.pool().clone())
    }

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_load_fresh_game() {
        let repo = repo().await;
        let id = repo.create_game("open", Some("alice"), None).await.unwrap();
        let record = repo.load_game(id).await.unwrap();
        assert_eq!(record.name, "open");
        assert_eq!(record.white_username.as_deref(), Some("alice"));
        assert_eq!(record.black_username, None);
        assert_eq!(record.game, Game::new());
    }

    #[tokio::test]
    async fn test_save_persists_board_and_turn() {
        let repo = repo().await;
        let id = repo.create_game("g", Some("a"), Some("b")).await.unwrap();
        let mut record = repo.load_game(id).await.unwrap();
        record.game.make_move(mv("e2e4")).unwrap();
        record.game.make_move(mv("c7c5")).unwrap();
        repo.save_game(&record).await.unwrap();

        let reloaded = repo.load_game(id).await.unwrap();
        assert_eq!(reloaded.game.board(), record.game.board());
        assert_eq!(reloaded.game.turn(), Color::White);
        assert_eq!(reloaded.game.phase(), GamePhase::Active);
    }

    #[tokio::test]
    async fn test_resigned_game_stays_terminal() {
        let repo = repo().await;
        let id = repo.create_game("g", Some("a"), Some("b")).await.unwrap();
        let mut record = repo.load_game(id).await.unwrap();
        record.game.resign(Color::White).unwrap();
        repo.save_game(&record).await.unwrap();

        let reloaded = repo.load_game(id).await.unwrap();
        assert!(reloaded.game.is_over());
        assert_eq!(
            reloaded.game.phase(),
            GamePhase::Ended {
                reason: EndReason::Resigned,
                winner: Some(Color::Black)
            }
        );
    }

    #[tokio::test]
    async fn test_missing_game() {
        let repo = repo().await;
        assert!(matches!(
            repo.load_game(99).await,
            Err(PersistenceError::GameNotFound(99))
        ));
        let ghost = GameRecord::new(99, "ghost", None, None);
        assert!(matches!(
            repo.save_game(&ghost).await,
            Err(PersistenceError::GameNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_fen_is_reported() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = SqliteGameRepository::new(db.pool().clone());
        let id = repo.create_game("g", None, None).await.unwrap();
        sqlx::query("UPDATE games SET fen = 'not a board' WHERE game_id = ?")
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();
        assert!(matches!(
            repo.load_game(id).await,
            Err(PersistenceError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_games() {
        let repo = repo().await;
        repo.create_game("first", Some("a"), Some("b")).await.unwrap();
        repo.create_game("second", None, Some("c")).await.unwrap();
        let games = repo.list_games().await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].name, "first");
        assert_eq!(games[1].black_username.as_deref(), Some("c"));
        assert_eq!(games[1].white_username, None);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chessroom.db");
        let id = {
            let db = Database::open(&path).await.unwrap();
            let repo = SqliteGameRepository::new(db.pool().clone());
            let id = repo.create_game("g", Some("a"), Some("b")).await.unwrap();
            let mut record = repo.load_game(id).await.unwrap();
            record.game.make_move(mv("d2d4")).unwrap();
            repo.save_game(&record).await.unwrap();
            db.pool().close().await;
            id
        };

        let db = Database::open(&path).await.unwrap();
        let repo = SqliteGameRepository::new(db.pool().clone());
        let record = repo.load_game(id).await.unwrap();
        assert_eq!(record.game.turn(), Color::Black);
    }
}
