//! One-shot administrative commands against the SQLite store.
//!
//! Account and game management live outside this server; these commands are
//! the minimal producers needed to seat players and hand out tokens.

use crate::config::{Command, GamesAction, TokensAction};
use crate::identity::MemoryIdentityStore;
use crate::persistence::sqlite::{Database, SqliteAuthRepository, SqliteGameRepository};
use crate::persistence::{GameId, GameRepository, MemoryGameStore};

pub async fn run(db: &Database, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Games { action } => {
            let games = SqliteGameRepository::new(db.pool().clone());
            match action {
                GamesAction::Create { name, white, black } => {
                    let game_id = games
                        .create_game(&name, white.as_deref(), black.as_deref())
                        .await?;
                    tracing::info!(game_id, %name, "Created game");
                    println!("{game_id}");
                }
                GamesAction::List => {
                    for summary in games.list_games().await? {
                        println!("{}", serde_json::to_string(&summary)?);
                    }
                }
            }
        }
        Command::Tokens { action } => {
            let auth = SqliteAuthRepository::new(db.pool().clone());
            match action {
                TokensAction::Issue { username } => {
                    let token = auth.issue_token(&username).await?;
                    tracing::info!(%username, "Issued token");
                    println!("{token}");
                }
                TokensAction::Revoke { token } => {
                    if !auth.revoke_token(&token).await? {
                        anyhow::bail!("unknown token");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Seed a throwaway in-memory store with one game between `white` and
/// `black`, returning the game id and both tokens.
pub async fn seed_demo(
    games: &MemoryGameStore,
    identity: &MemoryIdentityStore,
) -> anyhow::Result<(GameId, String, String)> {
    let game_id = games.create_game("demo", Some("white"), Some("black")).await?;
    let white = identity.issue_token("white").await;
    let black = identity.issue_token("black").await;
    Ok((game_id, white, black))
}
