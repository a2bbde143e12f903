//! HTTP surface: the `/ws` room socket, read-only game lookups and a
//! `/health` check.

mod socket;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::identity::IdentityProvider;
use crate::persistence::{GameId, GameRepository, GameSummary, PersistenceError};
use crate::session::{GameSnapshot, SessionRegistry};

type Registry<G, I> = State<Arc<SessionRegistry<G, I>>>;

pub fn router<G, I>(registry: Arc<SessionRegistry<G, I>>) -> Router
where
    G: GameRepository + 'static,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route("/ws", get(socket::ws_handler::<G, I>))
        .route("/games", get(list_games::<G, I>))
        .route("/games/{game_id}", get(game_snapshot::<G, I>))
        .route("/health", get(health))
        .with_state(registry)
}

async fn health() -> &'static str {
    "ok"
}

async fn list_games<G, I>(State(registry): Registry<G, I>) -> Result<Json<Vec<GameSummary>>, StatusCode>
where
    G: GameRepository + 'static,
    I: IdentityProvider + 'static,
{
    registry.list_games().await.map(Json).map_err(status_for)
}

async fn game_snapshot<G, I>(
    State(registry): Registry<G, I>,
    Path(game_id): Path<GameId>,
) -> Result<Json<GameSnapshot>, StatusCode>
where
    G: GameRepository + 'static,
    I: IdentityProvider + 'static,
{
    registry
        .game_snapshot(game_id)
        .await
        .map(Json)
        .map_err(status_for)
}

fn status_for(err: PersistenceError) -> StatusCode {
    match err {
        PersistenceError::GameNotFound(_) => StatusCode::NOT_FOUND,
        err => {
            tracing::error!(error = %err, "Game lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
