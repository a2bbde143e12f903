mod admin;
mod config;
mod identity;
mod persistence;
mod protocol;
mod service;
mod session;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{Cli, StoreKind};
use identity::{IdentityProvider, MemoryIdentityStore};
use persistence::sqlite::{Database, SqliteAuthRepository, SqliteGameRepository};
use persistence::{GameRepository, MemoryGameStore};
use session::SessionRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref());

    if let Some(command) = cli.command.take() {
        let db_path = cli.database_path();
        let db = Database::open(&db_path)
            .await
            .with_context(|| format!("opening {}", db_path.display()))?;
        return admin::run(&db, command).await;
    }

    tracing::info!("Starting chessroom server");
    let idle_ttl = cli.room_idle_ttl();

    match cli.store {
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; games and tokens are lost on exit");
            let games = Arc::new(MemoryGameStore::new());
            let identity = Arc::new(MemoryIdentityStore::new());
            let (game_id, white, black) = admin::seed_demo(&games, &identity).await?;
            tracing::info!(game_id, %white, %black, "Seeded demo game (white/black tokens)");
            serve(cli.addr, SessionRegistry::new(games, identity, idle_ttl)).await
        }
        StoreKind::Sqlite => {
            let db_path = cli.database_path();
            tracing::info!("Using database: {}", db_path.display());
            let db = Database::open(&db_path)
                .await
                .with_context(|| format!("opening {}", db_path.display()))?;
            let registry = SessionRegistry::new(
                Arc::new(SqliteGameRepository::new(db.pool().clone())),
                Arc::new(SqliteAuthRepository::new(db.pool().clone())),
                idle_ttl,
            );
            serve(cli.addr, registry).await
        }
    }
}

/// Log to stderr, and to a daily rolling file when `log_dir` is set. The
/// returned guard flushes the file writer on drop.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "chessroom-server");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(stderr)
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stderr).with(filter).init();
            None
        }
    }
}

async fn serve<G, I>(addr: SocketAddr, registry: SessionRegistry<G, I>) -> anyhow::Result<()>
where
    G: GameRepository + 'static,
    I: IdentityProvider + 'static,
{
    let app = service::router(Arc::new(registry));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
