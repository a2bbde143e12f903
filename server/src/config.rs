//! Command line and data directory configuration for the chessroom server.
//!
//! The data directory is resolved with the following precedence:
//! 1. `--data-dir`
//! 2. `CHESSROOM_DATA_DIR` environment variable
//! 3. the platform data directory (e.g. `~/.local/share/chessroom`)
//! 4. `./data` (fallback for development)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

const DATA_DIR_ENV: &str = "CHESSROOM_DATA_DIR";
const DEV_DATA_DIR: &str = "./data";
const DB_FILE: &str = "chessroom.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Process-local maps, lost on exit.
    Memory,
    /// SQLite database under the data directory.
    Sqlite,
}

#[derive(Debug, Parser)]
#[command(name = "chessroom-server", version, about = "Live multiplayer chess rooms over WebSocket")]
pub struct Cli {
    /// Administrative action against the SQLite store. Serves when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Storage backend for games and auth tokens
    #[arg(long, value_enum, default_value_t = StoreKind::Sqlite)]
    pub store: StoreKind,

    /// Directory holding the SQLite database
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Write daily rolling log files here in addition to stderr
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Seconds a room may sit without connections before it is unloaded
    #[arg(long, default_value_t = 600)]
    pub room_idle_secs: u64,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage stored games.
    Games {
        #[command(subcommand)]
        action: GamesAction,
    },
    /// Manage auth tokens.
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum GamesAction {
    /// Create a game and print its id.
    Create {
        name: String,
        /// Username seated as white
        #[arg(long)]
        white: Option<String>,
        /// Username seated as black
        #[arg(long)]
        black: Option<String>,
    },
    /// List stored games as JSON lines.
    List,
}

#[derive(Debug, Subcommand)]
pub enum TokensAction {
    /// Issue a token for a username and print it.
    Issue { username: String },
    /// Revoke a token.
    Revoke { token: String },
}

impl Cli {
    pub fn room_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.room_idle_secs)
    }

    pub fn database_path(&self) -> PathBuf {
        get_data_dir(self.data_dir.clone()).join(DB_FILE)
    }
}

/// Get the data directory for persistence.
pub fn get_data_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }

    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "chessroom") {
        return dirs.data_dir().to_path_buf();
    }

    PathBuf::from(DEV_DATA_DIR)
}
