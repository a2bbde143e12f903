//! SQLite-backed implementations of the game repository and the identity
//! collaborator.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**, so room actors can read while another writes.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/001_initial_schema.sql`
//!   when [`Database::open`] is called. The schema is idempotent.
//!
//! ## Repository types
//!
//! | Type | Trait |
//! |------|-------|
//! | [`SqliteGameRepository`] | `GameRepository` |
//! | [`SqliteAuthRepository`] | `IdentityProvider` |
//!
//! A game's board is stored as a FEN string; its phase is split into the
//! `status` and `winner` TEXT columns through the helpers in [`helpers`].

mod auth_repo;
mod database;
mod game_repo;
pub(crate) mod helpers;

pub use auth_repo::SqliteAuthRepository;
pub use database::Database;
pub use game_repo::SqliteGameRepository;
