//! Postgres persistence for Galleon entities.

pub mod db;

pub use db::{CollectionRepository, MediaEntryRepository, NewUser, UserRepository, UserStore};

/// Workspace schema migrations, embedded at build time
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
