//! Storage adapters for the CLI and other non-embedded frontends.

#[cfg(feature = "sqlite-store")]
mod sqlite;

#[cfg(feature = "sqlite-store")]
pub use sqlite::{SqliteStore, SqliteTransaction};
