//! SQLite-based hosting store using `SeaORM`.
//!
//! `SqliteStore` implements `HostingStore` against a single `SQLite` database
//! file. Transactions are serialized by a process-wide writer lock: `SQLite`
//! has no row locks, so the lock stands in for `SELECT ... FOR UPDATE`.

mod admin;
mod convert;
pub(crate) mod entity;
mod migration;
mod transaction;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use hosting_core::error::{CoreError, CoreResult};
use hosting_core::traits::{HostingStore, StoreTransaction};
use sea_orm::{Database, DatabaseConnection, TransactionTrait};
use sea_orm_migration::MigratorTrait;
use tokio::sync::Mutex;

use migration::Migrator;
pub use transaction::SqliteTransaction;

/// SQLite-based store for the CLI and integration tests.
pub struct SqliteStore {
    /// Shared `SeaORM` database connection.
    pub(crate) db: DatabaseConnection,
    writer: Arc<Mutex<()>>,
}

impl SqliteStore {
    /// Open (or create) the database file and bring the schema up to date.
    ///
    /// # Errors
    /// Returns `CoreError::StorageError` if directory creation, database
    /// connection, or schema migration fails.
    pub async fn new(db_path: &Path) -> CoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::StorageError(format!("Failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let db = Database::connect(&db_url)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to connect to SQLite: {e}")))?;

        Migrator::up(&db, None)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to run migrations: {e}")))?;

        log::debug!("SQLite store ready at {}", db_path.display());
        Ok(Self {
            db,
            writer: Arc::new(Mutex::new(())),
        })
    }
}

#[async_trait]
impl HostingStore for SqliteStore {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTransaction>> {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        let txn = self.db.begin().await.map_err(|e| {
            CoreError::TransactionFailure(format!("Failed to begin transaction: {e}"))
        })?;
        Ok(Box::new(SqliteTransaction::new(txn, writer)))
    }
}
