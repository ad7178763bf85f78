//! Database schema shared by the write store and the read model.

use sqlx::migrate::Migrator;

/// Embedded migrations for the write-store tables and the read-model
/// document tables.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
