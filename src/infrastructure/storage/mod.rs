//! Storage infrastructure - SQLite pooling, migrations and backend selection

mod factory;
pub mod migrations;
mod sqlite;

pub use factory::{Repositories, StorageConfig, StorageFactory, StorageType};
pub use migrations::{run_storage_migrations, Migration, Migrator, SqliteMigrator};
pub use sqlite::{connect_sqlite, SqliteConfig};
