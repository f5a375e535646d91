pub mod connection;
pub mod entities;
pub mod keys;
pub mod repositories;
pub mod store;

use sea_orm::DbErr;
use std::sync::Arc;

pub use repositories::{HistoryRepository, ProfileRepository, RoomRepository};
pub use store::{KeyValueStore, MemoryStore, SqlKvStore};

/// Typed access to every record kind over one shared store.
#[derive(Clone)]
pub struct Storage {
    pub rooms: RoomRepository,
    pub profiles: ProfileRepository,
    pub history: HistoryRepository,
}

impl Storage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            rooms: RoomRepository::new(store.clone()),
            profiles: ProfileRepository::new(store.clone()),
            history: HistoryRepository::new(store),
        }
    }

    /// Open (and migrate) the SQLite store at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, DbErr> {
        let db = connection::connect_and_migrate(database_url).await?;
        Ok(Self::new(Arc::new(SqlKvStore::new(db))))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}
