use anyhow::Result;
use std::sync::Arc;

use crate::keys::{PUBLIC_ROOMS_KEY, ROOM_INDEX_KEY, room_key};
use crate::store::{KeyValueStore, load, save};
use duel_types::{PublicRoomSummary, Room, RoomId};

#[derive(Clone)]
pub struct RoomRepository {
    store: Arc<dyn KeyValueStore>,
}

impl RoomRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_id(&self, room_id: &str) -> Result<Option<Room>> {
        load(self.store.as_ref(), &room_key(room_id)).await
    }

    pub async fn save(&self, room: &Room) -> Result<()> {
        save(self.store.as_ref(), &room_key(&room.id), room).await
    }

    pub async fn delete(&self, room_id: &str) -> Result<()> {
        self.store.delete(&room_key(room_id)).await
    }

    pub async fn public_listing(&self) -> Result<Vec<PublicRoomSummary>> {
        Ok(load(self.store.as_ref(), PUBLIC_ROOMS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_public_listing(&self, listing: &[PublicRoomSummary]) -> Result<()> {
        save(self.store.as_ref(), PUBLIC_ROOMS_KEY, listing).await
    }

    pub async fn room_index(&self) -> Result<Vec<RoomId>> {
        Ok(load(self.store.as_ref(), ROOM_INDEX_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_room_index(&self, index: &[RoomId]) -> Result<()> {
        save(self.store.as_ref(), ROOM_INDEX_KEY, index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use crate::store::SqlKvStore;
    use chrono::Utc;
    use duel_types::{Player, RoomStatus};
    use migration::{Migrator, MigratorTrait};
    use uuid::Uuid;

    async fn setup_test_db() -> RoomRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        RoomRepository::new(Arc::new(SqlKvStore::new(db)))
    }

    fn sample_room(id: &str) -> Room {
        let owner = Uuid::new_v4();
        let now = Utc::now();
        Room {
            id: id.to_string(),
            name: "Sample".to_string(),
            password: None,
            is_public: true,
            created_by: owner,
            digit_count: 4,
            players: vec![Player::new(owner, "Owner".to_string(), None)],
            status: RoomStatus::Waiting,
            current_turn: 0,
            round: 1,
            turn_start_time: None,
            turn_deadline: None,
            winner: None,
            created_at: now,
            started_at: None,
            finished_at: None,
            last_activity: now,
        }
    }

    #[tokio::test]
    async fn test_room_round_trip_and_delete() {
        let repo = setup_test_db().await;
        let room = sample_room("ABCD1234");

        repo.save(&room).await.unwrap();
        let found = repo.find_by_id("ABCD1234").await.unwrap().unwrap();
        assert_eq!(found, room);

        repo.delete("ABCD1234").await.unwrap();
        assert!(repo.find_by_id("ABCD1234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_listing_and_index() {
        let repo = setup_test_db().await;
        assert!(repo.public_listing().await.unwrap().is_empty());
        assert!(repo.room_index().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_preserves_order() {
        let repo = setup_test_db().await;
        let listing = vec![
            sample_room("AAAA0001").summary("Owner"),
            sample_room("BBBB0002").summary("Owner"),
        ];

        repo.save_public_listing(&listing).await.unwrap();
        let found = repo.public_listing().await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "AAAA0001");
        assert_eq!(found[1].id, "BBBB0002");

        repo.save_room_index(&["AAAA0001".to_string()]).await.unwrap();
        assert_eq!(repo.room_index().await.unwrap(), vec!["AAAA0001".to_string()]);
    }
}
