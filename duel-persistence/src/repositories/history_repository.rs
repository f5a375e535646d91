use anyhow::Result;
use std::sync::Arc;

use crate::keys::history_key;
use crate::store::{KeyValueStore, load, save};
use duel_types::{GameHistoryRecord, UserId};

#[derive(Clone)]
pub struct HistoryRepository {
    store: Arc<dyn KeyValueStore>,
}

impl HistoryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// A user's match log, newest first. Empty when nothing was recorded.
    pub async fn find_for_user(&self, user_id: &UserId) -> Result<Vec<GameHistoryRecord>> {
        Ok(load(self.store.as_ref(), &history_key(user_id))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_for_user(&self, user_id: &UserId, history: &[GameHistoryRecord]) -> Result<()> {
        save(self.store.as_ref(), &history_key(user_id), history).await
    }
}
