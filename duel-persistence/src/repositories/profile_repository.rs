use anyhow::Result;
use std::sync::Arc;

use crate::keys::user_key;
use crate::store::{KeyValueStore, load, save};
use duel_types::{UserId, UserProfile};

#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        load(self.store.as_ref(), &user_key(user_id)).await
    }

    pub async fn save(&self, profile: &UserProfile) -> Result<()> {
        save(self.store.as_ref(), &user_key(&profile.id), profile).await
    }
}
