use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{sea_query::OnConflict, ActiveValue, DatabaseConnection, EntityTrait};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::entities::{kv_store, prelude::*};

/// String-keyed JSON document store. Single-key operations are atomic;
/// nothing else is.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

pub async fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub async fn save<T: Serialize + Sync + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_value(value)?).await
}

/// `kv_store` table backed by sea-orm.
pub struct SqlKvStore {
    db: DatabaseConnection,
}

impl SqlKvStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqlKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let model = KvStore::find_by_id(key.to_string()).one(&self.db).await?;

        match model {
            Some(model) => Ok(Some(serde_json::from_str(&model.value)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let model = kv_store::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            value: ActiveValue::Set(serde_json::to_string(&value)?),
            updated_at: ActiveValue::Set(Utc::now()),
        };

        KvStore::insert(model)
            .on_conflict(
                OnConflict::column(kv_store::Column::Key)
                    .update_columns([kv_store::Column::Value, kv_store::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        KvStore::delete_by_id(key.to_string()).exec(&self.db).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use migration::{Migrator, MigratorTrait};
    use serde_json::json;

    async fn setup_sql_store() -> SqlKvStore {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SqlKvStore::new(db)
    }

    async fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("room:MISSING").await.unwrap(), None);

        store.set("room:A", json!({"name": "first"})).await.unwrap();
        assert_eq!(
            store.get("room:A").await.unwrap(),
            Some(json!({"name": "first"}))
        );

        // Overwrite replaces the whole document
        store.set("room:A", json!({"round": 2})).await.unwrap();
        assert_eq!(store.get("room:A").await.unwrap(), Some(json!({"round": 2})));

        store.delete("room:A").await.unwrap();
        assert_eq!(store.get("room:A").await.unwrap(), None);

        // Deleting an absent key is not an error
        store.delete("room:A").await.unwrap();
    }

    #[tokio::test]
    async fn test_sql_store_get_set_delete() {
        let store = setup_sql_store().await;
        exercise(&store).await;
    }

    #[tokio::test]
    async fn test_memory_store_get_set_delete() {
        let store = MemoryStore::new();
        exercise(&store).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_typed_load_and_save() {
        let store = setup_sql_store().await;

        save(&store, "public_rooms", &vec!["A".to_string(), "B".to_string()])
            .await
            .unwrap();
        let ids: Option<Vec<String>> = load(&store, "public_rooms").await.unwrap();
        assert_eq!(ids, Some(vec!["A".to_string(), "B".to_string()]));

        let missing: Option<Vec<String>> = load(&store, "room_index").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_load_rejects_mismatched_shape() {
        let store = MemoryStore::new();
        store.set("user:x", json!("not a list")).await.unwrap();

        let result: Result<Option<Vec<u32>>> = load(&store, "user:x").await;
        assert!(result.is_err());
    }
}
