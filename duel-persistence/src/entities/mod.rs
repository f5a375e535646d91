pub mod kv_store;

pub mod prelude {
    pub use super::kv_store::Entity as KvStore;
}
