use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::{OrderId, Result};

/// Core trait for order record stores.
///
/// A store holds at most one JSON record per `(table, id)`. It has no logic
/// beyond get/put/delete: `put` is a total overwrite, never a merge, and
/// concurrent writers to the same id race with the last write winning.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Retrieves the record stored under `id`, if any.
    async fn get(&self, table: &str, id: &OrderId) -> Result<Option<serde_json::Value>>;

    /// Stores `record` under `id`, replacing whatever was there.
    async fn put(&self, table: &str, id: &OrderId, record: serde_json::Value) -> Result<()>;

    /// Removes the record stored under `id`.
    ///
    /// Returns true if a record existed.
    async fn delete(&self, table: &str, id: &OrderId) -> Result<bool>;
}

/// Extension trait providing typed access on top of raw JSON records.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Retrieves and decodes the record stored under `id`.
    async fn get_as<T>(&self, table: &str, id: &OrderId) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.get(table, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Encodes and stores `record` under `id`.
    async fn put_as<T>(&self, table: &str, id: &OrderId, record: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let value = serde_json::to_value(record)?;
        self.put(table, id, value).await
    }

    /// Checks if a record exists.
    async fn exists(&self, table: &str, id: &OrderId) -> Result<bool> {
        Ok(self.get(table, id).await?.is_some())
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

#[async_trait]
impl<S: OrderStore + ?Sized> OrderStore for std::sync::Arc<S> {
    async fn get(&self, table: &str, id: &OrderId) -> Result<Option<serde_json::Value>> {
        (**self).get(table, id).await
    }

    async fn put(&self, table: &str, id: &OrderId, record: serde_json::Value) -> Result<()> {
        (**self).put(table, id, record).await
    }

    async fn delete(&self, table: &str, id: &OrderId) -> Result<bool> {
        (**self).delete(table, id).await
    }
}
