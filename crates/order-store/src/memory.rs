use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{OrderId, Result, StoreError, store::OrderStore};

type Tables = HashMap<String, HashMap<OrderId, serde_json::Value>>;

/// In-memory order store.
///
/// Records are partitioned by table name, so a single instance can back
/// both bounded contexts the same way separate tables would.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of records in a table.
    pub async fn record_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        self.tables.write().await.clear();
    }

    fn check_available(&self, table: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "table {table} is not reachable"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get(&self, table: &str, id: &OrderId) -> Result<Option<serde_json::Value>> {
        self.check_available(table)?;
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|t| t.get(id)).cloned())
    }

    async fn put(&self, table: &str, id: &OrderId, record: serde_json::Value) -> Result<()> {
        self.check_available(table)?;
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(id.clone(), record);
        metrics::counter!("order_store_writes_total").increment(1);
        Ok(())
    }

    async fn delete(&self, table: &str, id: &OrderId) -> Result<bool> {
        self.check_available(table)?;
        let mut tables = self.tables.write().await;
        let removed = tables
            .get_mut(table)
            .and_then(|t| t.remove(id))
            .is_some();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderStoreExt;
    use serde_json::json;

    const TABLE: &str = "InternalOrdersTable";

    #[tokio::test]
    async fn put_then_get() {
        let store = InMemoryOrderStore::new();
        let id = OrderId::new("o1");

        store
            .put(TABLE, &id, json!({"id": "o1", "quantity": 2}))
            .await
            .unwrap();

        let record = store.get(TABLE, &id).await.unwrap().unwrap();
        assert_eq!(record["quantity"], 2);
    }

    #[tokio::test]
    async fn put_overwrites_instead_of_merging() {
        let store = InMemoryOrderStore::new();
        let id = OrderId::new("o1");

        store
            .put(TABLE, &id, json!({"id": "o1", "status": "created", "extra": true}))
            .await
            .unwrap();
        store
            .put(TABLE, &id, json!({"id": "o1", "status": "cancelled"}))
            .await
            .unwrap();

        let record = store.get(TABLE, &id).await.unwrap().unwrap();
        assert_eq!(record, json!({"id": "o1", "status": "cancelled"}));
        assert_eq!(store.record_count(TABLE).await, 1);
    }

    #[tokio::test]
    async fn tables_are_isolated() {
        let store = InMemoryOrderStore::new();
        let id = OrderId::new("o1");

        store.put(TABLE, &id, json!({"id": "o1"})).await.unwrap();

        assert!(store.get("ExternalOrdersTable", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_record_existed() {
        let store = InMemoryOrderStore::new();
        let id = OrderId::new("o1");

        assert!(!store.delete(TABLE, &id).await.unwrap());

        store.put(TABLE, &id, json!({"id": "o1"})).await.unwrap();
        assert!(store.delete(TABLE, &id).await.unwrap());
        assert!(!store.exists(TABLE, &id).await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_operation() {
        let store = InMemoryOrderStore::new();
        let id = OrderId::new("o1");
        store.set_unavailable(true);

        assert!(matches!(
            store.get(TABLE, &id).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.put(TABLE, &id, json!({})).await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_unavailable(false);
        assert!(store.get(TABLE, &id).await.is_ok());
    }

    #[tokio::test]
    async fn typed_access_round_trips() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Record {
            id: String,
            quantity: u32,
        }

        let store = InMemoryOrderStore::new();
        let id = OrderId::new("o2");
        let record = Record {
            id: "o2".to_string(),
            quantity: 5,
        };

        store.put_as(TABLE, &id, &record).await.unwrap();
        let loaded: Option<Record> = store.get_as(TABLE, &id).await.unwrap();
        assert_eq!(loaded, Some(record));
    }
}
