use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use models::client::{Client, ClientDraft, Fields};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::client::repository::ClientRepository;
use crate::errors::ServiceError;

/// Process-local repository for the `memory` storage backend and for tests.
///
/// Ids start at 1 and are never reused, even after a delete.
pub struct InMemoryClientRepository {
    rows: RwLock<BTreeMap<i64, Fields>>,
    next_id: AtomicI64,
}

impl Default for InMemoryClientRepository {
    fn default() -> Self {
        Self { rows: RwLock::new(BTreeMap::new()), next_id: AtomicI64::new(1) }
    }
}

impl InMemoryClientRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn find_all(&self) -> Result<Vec<Client>, ServiceError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().map(|(id, f)| Client { id: *id, fields: f.clone() }).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Client>, ServiceError> {
        let rows = self.rows.read().await;
        Ok(rows.get(&id).map(|f| Client { id, fields: f.clone() }))
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.rows.read().await.contains_key(&id))
    }

    async fn save(&self, draft: ClientDraft, unique_fields: &[&str]) -> Result<Client, ServiceError> {
        // 唯一性检查与写入持有同一把写锁
        let mut rows = self.rows.write().await;
        if let Some(id) = draft.id {
            if !rows.contains_key(&id) {
                return Err(ServiceError::not_found("client"));
            }
        }
        for field in unique_fields {
            let Some(value) = draft.fields.get(*field).filter(|v| !v.is_null()) else { continue };
            if held_by_other(&rows, field, value, draft.id) {
                return Err(ServiceError::conflict(field, value));
            }
        }
        let id = match draft.id {
            Some(id) => id,
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        rows.insert(id, draft.fields.clone());
        Ok(Client { id, fields: draft.fields })
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn exists_by_field(&self, field: &str, value: &Value, excluding: Option<i64>) -> Result<bool, ServiceError> {
        let rows = self.rows.read().await;
        Ok(held_by_other(&rows, field, value, excluding))
    }
}

fn held_by_other(rows: &BTreeMap<i64, Fields>, field: &str, value: &Value, excluding: Option<i64>) -> bool {
    rows.iter()
        .filter(|(id, _)| Some(**id) != excluding)
        .any(|(_, f)| f.get(field) == Some(value))
}
