use async_trait::async_trait;
use models::client::{Client, ClientDraft};
use serde_json::Value;

use crate::errors::ServiceError;

/// Storage abstraction for clients.
///
/// `save` with `draft.id == None` inserts and assigns the next id; with
/// `Some(id)` it replaces every field of that client and fails with
/// [`ServiceError::NotFound`] if the row is gone.
///
/// `unique_fields` are checked atomically with the write: if another client
/// already holds a non-null value of the draft for one of them, `save` fails
/// with [`ServiceError::Conflict`] and stores nothing.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// All clients, ordered by id.
    async fn find_all(&self) -> Result<Vec<Client>, ServiceError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Client>, ServiceError>;
    async fn exists_by_id(&self, id: i64) -> Result<bool, ServiceError>;
    async fn save(&self, draft: ClientDraft, unique_fields: &[&str]) -> Result<Client, ServiceError>;
    /// Returns whether a client was removed.
    async fn delete_by_id(&self, id: i64) -> Result<bool, ServiceError>;
    /// Whether any client other than `excluding` holds `value` in `field`.
    async fn exists_by_field(&self, field: &str, value: &Value, excluding: Option<i64>) -> Result<bool, ServiceError>;
}
