use std::sync::Arc;

use models::client::{Client, ClientDraft};
use models::schema::ClientSchema;
use tracing::{info, instrument, warn};

use crate::client::repository::ClientRepository;
use crate::errors::ServiceError;

/// Application service encapsulating client catalog rules.
/// Payload shape is checked by the caller; this layer owns the rules that
/// need storage, i.e. uniqueness of fields marked `unique`.
pub struct ClientCatalogService {
    repo: Arc<dyn ClientRepository>,
    schema: Arc<ClientSchema>,
}

impl ClientCatalogService {
    pub fn new(repo: Arc<dyn ClientRepository>, schema: Arc<ClientSchema>) -> Self { Self { repo, schema } }

    pub async fn list_all(&self) -> Result<Vec<Client>, ServiceError> {
        let list = self.repo.find_all().await?;
        info!(event = "clients_listed", count = list.len(), "list clients");
        Ok(list)
    }

    /// Insert (`draft.id == None`) or fully replace a client.
    /// Fields marked `unique` are checked by the repository under the same
    /// lock or transaction as the write.
    #[instrument(skip(self, draft), fields(id = ?draft.id))]
    pub async fn save(&self, draft: ClientDraft) -> Result<Client, ServiceError> {
        let unique: Vec<&str> = self.schema.unique_fields().map(|r| r.name.as_str()).collect();
        let is_new = draft.id.is_none();
        let saved = match self.repo.save(draft, &unique).await {
            Ok(c) => c,
            Err(e @ ServiceError::Conflict { .. }) => {
                warn!(event = "client_conflict", error = %e, "unique field already taken");
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        if is_new {
            info!(event = "client_created", id = saved.id, "created client");
        } else {
            info!(event = "client_updated", id = saved.id, "updated client");
        }
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: i64) -> Result<(), ServiceError> {
        if !self.repo.delete_by_id(id).await? {
            return Err(ServiceError::not_found("client"));
        }
        info!(event = "client_deleted", id, "deleted client");
        Ok(())
    }
}
