use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Client attributes other than the id, keyed by field name.
pub type Fields = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cliente")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_type = "JsonBinary")]
    pub attributes: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A persisted client as it goes over the wire: `{"id": 1, "nome": "Acme"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    #[serde(flatten)]
    pub fields: Fields,
}

impl From<Model> for Client {
    fn from(m: Model) -> Self {
        let fields = match m.attributes {
            serde_json::Value::Object(map) => map,
            _ => Fields::new(),
        };
        Client { id: m.id, fields }
    }
}

/// Request body of create/update. A body `id` is never trusted: it is
/// dropped on create and replaced by the path id on update.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ClientPayload {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(flatten)]
    pub fields: Fields,
}

/// What the catalog service persists. `id: None` inserts a new client,
/// `id: Some(_)` replaces the fields of an existing one.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientDraft {
    pub id: Option<i64>,
    pub fields: Fields,
}

impl ClientDraft {
    pub fn new(fields: Fields) -> Self {
        Self { id: None, fields }
    }

    pub fn with_id(id: i64, fields: Fields) -> Self {
        Self { id: Some(id), fields }
    }
}

impl ClientPayload {
    pub fn into_new(self) -> ClientDraft {
        ClientDraft::new(self.fields)
    }

    /// Path id wins over whatever the body carried.
    pub fn into_replacement(self, id: i64) -> ClientDraft {
        ClientDraft::with_id(id, self.fields)
    }
}
