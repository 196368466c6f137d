use async_trait::async_trait;
use chrono::Utc;
use models::client::{self, Client, ClientDraft, Entity as ClientEntity};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder, Set, Statement, TransactionTrait,
};
use serde_json::Value;

use crate::client::repository::ClientRepository;
use crate::errors::ServiceError;

/// Advisory lock serializing writes that carry unique fields.
const UNIQUE_FIELDS_LOCK: i64 = 0x636c_6965_6e74_6501;

/// SeaORM-backed repository over the `cliente` table.
pub struct SeaOrmClientRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmClientRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

#[async_trait]
impl ClientRepository for SeaOrmClientRepository {
    async fn find_all(&self) -> Result<Vec<Client>, ServiceError> {
        let rows = ClientEntity::find().order_by_asc(client::Column::Id).all(&self.db).await?;
        Ok(rows.into_iter().map(Client::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Client>, ServiceError> {
        let found = ClientEntity::find_by_id(id).one(&self.db).await?;
        Ok(found.map(Client::from))
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool, ServiceError> {
        let n = ClientEntity::find_by_id(id).count(&self.db).await?;
        Ok(n > 0)
    }

    async fn save(&self, draft: ClientDraft, unique_fields: &[&str]) -> Result<Client, ServiceError> {
        let txn = self.db.begin().await?;
        if !unique_fields.is_empty() {
            // 事务级 advisory lock，提交或回滚时自动释放
            txn.execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT pg_advisory_xact_lock($1)",
                [UNIQUE_FIELDS_LOCK.into()],
            ))
            .await?;
            for field in unique_fields {
                let Some(value) = draft.fields.get(*field).filter(|v| !v.is_null()) else { continue };
                if field_taken(&txn, field, value, draft.id).await? {
                    return Err(ServiceError::conflict(field, value));
                }
            }
        }

        let now = Utc::now().into();
        let attributes = Value::Object(draft.fields);
        let saved = match draft.id {
            None => {
                let am = client::ActiveModel {
                    id: NotSet,
                    attributes: Set(attributes),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                am.insert(&txn).await?
            }
            Some(id) => {
                let am = client::ActiveModel {
                    id: Set(id),
                    attributes: Set(attributes),
                    updated_at: Set(now),
                    ..Default::default()
                };
                match am.update(&txn).await {
                    Ok(m) => m,
                    Err(DbErr::RecordNotUpdated) => return Err(ServiceError::not_found("client")),
                    Err(e) => return Err(e.into()),
                }
            }
        };
        txn.commit().await?;
        Ok(saved.into())
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, ServiceError> {
        let res = ClientEntity::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn exists_by_field(&self, field: &str, value: &Value, excluding: Option<i64>) -> Result<bool, ServiceError> {
        Ok(field_taken(&self.db, field, value, excluding).await?)
    }
}

async fn field_taken<C: ConnectionTrait>(conn: &C, field: &str, value: &Value, excluding: Option<i64>) -> Result<bool, DbErr> {
    // jsonb 相等比较，值以 JSON 文本绑定后再转换
    let mut finder = ClientEntity::find().filter(Expr::cust_with_values(
        "\"attributes\" -> $1 = $2::jsonb",
        [field.to_string(), value.to_string()],
    ));
    if let Some(id) = excluding {
        finder = finder.filter(client::Column::Id.ne(id));
    }
    Ok(finder.count(conn).await? > 0)
}
