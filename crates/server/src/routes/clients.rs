//! `/clientes` resource.
//!
//! Reads go straight to the repository; writes are validated against the
//! client schema here and then handed to the catalog service. Existence is
//! checked before update/delete, so a missing id never reaches the service.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use models::{
    client::{Client, ClientPayload},
    schema::ClientSchema,
};
use service::client::{ClientCatalogService, ClientRepository};
use service::errors::ServiceError;
use tracing::{debug, info};

use crate::errors::JsonApiError;

/// HTTP-facing side of the client catalog. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct ClientResource {
    repo: Arc<dyn ClientRepository>,
    catalog: Arc<ClientCatalogService>,
    schema: Arc<ClientSchema>,
}

impl ClientResource {
    pub fn new(repo: Arc<dyn ClientRepository>, catalog: Arc<ClientCatalogService>, schema: Arc<ClientSchema>) -> Self {
        Self { repo, catalog, schema }
    }

    /// Wire repository, schema and catalog service together.
    pub fn with_repository(repo: Arc<dyn ClientRepository>, schema: ClientSchema) -> Self {
        let schema = Arc::new(schema);
        let catalog = Arc::new(ClientCatalogService::new(Arc::clone(&repo), Arc::clone(&schema)));
        Self::new(repo, catalog, schema)
    }
}

/// Outcome of an id-addressed operation: an empty 404 is a normal branch, not an error.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(t) => Lookup::Found(t),
            None => Lookup::NotFound,
        }
    }
}

impl<T: IntoResponse> IntoResponse for Lookup<T> {
    fn into_response(self) -> Response {
        match self {
            Lookup::Found(t) => t.into_response(),
            Lookup::NotFound => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

/// Integer path id; anything else is a 400 problem body.
pub struct ClientId(pub i64);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientId {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|e| JsonApiError::bad_request(e.body_text()))?;
        Ok(ClientId(id))
    }
}

/// JSON object body. A missing JSON content type is a 415, any other decoding
/// failure a 400 problem body.
pub struct ClientBody(pub ClientPayload);

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for ClientBody {
    type Rejection = JsonApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<ClientPayload>::from_request(req, state)
            .await
            .map_err(|e| match e {
                JsonRejection::MissingJsonContentType(r) => {
                    JsonApiError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported Media Type", Some(r.body_text()))
                }
                other => JsonApiError::bad_request(other.body_text()),
            })?;
        Ok(ClientBody(payload))
    }
}

#[utoipa::path(
    get, path = "/clientes", tag = "clientes",
    responses(
        (status = 200, description = "All clients", body = [crate::openapi::ClientDoc]),
        (status = 500, description = "Storage failure", body = crate::openapi::ProblemDoc)
    )
)]
pub async fn list(State(res): State<ClientResource>) -> Result<Json<Vec<Client>>, JsonApiError> {
    let list = res.catalog.list_all().await?;
    Ok(Json(list))
}

#[utoipa::path(
    get, path = "/clientes/{id}", tag = "clientes",
    params(("id" = i64, Path, description = "Client ID")),
    responses(
        (status = 200, description = "OK", body = crate::openapi::ClientDoc),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get(State(res): State<ClientResource>, ClientId(id): ClientId) -> Result<Lookup<Json<Client>>, JsonApiError> {
    let found = res.repo.find_by_id(id).await?;
    if found.is_none() {
        debug!(id, "client not found");
    }
    Ok(found.map(Json).into())
}

#[utoipa::path(
    post, path = "/clientes", tag = "clientes",
    request_body = crate::openapi::ClientInputDoc,
    responses(
        (status = 201, description = "Created", body = crate::openapi::ClientDoc),
        (status = 400, description = "Validation Error", body = crate::openapi::ProblemDoc),
        (status = 409, description = "Unique field already taken", body = crate::openapi::ProblemDoc),
        (status = 415, description = "Body is not application/json", body = crate::openapi::ProblemDoc)
    )
)]
pub async fn create(State(res): State<ClientResource>, ClientBody(mut payload): ClientBody) -> Result<(StatusCode, Json<Client>), JsonApiError> {
    res.schema.strip_unknown(&mut payload.fields);
    res.schema.validate(&payload.fields)?;
    if payload.id.is_some() {
        debug!(body_id = ?payload.id, "ignoring id in create body");
    }
    let created = res.catalog.save(payload.into_new()).await?;
    info!(id = created.id, "client_create_request");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put, path = "/clientes/{id}", tag = "clientes",
    params(("id" = i64, Path, description = "Client ID")),
    request_body = crate::openapi::ClientInputDoc,
    responses(
        (status = 200, description = "Updated", body = crate::openapi::ClientDoc),
        (status = 400, description = "Validation Error", body = crate::openapi::ProblemDoc),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Unique field already taken", body = crate::openapi::ProblemDoc),
        (status = 415, description = "Body is not application/json", body = crate::openapi::ProblemDoc)
    )
)]
pub async fn update(
    State(res): State<ClientResource>,
    ClientId(id): ClientId,
    ClientBody(mut payload): ClientBody,
) -> Result<Lookup<Json<Client>>, JsonApiError> {
    res.schema.strip_unknown(&mut payload.fields);
    res.schema.validate(&payload.fields)?;
    if !res.repo.exists_by_id(id).await? {
        return Ok(Lookup::NotFound);
    }
    match res.catalog.save(payload.into_replacement(id)).await {
        Ok(updated) => Ok(Lookup::Found(Json(updated))),
        // removed between the existence check and the write
        Err(ServiceError::NotFound(_)) => Ok(Lookup::NotFound),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    delete, path = "/clientes/{id}", tag = "clientes",
    params(("id" = i64, Path, description = "Client ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete(State(res): State<ClientResource>, ClientId(id): ClientId) -> Result<Lookup<StatusCode>, JsonApiError> {
    if !res.repo.exists_by_id(id).await? {
        return Ok(Lookup::NotFound);
    }
    match res.catalog.delete_by_id(id).await {
        Ok(()) => Ok(Lookup::Found(StatusCode::NO_CONTENT)),
        Err(ServiceError::NotFound(_)) => Ok(Lookup::NotFound),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_router;
    use axum::{body::Body, Router};
    use configs::{ClientsConfig, FieldKind, FieldRuleConfig, UnknownFields};
    use service::client::repo::InMemoryClientRepository;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tower_http::cors::CorsLayer;

    fn app() -> Router {
        app_with(ClientSchema::default())
    }

    fn app_with(schema: ClientSchema) -> Router {
        let resource = ClientResource::with_repository(Arc::new(InMemoryClientRepository::new()), schema);
        build_router(resource, CorsLayer::very_permissive())
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Option<Value>) {
        let builder = axum::http::Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { None } else { Some(serde_json::from_slice(&bytes).unwrap()) };
        (status, json)
    }

    #[tokio::test]
    async fn full_lifecycle_scenario() {
        let app = app();

        let (s, b) = send(&app, "POST", "/clientes", Some(json!({"nome": "Acme"}))).await;
        assert_eq!(s, StatusCode::CREATED);
        assert_eq!(b, Some(json!({"id": 1, "nome": "Acme"})));

        let (s, b) = send(&app, "GET", "/clientes/1", None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(b, Some(json!({"id": 1, "nome": "Acme"})));

        let (s, b) = send(&app, "PUT", "/clientes/1", Some(json!({"nome": "Acme Corp"}))).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(b, Some(json!({"id": 1, "nome": "Acme Corp"})));

        let (s, b) = send(&app, "DELETE", "/clientes/1", None).await;
        assert_eq!(s, StatusCode::NO_CONTENT);
        assert_eq!(b, None);

        let (s, b) = send(&app, "GET", "/clientes/1", None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
        assert_eq!(b, None);
    }

    #[tokio::test]
    async fn missing_id_is_404_for_get_update_delete() {
        let app = app();
        assert_eq!(send(&app, "GET", "/clientes/77", None).await, (StatusCode::NOT_FOUND, None));
        assert_eq!(send(&app, "PUT", "/clientes/77", Some(json!({"nome": "X"}))).await, (StatusCode::NOT_FOUND, None));
        assert_eq!(send(&app, "DELETE", "/clientes/77", None).await, (StatusCode::NOT_FOUND, None));
        // the failed update must not have created anything
        let (_, b) = send(&app, "GET", "/clientes", None).await;
        assert_eq!(b, Some(json!([])));
    }

    #[tokio::test]
    async fn body_id_is_ignored_on_create_and_overridden_on_update() {
        let app = app();
        let (s, b) = send(&app, "POST", "/clientes", Some(json!({"id": 50, "nome": "Acme"}))).await;
        assert_eq!(s, StatusCode::CREATED);
        assert_eq!(b.unwrap()["id"], 1);

        let (s, b) = send(&app, "PUT", "/clientes/1", Some(json!({"id": 9, "nome": "Other"}))).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(b, Some(json!({"id": 1, "nome": "Other"})));

        let (s, _) = send(&app, "GET", "/clientes/9", None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_before_persistence() {
        let app = app();
        let (s, b) = send(&app, "POST", "/clientes", Some(json!({"nome": ""}))).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        let b = b.unwrap();
        assert_eq!(b["status"], 400);
        assert_eq!(b["fields"][0]["name"], "nome");

        let (s, _) = send(&app, "POST", "/clientes", Some(json!({"nome": "Acme", "extra": true}))).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);

        // validation runs before the existence check
        let (s, _) = send(&app, "PUT", "/clientes/5", Some(json!({}))).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);

        let (_, b) = send(&app, "GET", "/clientes", None).await;
        assert_eq!(b, Some(json!([])));
    }

    #[tokio::test]
    async fn malformed_requests_are_400() {
        let app = app();
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/clientes")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let (s, _) = send(&app, "POST", "/clientes", Some(json!({"id": "one", "nome": "Acme"}))).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);

        let (s, b) = send(&app, "GET", "/clientes/abc", None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert_eq!(b.unwrap()["title"], "Malformed Request");
    }

    #[tokio::test]
    async fn list_tracks_existing_clients() {
        let app = app();
        for name in ["A", "B", "C"] {
            send(&app, "POST", "/clientes", Some(json!({"nome": name}))).await;
        }
        send(&app, "DELETE", "/clientes/2", None).await;
        let (s, b) = send(&app, "GET", "/clientes", None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(b, Some(json!([{"id": 1, "nome": "A"}, {"id": 3, "nome": "C"}])));

        // second delete of the same id
        assert_eq!(send(&app, "DELETE", "/clientes/2", None).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn body_without_json_content_type_is_415() {
        let app = app();
        for (method, uri) in [("POST", "/clientes"), ("PUT", "/clientes/1")] {
            let req = axum::http::Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "text/plain")
                .body(Body::from(r#"{"nome":"Acme"}"#))
                .unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["status"], 415);
        }
        let (_, b) = send(&app, "GET", "/clientes", None).await;
        assert_eq!(b, Some(json!([])));
    }

    #[tokio::test]
    async fn ignored_unknown_fields_are_not_stored() {
        let cfg = ClientsConfig { unknown_fields: UnknownFields::Ignore, ..ClientsConfig::default() };
        let app = app_with(ClientSchema::from_config(&cfg).unwrap());

        let (s, b) = send(&app, "POST", "/clientes", Some(json!({"nome": "Acme", "site": "acme.io"}))).await;
        assert_eq!(s, StatusCode::CREATED);
        assert_eq!(b, Some(json!({"id": 1, "nome": "Acme"})));

        let (s, b) = send(&app, "PUT", "/clientes/1", Some(json!({"nome": "Acme Corp", "site": "acme.io"}))).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(b, Some(json!({"id": 1, "nome": "Acme Corp"})));

        let (_, b) = send(&app, "GET", "/clientes/1", None).await;
        assert_eq!(b, Some(json!({"id": 1, "nome": "Acme Corp"})));
    }

    #[tokio::test]
    async fn update_to_another_clients_unique_value_is_409() {
        let cfg = ClientsConfig {
            fields: vec![
                FieldRuleConfig { name: "nome".into(), kind: FieldKind::String, required: true, max_length: Some(60), unique: false },
                FieldRuleConfig { name: "email".into(), kind: FieldKind::Email, required: false, max_length: Some(255), unique: true },
            ],
            unknown_fields: UnknownFields::Reject,
        };
        let app = app_with(ClientSchema::from_config(&cfg).unwrap());
        send(&app, "POST", "/clientes", Some(json!({"nome": "A", "email": "a@acme.io"}))).await;
        send(&app, "POST", "/clientes", Some(json!({"nome": "B", "email": "b@acme.io"}))).await;

        let (s, b) = send(&app, "PUT", "/clientes/2", Some(json!({"nome": "B2", "email": "a@acme.io"}))).await;
        assert_eq!(s, StatusCode::CONFLICT);
        assert_eq!(b.unwrap()["status"], 409);

        let (_, b) = send(&app, "GET", "/clientes/2", None).await;
        assert_eq!(b, Some(json!({"id": 2, "nome": "B", "email": "b@acme.io"})));
    }
}
