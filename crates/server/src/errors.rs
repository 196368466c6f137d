use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use models::errors::{FieldViolation, ModelError};
use serde::Serialize;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::error;

/// Problem body returned for every non-empty error response.
#[derive(Debug, Serialize)]
pub struct JsonApiError {
    #[serde(skip)]
    pub http_status: StatusCode,
    pub status: u16,
    pub title: String,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldViolation>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, title: &str, detail: Option<String>) -> Self {
        Self {
            http_status: status,
            status: status.as_u16(),
            title: title.to_string(),
            detail,
            timestamp: Utc::now(),
            fields: Vec::new(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Malformed Request", Some(detail.into()))
    }

    pub fn with_fields(mut self, fields: Vec<FieldViolation>) -> Self {
        self.fields = fields;
        self
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        (self.http_status, Json(self)).into_response()
    }
}

impl From<ModelError> for JsonApiError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(fields) => JsonApiError::new(
                StatusCode::BAD_REQUEST,
                "Validation Error",
                Some("one or more fields are invalid".into()),
            )
            .with_fields(fields),
            other => {
                error!(err = %other, "model error");
                JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", Some(other.to_string()))
            }
        }
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Model(m) => m.into(),
            ServiceError::NotFound(_) => JsonApiError::new(StatusCode::NOT_FOUND, "Not Found", Some(e.to_string())),
            ServiceError::Conflict { .. } => JsonApiError::new(StatusCode::CONFLICT, "Conflict", Some(e.to_string())),
            ServiceError::Db(_) => {
                error!(err = %e, "storage failure");
                JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", Some(e.to_string()))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("storage init failed: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400_with_fields() {
        let err: JsonApiError = ServiceError::Model(ModelError::Validation(vec![FieldViolation::new("nome", "must not be blank")])).into();
        assert_eq!(err.http_status, StatusCode::BAD_REQUEST);
        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(body["status"], 400);
        assert_eq!(body["fields"][0]["name"], "nome");
        assert_eq!(body["fields"][0]["message"], "must not be blank");
    }

    #[test]
    fn conflict_and_db_statuses() {
        let err: JsonApiError = ServiceError::Conflict { field: "email".into(), value: "a@b.io".into() }.into();
        assert_eq!(err.http_status, StatusCode::CONFLICT);
        assert!(serde_json::to_value(&err).unwrap().get("fields").is_none());

        let err: JsonApiError = ServiceError::Db("boom".into()).into();
        assert_eq!(err.http_status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
