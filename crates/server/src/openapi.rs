use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// A stored client. Fields other than `id` follow the configured client schema.
#[derive(ToSchema)]
#[schema(example = json!({"id": 1, "nome": "Acme"}))]
pub struct ClientDoc { pub id: i64 }

/// Create/update body. An `id` here is ignored on create and replaced by the path id on update.
#[derive(ToSchema)]
#[schema(example = json!({"nome": "Acme"}))]
pub struct ClientInputDoc { pub id: Option<i64> }

#[derive(ToSchema)]
pub struct FieldViolationDoc { pub name: String, pub message: String }

#[derive(ToSchema)]
pub struct ProblemDoc {
    pub status: u16,
    pub title: String,
    pub detail: Option<String>,
    pub timestamp: String,
    pub fields: Option<Vec<FieldViolationDoc>>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::clients::list,
        crate::routes::clients::get,
        crate::routes::clients::create,
        crate::routes::clients::update,
        crate::routes::clients::delete,
    ),
    components(
        schemas(
            HealthResponse,
            ClientDoc,
            ClientInputDoc,
            FieldViolationDoc,
            ProblemDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "clientes")
    )
)]
pub struct ApiDoc;
