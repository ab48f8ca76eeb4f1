//! `OpenAPI` documentation generation and Swagger UI setup.

use axum::response::IntoResponse;
use axum::Json;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    components(schemas(
        crate::routes::batches::CreateBatchResponse,
        crate::routes::batches::ProcessBatchResponse,
        crate::routes::batches::StatusResponse,
        crate::routes::batches::RetryAfterResponse,
    )),
    tags(
        (name = "batches", description = "Tender document batch ingestion and extraction"),
    ),
    info(
        title = "Tender Ingest API",
        version = "0.1.0",
        description = "Batch ingestion and extraction pipeline for tender documents",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
