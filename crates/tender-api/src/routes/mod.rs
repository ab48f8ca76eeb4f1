pub mod batches;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::openapi;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(batches::routes())
        .merge(openapi::swagger_ui())
        .route("/api-docs/openapi.json", axum::routing::get(openapi::openapi_json))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
