mod batch;

pub use batch::import_batch;

use crate::state::AppState;
use axum::routing::post;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for import endpoints (mounted at /api)
pub fn router() -> Router<AppState> {
    Router::new().route("/import-batch", post(batch::import_batch))
}

#[derive(OpenApi)]
#[openapi(
    paths(batch::import_batch),
    components(schemas(batch::ImportBatchRequest))
)]
pub struct ApiDoc;
