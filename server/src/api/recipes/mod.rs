pub mod list;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list::list_recipes))
}

#[derive(OpenApi)]
#[openapi(
    paths(list::list_recipes),
    components(schemas(list::RecipeListResponse, crate::catalog::RecipeSummary))
)]
pub struct ApiDoc;
