use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::catalog::RecipeSummary;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipeListResponse {
    pub recipes: Vec<RecipeSummary>,
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    responses(
        (status = 200, description = "The caller's recipes, newest first", body = RecipeListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_recipes(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.listings.recipes(user.id, state.catalog.as_ref()).await {
        Ok(recipes) => Json(RecipeListResponse {
            recipes: recipes.to_vec(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Failed to list recipes");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to load recipes".to_string(),
                }),
            )
                .into_response()
        }
    }
}
