use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use crate::catalog::TagSummary;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct TagsListResponse {
    pub tags: Vec<TagSummary>,
}

#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "tags",
    responses(
        (status = 200, description = "Tags used by the caller's recipes", body = TagsListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_tags(AuthUser(user): AuthUser, State(state): State<AppState>) -> impl IntoResponse {
    match state.listings.tags(user.id, state.catalog.as_ref()).await {
        Ok(tags) => Json(TagsListResponse {
            tags: tags.to_vec(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Failed to list tags");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to load tags".to_string(),
                }),
            )
                .into_response()
        }
    }
}
