use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::crypto::hash_token;
use super::sessions::AuthenticatedUser;
use crate::api::ErrorResponse;
use crate::state::AppState;

/// Extracts the authenticated user from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedUser);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Invalid Authorization header")]
    InvalidHeader,

    #[error("Invalid Authorization header format")]
    InvalidFormat,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Authentication is temporarily unavailable")]
    Unavailable,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?;
        let value = header.to_str().map_err(|_| AuthError::InvalidHeader)?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidFormat)?;

        match state.sessions.user_for_token_hash(&hash_token(token)).await {
            Ok(Some(user)) => Ok(AuthUser(user)),
            Ok(None) => Err(AuthError::InvalidToken),
            Err(e) => {
                tracing::error!(error = %e, "Session lookup failed");
                Err(AuthError::Unavailable)
            }
        }
    }
}
