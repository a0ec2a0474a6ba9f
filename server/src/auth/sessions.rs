use async_trait::async_trait;
use larder_core::StoreError;
use uuid::Uuid;

/// The caller behind a valid bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// `None` when the token is unknown, expired, or belongs to a deleted user.
    async fn user_for_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthenticatedUser>, StoreError>;
}
