mod crypto;
mod db;
mod extractor;
mod sessions;

pub use crypto::hash_token;
pub use db::{find_user_by_token_hash, issue_session};
pub use extractor::{AuthError, AuthUser};
pub use sessions::{AuthenticatedUser, SessionStore};
