use crate::models::{NewSession, NewUser, User};
use crate::schema::{sessions, users};
use chrono::{Duration, Utc};
use diesel::prelude::*;

use super::crypto::{generate_token, hash_token};

const SESSION_DAYS: i64 = 30;

/// Look up the live user behind a hashed bearer token.
pub fn find_user_by_token_hash(
    conn: &mut PgConnection,
    token_hash: &str,
) -> QueryResult<Option<User>> {
    sessions::table
        .inner_join(users::table)
        .filter(sessions::token_hash.eq(token_hash))
        .filter(sessions::expires_at.gt(Utc::now()))
        .filter(users::deleted_at.is_null())
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Create `username` if needed and open a new session for it. Returns the
/// plaintext token; only its hash is stored.
pub fn issue_session(conn: &mut PgConnection, username: &str) -> QueryResult<String> {
    conn.transaction(|conn| {
        let existing: Option<uuid::Uuid> = users::table
            .filter(users::username.eq(username))
            .filter(users::deleted_at.is_null())
            .select(users::id)
            .first(conn)
            .optional()?;

        let user_id = match existing {
            Some(id) => id,
            None => diesel::insert_into(users::table)
                .values(NewUser { username })
                .returning(users::id)
                .get_result(conn)?,
        };

        let token = generate_token();
        let token_hash = hash_token(&token);
        diesel::insert_into(sessions::table)
            .values(NewSession {
                user_id,
                token_hash: &token_hash,
                expires_at: Utc::now() + Duration::days(SESSION_DAYS),
            })
            .execute(conn)?;

        Ok(token)
    })
}
