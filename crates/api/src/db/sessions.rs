//! Login session query builders.

use sea_query::{Expr, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Sessions;

/// Insert a session row for a freshly issued token.
pub fn insert(user_id: i64, token_hash: &str, expires_at: &str) -> Built {
    Query::insert()
        .into_table(Sessions::Table)
        .columns([Sessions::UserId, Sessions::TokenHash, Sessions::ExpiresAt])
        .values_panic([user_id.into(), token_hash.into(), expires_at.into()])
        .build(SqliteQueryBuilder)
}

/// Resolve a live session to its user id. `now` uses the same
/// `YYYY-MM-DD HH:MM:SS` format as `expires_at`.
pub fn lookup_user(token_hash: &str, now: &str) -> Built {
    Query::select()
        .column(Sessions::UserId)
        .from(Sessions::Table)
        .and_where(Expr::col(Sessions::TokenHash).eq(token_hash))
        .and_where(Expr::col(Sessions::ExpiresAt).gt(now))
        .build(SqliteQueryBuilder)
}

/// Delete a session by token hash.
pub fn delete_by_hash(token_hash: &str) -> Built {
    Query::delete()
        .from_table(Sessions::Table)
        .and_where(Expr::col(Sessions::TokenHash).eq(token_hash))
        .build(SqliteQueryBuilder)
}

/// Purge every session that expired at or before `now`.
pub fn delete_expired(now: &str) -> Built {
    Query::delete()
        .from_table(Sessions::Table)
        .and_where(Expr::col(Sessions::ExpiresAt).lte(now))
        .build(SqliteQueryBuilder)
}
