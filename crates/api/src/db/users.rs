//! User / auth query builders.

use sea_query::{Asterisk, Expr, Func, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Users;

/// Columns mapped into `UserRead` plus the active flag, in this order:
/// id, name, email, phone, company, agent_id, is_active.
pub const USER_COLUMNS: [Users; 7] = [
    Users::Id,
    Users::Name,
    Users::Email,
    Users::Phone,
    Users::Company,
    Users::AgentId,
    Users::IsActive,
];

// ── User lookups ───────────────────────────────────────────────────────────

/// Find user by id.
pub fn get_by_id(user_id: i64) -> Built {
    Query::select()
        .columns(USER_COLUMNS)
        .from(Users::Table)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Find user by email for login: [`USER_COLUMNS`] followed by
/// password_hash, password_salt.
pub fn get_by_email_for_login(email: &str) -> Built {
    Query::select()
        .columns(USER_COLUMNS)
        .columns([Users::PasswordHash, Users::PasswordSalt])
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// Check email existence.
pub fn email_exists(email: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

// ── User inserts ───────────────────────────────────────────────────────────

pub struct InsertParams<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub password_salt: &'a str,
    pub phone: Option<&'a str>,
    pub company: Option<&'a str>,
    pub agent_id: Option<i64>,
}

/// Insert a broker account.
pub fn insert(p: &InsertParams<'_>) -> Built {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::Name,
            Users::Email,
            Users::PasswordHash,
            Users::PasswordSalt,
            Users::Phone,
            Users::Company,
            Users::AgentId,
        ])
        .values_panic([
            p.name.into(),
            p.email.into(),
            p.password_hash.into(),
            p.password_salt.into(),
            p.phone.map(str::to_string).into(),
            p.company.map(str::to_string).into(),
            p.agent_id.into(),
        ])
        .build(SqliteQueryBuilder)
}

// ── User updates ───────────────────────────────────────────────────────────

/// Activate or deactivate an account.
pub fn set_active(user_id: i64, active: bool) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::IsActive, active)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}
