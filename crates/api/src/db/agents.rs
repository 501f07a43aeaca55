//! Agent directory query builders.

use sea_query::{Asterisk, Expr, Func, Query, SqliteQueryBuilder};

use super::Built;
use super::tables::Agents;

/// Columns mapped into `AgentRead`, in struct field order.
pub const AGENT_COLUMNS: [Agents; 14] = [
    Agents::Id,
    Agents::Name,
    Agents::Email,
    Agents::Phone,
    Agents::Company,
    Agents::Experience,
    Agents::ProfilePhotoUrl,
    Agents::City,
    Agents::HappyCustomers,
    Agents::SuccessfulSales,
    Agents::InstagramUrl,
    Agents::FacebookUrl,
    Agents::Slug,
    Agents::IsPremium,
];

/// Writable agent fields shared by insert and full replacement.
pub struct AgentParams<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub company: Option<&'a str>,
    pub experience: Option<&'a str>,
    pub profile_photo_url: Option<&'a str>,
    pub city: Option<&'a str>,
    pub happy_customers: Option<i64>,
    pub successful_sales: Option<i64>,
    pub instagram_url: Option<&'a str>,
    pub facebook_url: Option<&'a str>,
    pub slug: &'a str,
    pub is_premium: bool,
}

impl AgentParams<'_> {
    fn pairs(&self) -> Vec<(Agents, sea_query::SimpleExpr)> {
        let opt = |v: Option<&str>| -> sea_query::SimpleExpr { v.map(str::to_string).into() };
        vec![
            (Agents::Name, self.name.into()),
            (Agents::Email, self.email.into()),
            (Agents::Phone, self.phone.into()),
            (Agents::Company, opt(self.company)),
            (Agents::Experience, opt(self.experience)),
            (Agents::ProfilePhotoUrl, opt(self.profile_photo_url)),
            (Agents::City, opt(self.city)),
            (Agents::HappyCustomers, self.happy_customers.into()),
            (Agents::SuccessfulSales, self.successful_sales.into()),
            (Agents::InstagramUrl, opt(self.instagram_url)),
            (Agents::FacebookUrl, opt(self.facebook_url)),
            (Agents::Slug, self.slug.into()),
            (Agents::IsPremium, self.is_premium.into()),
        ]
    }
}

// ── Lookups ─────────────────────────────────────────────────────────────────

pub fn get_by_id(agent_id: i64) -> Built {
    Query::select()
        .columns(AGENT_COLUMNS)
        .from(Agents::Table)
        .and_where(Expr::col(Agents::Id).eq(agent_id))
        .build(SqliteQueryBuilder)
}

pub fn get_by_slug(slug: &str) -> Built {
    Query::select()
        .columns(AGENT_COLUMNS)
        .from(Agents::Table)
        .and_where(Expr::col(Agents::Slug).eq(slug))
        .build(SqliteQueryBuilder)
}

pub fn get_by_email(email: &str) -> Built {
    Query::select()
        .columns(AGENT_COLUMNS)
        .from(Agents::Table)
        .and_where(Expr::col(Agents::Email).eq(email))
        .build(SqliteQueryBuilder)
}

pub fn slug_exists(slug: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Agents::Table)
        .and_where(Expr::col(Agents::Slug).eq(slug))
        .build(SqliteQueryBuilder)
}

pub fn email_exists(email: &str) -> Built {
    Query::select()
        .expr(Expr::expr(Func::count(Expr::col(Asterisk))).gt(0))
        .from(Agents::Table)
        .and_where(Expr::col(Agents::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// Premium flag of a single agent.
pub fn is_premium(agent_id: i64) -> Built {
    Query::select()
        .column(Agents::IsPremium)
        .from(Agents::Table)
        .and_where(Expr::col(Agents::Id).eq(agent_id))
        .build(SqliteQueryBuilder)
}

/// Page through agents in id order.
pub fn list(skip: u64, limit: u64) -> Built {
    Query::select()
        .columns(AGENT_COLUMNS)
        .from(Agents::Table)
        .order_by(Agents::Id, sea_query::Order::Asc)
        .limit(limit)
        .offset(skip)
        .build(SqliteQueryBuilder)
}

// ── Writes ──────────────────────────────────────────────────────────────────

pub fn insert(p: &AgentParams<'_>) -> Built {
    let (columns, values): (Vec<Agents>, Vec<sea_query::SimpleExpr>) =
        p.pairs().into_iter().unzip();
    Query::insert()
        .into_table(Agents::Table)
        .columns(columns)
        .values_panic(values)
        .build(SqliteQueryBuilder)
}

/// Replace every writable field of the agent identified by `slug`.
pub fn replace_by_slug(slug: &str, p: &AgentParams<'_>) -> Built {
    Query::update()
        .table(Agents::Table)
        .values(p.pairs())
        .and_where(Expr::col(Agents::Slug).eq(slug))
        .build(SqliteQueryBuilder)
}

pub fn delete_by_slug(slug: &str) -> Built {
    Query::delete()
        .from_table(Agents::Table)
        .and_where(Expr::col(Agents::Slug).eq(slug))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> AgentParams<'static> {
        AgentParams {
            name: "Premium Broker",
            email: "broker@example.com",
            phone: "+90 555 111 22 33",
            company: Some("Metra QA"),
            experience: None,
            profile_photo_url: None,
            city: Some("Ankara"),
            happy_customers: Some(120),
            successful_sales: Some(85),
            instagram_url: None,
            facebook_url: None,
            slug: "premium-broker",
            is_premium: true,
        }
    }

    #[test]
    fn insert_covers_all_writable_columns() {
        let (sql, values) = insert(&params());
        assert!(sql.starts_with(r#"INSERT INTO "agents""#));
        assert!(sql.contains(r#""is_premium""#));
        assert_eq!(values.0.len(), 13);
    }

    #[test]
    fn replace_targets_slug() {
        let (sql, values) = replace_by_slug("old-slug", &params());
        assert!(sql.starts_with(r#"UPDATE "agents" SET"#));
        assert!(sql.ends_with(r#"WHERE "slug" = ?"#));
        assert_eq!(values.0.len(), 14);
    }

    #[test]
    fn list_applies_paging() {
        let (sql, values) = list(10, 5);
        assert!(sql.contains("LIMIT ? OFFSET ?"));
        assert_eq!(values.0.len(), 2);
    }
}
