//! Property listing query builders.

use sea_query::{Expr, Order, Query, SelectStatement, SimpleExpr, SqliteQueryBuilder};

use super::Built;
use super::tables::{Agents, Properties, Users};

/// Columns mapped into `PropertyRead`, in struct field order (`specs` holds
/// the raw JSON text).
pub const PROPERTY_COLUMNS: [Properties; 19] = [
    Properties::Id,
    Properties::UserId,
    Properties::Title,
    Properties::Status,
    Properties::Category,
    Properties::Price,
    Properties::Location,
    Properties::Description,
    Properties::Tagline,
    Properties::ImageUrl,
    Properties::Area,
    Properties::Rooms,
    Properties::ZoningStatus,
    Properties::Floor,
    Properties::BuildingAge,
    Properties::Featured,
    Properties::Specs,
    Properties::CreatedAt,
    Properties::UpdatedAt,
];

/// Already-normalized listing filters.
#[derive(Debug, Default)]
pub struct PropertyFilter<'a> {
    pub category: Option<&'a str>,
    pub status: Option<&'a str>,
    pub featured: Option<bool>,
    pub agent_slug: Option<&'a str>,
    pub agent_email: Option<&'a str>,
    pub owner_id: Option<i64>,
}

fn select_columns(q: &mut SelectStatement) {
    for col in PROPERTY_COLUMNS {
        q.column((Properties::Table, col));
    }
}

/// List properties newest first.
pub fn list(f: &PropertyFilter<'_>) -> Built {
    let mut q = Query::select();
    select_columns(&mut q);
    q.from(Properties::Table);

    if let Some(category) = f.category {
        q.and_where(Expr::col((Properties::Table, Properties::Category)).eq(category));
    }
    if let Some(status) = f.status {
        q.and_where(Expr::col((Properties::Table, Properties::Status)).eq(status));
    }
    if let Some(featured) = f.featured {
        q.and_where(Expr::col((Properties::Table, Properties::Featured)).eq(featured));
    }
    if f.agent_slug.is_some() || f.agent_email.is_some() {
        q.inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id)).equals((Properties::Table, Properties::UserId)),
        )
        .inner_join(
            Agents::Table,
            Expr::col((Agents::Table, Agents::Id)).equals((Users::Table, Users::AgentId)),
        );
        if let Some(slug) = f.agent_slug {
            q.and_where(Expr::col((Agents::Table, Agents::Slug)).eq(slug));
        }
        if let Some(email) = f.agent_email {
            q.and_where(Expr::col((Agents::Table, Agents::Email)).eq(email));
        }
    }
    if let Some(owner_id) = f.owner_id {
        q.and_where(Expr::col((Properties::Table, Properties::UserId)).eq(owner_id));
    }

    q.order_by((Properties::Table, Properties::CreatedAt), Order::Desc)
        .order_by((Properties::Table, Properties::Id), Order::Desc);
    q.build(SqliteQueryBuilder)
}

pub fn get_by_id(id: i64) -> Built {
    let mut q = Query::select();
    select_columns(&mut q);
    q.from(Properties::Table)
        .and_where(Expr::col((Properties::Table, Properties::Id)).eq(id));
    q.build(SqliteQueryBuilder)
}

/// Owner of a property (single `user_id` column).
pub fn get_owner(id: i64) -> Built {
    Query::select()
        .column(Properties::UserId)
        .from(Properties::Table)
        .and_where(Expr::col(Properties::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub struct InsertParams<'a> {
    pub user_id: i64,
    pub title: &'a str,
    pub status: &'a str,
    pub category: &'a str,
    pub price: Option<&'a str>,
    pub location: Option<&'a str>,
    pub description: Option<&'a str>,
    pub tagline: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub area: Option<&'a str>,
    pub rooms: Option<&'a str>,
    pub zoning_status: Option<&'a str>,
    pub floor: Option<&'a str>,
    pub building_age: Option<&'a str>,
    pub specs: Option<&'a str>,
    pub featured: bool,
}

pub fn insert(p: &InsertParams<'_>) -> Built {
    let opt = |v: Option<&str>| -> SimpleExpr { v.map(str::to_string).into() };
    Query::insert()
        .into_table(Properties::Table)
        .columns([
            Properties::UserId,
            Properties::Title,
            Properties::Status,
            Properties::Category,
            Properties::Price,
            Properties::Location,
            Properties::Description,
            Properties::Tagline,
            Properties::ImageUrl,
            Properties::Area,
            Properties::Rooms,
            Properties::ZoningStatus,
            Properties::Floor,
            Properties::BuildingAge,
            Properties::Specs,
            Properties::Featured,
        ])
        .values_panic([
            p.user_id.into(),
            p.title.into(),
            p.status.into(),
            p.category.into(),
            opt(p.price),
            opt(p.location),
            opt(p.description),
            opt(p.tagline),
            opt(p.image_url),
            opt(p.area),
            opt(p.rooms),
            opt(p.zoning_status),
            opt(p.floor),
            opt(p.building_age),
            opt(p.specs),
            p.featured.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Apply a set of column assignments. Returns `None` when there is nothing
/// to change.
pub fn update(id: i64, changes: Vec<(Properties, SimpleExpr)>) -> Option<Built> {
    if changes.is_empty() {
        return None;
    }
    Some(
        Query::update()
            .table(Properties::Table)
            .values(changes)
            .and_where(Expr::col(Properties::Id).eq(id))
            .build(SqliteQueryBuilder),
    )
}

pub fn delete(id: i64) -> Built {
    Query::delete()
        .from_table(Properties::Table)
        .and_where(Expr::col(Properties::Id).eq(id))
        .build(SqliteQueryBuilder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfiltered_list_has_no_join_and_orders_newest_first() {
        let (sql, values) = list(&PropertyFilter::default());
        assert!(!sql.contains("JOIN"));
        assert!(sql.ends_with(
            r#"ORDER BY "properties"."created_at" DESC, "properties"."id" DESC"#
        ));
        assert!(values.0.is_empty());
    }

    #[test]
    fn agent_filters_join_users_and_agents() {
        let (sql, values) = list(&PropertyFilter {
            agent_slug: Some("premium-broker"),
            owner_id: Some(3),
            ..Default::default()
        });
        assert!(sql.contains(r#"INNER JOIN "users""#));
        assert!(sql.contains(r#"INNER JOIN "agents""#));
        assert!(sql.contains(r#""agents"."slug" = ?"#));
        assert!(sql.contains(r#""properties"."user_id" = ?"#));
        assert_eq!(values.0.len(), 2);
    }

    #[test]
    fn empty_update_builds_nothing() {
        assert!(update(1, Vec::new()).is_none());
        let (sql, _) = update(1, vec![(Properties::Price, "1".into())]).unwrap();
        assert_eq!(sql, r#"UPDATE "properties" SET "price" = ? WHERE "id" = ?"#);
    }
}
