use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use sea_query::SimpleExpr;

use brokerdesk_api::{
    PropertyCreate, PropertyListQuery, PropertyRead, PropertyUpdate, db, service,
};
use db::Properties;

use crate::error::ApiErr;
use crate::routes::auth::{AuthUser, require_premium};
use crate::storage::{Db, property_from_row, sq_execute, sq_insert, sq_query_map, sq_query_opt};

/// GET /properties/: public listing with optional filters.
///
/// `only_mine=true` needs a valid session; any other listing ignores the
/// session entirely.
pub async fn list_properties(
    State(db): State<Db>,
    auth: Result<AuthUser, ApiErr>,
    Query(q): Query<PropertyListQuery>,
) -> Result<Json<Vec<PropertyRead>>, ApiErr> {
    let category = q
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(service::normalize_category)
        .transpose()?;
    let status = q
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let agent_email = q
        .agent_email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    let agent_slug = q.agent_slug.as_deref().filter(|s| !s.is_empty());

    let owner_id = if q.only_mine {
        let auth = auth.map_err(|_| ApiErr::unauthorized("log in to see your own listings"))?;
        Some(auth.user.id)
    } else {
        None
    };

    let filter = db::properties::PropertyFilter {
        category: category.as_deref(),
        status: status.as_deref(),
        featured: q.featured,
        agent_slug,
        agent_email: agent_email.as_deref(),
        owner_id,
    };

    let conn = db.conn();
    let rows = sq_query_map(&conn, db::properties::list(&filter), property_from_row)
        .map_err(ApiErr::from_db("list properties"))?;
    Ok(Json(rows))
}

fn load_property(conn: &Connection, id: i64) -> Result<PropertyRead, ApiErr> {
    sq_query_opt(conn, db::properties::get_by_id(id), property_from_row)
        .map_err(ApiErr::from_db("load property"))?
        .ok_or_else(|| ApiErr::not_found("property not found"))
}

/// GET /properties/{id}
pub async fn get_property(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<Json<PropertyRead>, ApiErr> {
    let conn = db.conn();
    load_property(&conn, id).map(Json)
}

/// POST /properties/: create a listing owned by the caller.
pub async fn create_property(
    State(db): State<Db>,
    auth: AuthUser,
    Json(req): Json<PropertyCreate>,
) -> Result<Json<PropertyRead>, ApiErr> {
    let conn = db.conn();
    require_premium(&conn, &auth.user, "premium access is required to add listings")?;

    let title = service::validate_required("title", &req.title)?;
    let status = service::normalize_status(&req.status)?;
    let category = service::normalize_category(&req.category)?;
    let specs = service::encode_specs(req.specs.as_deref());

    let id = sq_insert(
        &conn,
        db::properties::insert(&db::properties::InsertParams {
            user_id: auth.user.id,
            title: &title,
            status: &status,
            category: &category,
            price: req.price.as_deref(),
            location: req.location.as_deref(),
            description: req.description.as_deref(),
            tagline: req.tagline.as_deref(),
            image_url: req.image_url.as_deref(),
            area: req.area.as_deref(),
            rooms: req.rooms.as_deref(),
            zoning_status: req.zoning_status.as_deref(),
            floor: req.floor.as_deref(),
            building_age: req.building_age.as_deref(),
            specs: specs.as_deref(),
            featured: req.featured,
        }),
    )
    .map_err(ApiErr::from_db("insert property"))?;

    tracing::info!("user {} created property {id}", auth.user.id);
    load_property(&conn, id).map(Json)
}

/// Load the owner of `id`, failing with 404/403 unless it is `user_id`.
fn check_owner(conn: &Connection, id: i64, user_id: i64, msg: &str) -> Result<(), ApiErr> {
    let owner: i64 = sq_query_opt(conn, db::properties::get_owner(id), |row| row.get(0))
        .map_err(ApiErr::from_db("property owner lookup"))?
        .ok_or_else(|| ApiErr::not_found("property not found"))?;
    if owner != user_id {
        return Err(ApiErr::forbidden(msg));
    }
    Ok(())
}

/// Translate a partial update into column assignments.
fn update_changes(req: PropertyUpdate) -> Result<Vec<(Properties, SimpleExpr)>, ApiErr> {
    let mut changes: Vec<(Properties, SimpleExpr)> = Vec::new();

    if let Some(title) = req.title {
        changes.push((Properties::Title, service::validate_required("title", &title)?.into()));
    }
    if let Some(status) = req.status.filter(|s| !s.trim().is_empty()) {
        changes.push((Properties::Status, service::normalize_status(&status)?.into()));
    }
    if let Some(category) = req.category.filter(|c| !c.trim().is_empty()) {
        changes.push((Properties::Category, service::normalize_category(&category)?.into()));
    }

    let nullable = [
        (Properties::Price, req.price),
        (Properties::Location, req.location),
        (Properties::Description, req.description),
        (Properties::Tagline, req.tagline),
        (Properties::ImageUrl, req.image_url),
        (Properties::Area, req.area),
        (Properties::Rooms, req.rooms),
        (Properties::ZoningStatus, req.zoning_status),
        (Properties::Floor, req.floor),
        (Properties::BuildingAge, req.building_age),
    ];
    for (column, value) in nullable {
        if let Some(value) = value {
            changes.push((column, value.into()));
        }
    }

    if let Some(featured) = req.featured {
        changes.push((Properties::Featured, featured.into()));
    }
    if let Some(specs) = req.specs {
        changes.push((
            Properties::Specs,
            service::encode_specs(specs.as_deref()).into(),
        ));
    }

    Ok(changes)
}

/// PUT /properties/{id}: partial update by the owner. `null` clears a field.
pub async fn update_property(
    State(db): State<Db>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<PropertyUpdate>,
) -> Result<Json<PropertyRead>, ApiErr> {
    let conn = db.conn();
    check_owner(&conn, id, auth.user.id, "you may not modify this listing")?;
    require_premium(&conn, &auth.user, "premium access is required to edit listings")?;

    if let Some(built) = db::properties::update(id, update_changes(req)?) {
        sq_execute(&conn, built).map_err(ApiErr::from_db("update property"))?;
    }
    load_property(&conn, id).map(Json)
}

/// DELETE /properties/{id}: remove a listing owned by the caller.
pub async fn delete_property(
    State(db): State<Db>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiErr> {
    let conn = db.conn();
    check_owner(&conn, id, auth.user.id, "you may not delete this listing")?;
    require_premium(&conn, &auth.user, "premium access is required to delete listings")?;
    sq_execute(&conn, db::properties::delete(id)).map_err(ApiErr::from_db("delete property"))?;
    tracing::info!("user {} deleted property {id}", auth.user.id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(json: &str) -> PropertyUpdate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_update_has_no_changes() {
        assert!(update_changes(update("{}")).unwrap().is_empty());
    }

    #[test]
    fn explicit_null_clears_nullable_fields() {
        let changes = update_changes(update(r#"{"price": null, "specs": null}"#)).unwrap();
        let columns: Vec<Properties> = changes.iter().map(|(c, _)| *c).collect();
        assert_eq!(columns.len(), 2);
        assert!(matches!(columns[0], Properties::Price));
        assert!(matches!(columns[1], Properties::Specs));
    }

    #[test]
    fn category_and_status_are_normalized() {
        let changes =
            update_changes(update(r#"{"category": "DAIRE", "status": "Kiralık"}"#)).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(update_changes(update(r#"{"category": "villa"}"#)).is_err());
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = update_changes(update(r#"{"title": "  "}"#)).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
