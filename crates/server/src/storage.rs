use anyhow::{Context, Result};
use brokerdesk_api::db::{self, Built};
use brokerdesk_api::{AgentRead, PropertyRead, UserRead, service};
use rusqlite::{Connection, OptionalExtension, Row, params_from_iter, types::Value as SqlValue};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Database file name inside the data directory.
pub const DB_FILE: &str = "brokerdesk.db";

/// Shared database state
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }
}

/// Initialize the database: open connection, enable WAL, run migrations
pub fn init_db(data_dir: &Path) -> Result<Db> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db_path = data_dir.join(DB_FILE);
    let conn = Connection::open(&db_path).context("opening SQLite database")?;

    // Enable WAL mode for better concurrent read performance
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    run_migrations(&conn)?;

    Ok(Db {
        conn: Arc::new(Mutex::new(conn)),
    })
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(db::migrations::MIGRATIONS_TABLE)?;

    for &(name, sql) in db::migrations::MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("Applied migration: {name}");
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// sea-query → rusqlite glue
// ---------------------------------------------------------------------------

fn to_sql_value(value: sea_query::Value) -> SqlValue {
    use sea_query::Value as Sq;
    match value {
        Sq::Bool(v) => v.map_or(SqlValue::Null, |b| SqlValue::Integer(i64::from(b))),
        Sq::TinyInt(v) => v.map_or(SqlValue::Null, |n| SqlValue::Integer(n.into())),
        Sq::SmallInt(v) => v.map_or(SqlValue::Null, |n| SqlValue::Integer(n.into())),
        Sq::Int(v) => v.map_or(SqlValue::Null, |n| SqlValue::Integer(n.into())),
        Sq::BigInt(v) => v.map_or(SqlValue::Null, SqlValue::Integer),
        Sq::TinyUnsigned(v) => v.map_or(SqlValue::Null, |n| SqlValue::Integer(n.into())),
        Sq::SmallUnsigned(v) => v.map_or(SqlValue::Null, |n| SqlValue::Integer(n.into())),
        Sq::Unsigned(v) => v.map_or(SqlValue::Null, |n| SqlValue::Integer(n.into())),
        Sq::BigUnsigned(v) => v.map_or(SqlValue::Null, |n| {
            SqlValue::Integer(i64::try_from(n).unwrap_or(i64::MAX))
        }),
        Sq::Float(v) => v.map_or(SqlValue::Null, |f| SqlValue::Real(f.into())),
        Sq::Double(v) => v.map_or(SqlValue::Null, SqlValue::Real),
        Sq::String(v) => v.map_or(SqlValue::Null, |s| SqlValue::Text(*s)),
        Sq::Char(v) => v.map_or(SqlValue::Null, |c| SqlValue::Text(c.to_string())),
        Sq::Bytes(v) => v.map_or(SqlValue::Null, |b| SqlValue::Blob(*b)),
        #[allow(unreachable_patterns)]
        other => {
            tracing::warn!("unsupported SQL parameter type: {other:?}");
            SqlValue::Null
        }
    }
}

fn bind(values: sea_query::Values) -> impl rusqlite::Params {
    params_from_iter(values.0.into_iter().map(to_sql_value))
}

/// Execute a built statement, returning the affected row count.
pub fn sq_execute(conn: &Connection, (sql, values): Built) -> rusqlite::Result<usize> {
    conn.execute(&sql, bind(values))
}

/// Execute a built INSERT, returning the new row id.
pub fn sq_insert(conn: &Connection, built: Built) -> rusqlite::Result<i64> {
    sq_execute(conn, built)?;
    Ok(conn.last_insert_rowid())
}

/// Fetch exactly one row.
pub fn sq_query_row<T, F>(conn: &Connection, (sql, values): Built, f: F) -> rusqlite::Result<T>
where
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    conn.query_row(&sql, bind(values), f)
}

/// Fetch at most one row.
pub fn sq_query_opt<T, F>(conn: &Connection, built: Built, f: F) -> rusqlite::Result<Option<T>>
where
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    sq_query_row(conn, built, f).optional()
}

/// Fetch every row.
pub fn sq_query_map<T, F>(conn: &Connection, (sql, values): Built, f: F) -> rusqlite::Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(bind(values), f)?;
    rows.collect()
}

/// Whether the error is a UNIQUE/FOREIGN KEY/NOT NULL violation.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ---------------------------------------------------------------------------
// Row mappers (column order follows the `*_COLUMNS` constants)
// ---------------------------------------------------------------------------

/// Map a [`db::users::USER_COLUMNS`] row into the user and its active flag.
pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<(UserRead, bool)> {
    Ok((
        UserRead {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            company: row.get(4)?,
            agent_id: row.get(5)?,
        },
        row.get(6)?,
    ))
}

pub fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRead> {
    Ok(AgentRead {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        company: row.get(4)?,
        experience: row.get(5)?,
        profile_photo_url: row.get(6)?,
        city: row.get(7)?,
        happy_customers: row.get(8)?,
        successful_sales: row.get(9)?,
        instagram_url: row.get(10)?,
        facebook_url: row.get(11)?,
        slug: row.get(12)?,
        is_premium: row.get(13)?,
    })
}

pub fn property_from_row(row: &Row<'_>) -> rusqlite::Result<PropertyRead> {
    let specs: Option<String> = row.get(16)?;
    Ok(PropertyRead {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        status: row.get(3)?,
        category: row.get(4)?,
        price: row.get(5)?,
        location: row.get(6)?,
        description: row.get(7)?,
        tagline: row.get(8)?,
        image_url: row.get(9)?,
        area: row.get(10)?,
        rooms: row.get(11)?,
        zoning_status: row.get(12)?,
        floor: row.get(13)?,
        building_age: row.get(14)?,
        featured: row.get(15)?,
        specs: service::decode_specs(specs.as_deref()),
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use brokerdesk_api::db::{agents, properties, users};

    fn test_db() -> (tempfile::TempDir, Db) {
        let dir = tempfile::tempdir().unwrap();
        let db = init_db(dir.path()).unwrap();
        (dir, db)
    }

    fn seed_user(conn: &Connection, email: &str) -> i64 {
        sq_insert(
            conn,
            users::insert(&users::InsertParams {
                name: "Test Broker",
                email,
                password_hash: "h",
                password_salt: "s",
                phone: None,
                company: None,
                agent_id: None,
            }),
        )
        .unwrap()
    }

    #[test]
    fn migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        drop(init_db(dir.path()).unwrap());
        let db = init_db(dir.path()).unwrap();
        let applied: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, db::migrations::MIGRATIONS.len() as i64);
    }

    #[test]
    fn duplicate_email_is_a_constraint_violation() {
        let (_dir, db) = test_db();
        let conn = db.conn();
        seed_user(&conn, "dup@example.com");
        let err = sq_execute(
            &conn,
            users::insert(&users::InsertParams {
                name: "Other",
                email: "dup@example.com",
                password_hash: "h",
                password_salt: "s",
                phone: None,
                company: None,
                agent_id: None,
            }),
        )
        .unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn property_round_trips_through_row_mapper() {
        let (_dir, db) = test_db();
        let conn = db.conn();
        let user_id = seed_user(&conn, "owner@example.com");
        let id = sq_insert(
            &conn,
            properties::insert(&properties::InsertParams {
                user_id,
                title: "Merkezde İmarlı Arsa",
                status: "satılık",
                category: "arsa",
                price: Some("12.750.000 ₺"),
                location: None,
                description: None,
                tagline: None,
                image_url: None,
                area: Some("850 m²"),
                rooms: None,
                zoning_status: None,
                floor: None,
                building_age: None,
                specs: Some(r#"["850 m²","Yola sıfır"]"#),
                featured: true,
            }),
        )
        .unwrap();

        let got = sq_query_row(&conn, properties::get_by_id(id), property_from_row).unwrap();
        assert_eq!(got.user_id, user_id);
        assert_eq!(got.price.as_deref(), Some("12.750.000 ₺"));
        assert_eq!(got.specs, vec!["850 m²", "Yola sıfır"]);
        assert!(got.featured);
        assert!(!got.created_at.is_empty());
    }

    #[test]
    fn deleting_user_cascades_to_properties() {
        let (_dir, db) = test_db();
        let conn = db.conn();
        let user_id = seed_user(&conn, "gone@example.com");
        sq_insert(
            &conn,
            properties::insert(&properties::InsertParams {
                user_id,
                title: "Daire",
                status: "kiralık",
                category: "daire",
                price: None,
                location: None,
                description: None,
                tagline: None,
                image_url: None,
                area: None,
                rooms: Some("3+1"),
                zoning_status: None,
                floor: None,
                building_age: None,
                specs: None,
                featured: false,
            }),
        )
        .unwrap();

        conn.execute("DELETE FROM users WHERE id = ?1", [user_id])
            .unwrap();
        let left = sq_query_map(
            &conn,
            properties::list(&properties::PropertyFilter::default()),
            property_from_row,
        )
        .unwrap();
        assert!(left.is_empty());
    }

    #[test]
    fn agent_lookup_is_optional() {
        let (_dir, db) = test_db();
        let conn = db.conn();
        let missing = sq_query_opt(&conn, agents::get_by_slug("nobody"), agent_from_row).unwrap();
        assert!(missing.is_none());
    }
}
