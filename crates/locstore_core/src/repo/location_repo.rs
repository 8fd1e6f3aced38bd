//! Location repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide upsert/delete/lookup/list/count over the `locations` table.
//! - Own natural-key matching so callers never see surrogate-id plumbing.
//!
//! # Invariants
//! - A current-position lookup ignores `city_id` and `weather_source`.
//! - A saved-location lookup compares `weather_source` by its persisted id.
//! - When several rows match a key, the lowest surrogate id wins.
//! - `upsert_batch` replaces the whole table in one transaction or not at all.
//! - Storage errors are returned as-is; nothing here retries.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::location::{Location, LocationId, NaturalKey, WeatherSource};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const LOCATIONS_TABLE: &str = "locations";

const REQUIRED_COLUMNS: [&str; 13] = [
    "id",
    "city_id",
    "weather_source",
    "current_position",
    "latitude",
    "longitude",
    "time_zone",
    "country",
    "province",
    "city",
    "district",
    "resident_position",
    "china",
];

const LOCATION_SELECT_SQL: &str = "SELECT
    id,
    city_id,
    weather_source,
    current_position,
    latitude,
    longitude,
    time_zone,
    country,
    province,
    city,
    district,
    resident_position,
    china
FROM locations";

const LOCATION_INSERT_SQL: &str = "INSERT INTO locations (
    city_id,
    weather_source,
    current_position,
    latitude,
    longitude,
    time_zone,
    country,
    province,
    city,
    district,
    resident_position,
    china
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from location persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error, passed through unchanged.
    Db(DbError),
    /// Persisted row cannot be mapped back to a `Location`.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted location data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "location repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "location repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "location repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the location store.
pub trait LocationRepository {
    /// Inserts or fully replaces the row matching `location`'s natural key.
    ///
    /// Returns the surrogate id of the stored row. An existing row keeps its
    /// id; `location.id` is ignored.
    fn upsert(&mut self, location: &Location) -> RepoResult<LocationId>;
    /// Replaces the whole table with `locations`. Empty input is a no-op.
    fn upsert_batch(&mut self, locations: &[Location]) -> RepoResult<()>;
    /// Deletes the row matching `location`'s natural key, if any.
    ///
    /// Returns whether a row was removed.
    fn delete_one(&mut self, location: &Location) -> RepoResult<bool>;
    /// Deletes every row and returns how many were removed.
    fn delete_all(&mut self) -> RepoResult<usize>;
    /// Looks up one location by natural key parts.
    fn find_one(
        &self,
        city_id: &str,
        weather_source: WeatherSource,
        current_position: bool,
    ) -> RepoResult<Option<Location>>;
    /// Lists every location in ascending surrogate id order.
    fn list_all(&self) -> RepoResult<Vec<Location>>;
    /// Returns the number of stored locations.
    fn count(&self) -> RepoResult<u64>;
}

/// SQLite-backed location repository.
pub struct SqliteLocationRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteLocationRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_location_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl LocationRepository for SqliteLocationRepository<'_> {
    fn upsert(&mut self, location: &Location) -> RepoResult<LocationId> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let id = match find_id_by_key(&tx, &location.natural_key())? {
            Some(existing_id) => {
                replace_location(&tx, existing_id, location)?;
                debug!(
                    "event=location_upsert module=repo status=ok mode=update id={existing_id}"
                );
                existing_id
            }
            None => {
                let new_id = insert_location(&tx, location)?;
                debug!(
                    "event=location_upsert module=repo status=ok mode=insert id={new_id}"
                );
                new_id
            }
        };

        tx.commit()?;
        Ok(id)
    }

    fn upsert_batch(&mut self, locations: &[Location]) -> RepoResult<()> {
        if locations.is_empty() {
            return Ok(());
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM locations;", [])?;
        for location in locations {
            insert_location(&tx, location)?;
        }
        tx.commit()?;

        debug!(
            "event=location_replace_all module=repo status=ok removed={} inserted={}",
            removed,
            locations.len()
        );
        Ok(())
    }

    fn delete_one(&mut self, location: &Location) -> RepoResult<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(existing_id) = find_id_by_key(&tx, &location.natural_key())? else {
            return Ok(false);
        };
        tx.execute("DELETE FROM locations WHERE id = ?1;", [existing_id])?;
        tx.commit()?;

        debug!("event=location_delete module=repo status=ok id={existing_id}");
        Ok(true)
    }

    fn delete_all(&mut self) -> RepoResult<usize> {
        let removed = self.conn.execute("DELETE FROM locations;", [])?;
        debug!("event=location_delete_all module=repo status=ok removed={removed}");
        Ok(removed)
    }

    fn find_one(
        &self,
        city_id: &str,
        weather_source: WeatherSource,
        current_position: bool,
    ) -> RepoResult<Option<Location>> {
        let key = NaturalKey::from_parts(city_id, weather_source, current_position);
        find_by_key(self.conn, &key)
    }

    fn list_all(&self) -> RepoResult<Vec<Location>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LOCATION_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut locations = Vec::new();

        while let Some(row) = rows.next()? {
            locations.push(parse_location_row(row)?);
        }

        Ok(locations)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM locations;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

/// Builds the WHERE clause and bind values for a natural-key match.
fn key_predicate(key: &NaturalKey) -> (&'static str, Vec<Value>) {
    match key {
        NaturalKey::CurrentPosition => ("current_position = 1", Vec::new()),
        NaturalKey::Saved {
            city_id,
            weather_source,
        } => (
            "city_id = ? AND weather_source = ?",
            vec![
                Value::Text(city_id.clone()),
                Value::Text(weather_source.as_id().to_string()),
            ],
        ),
    }
}

fn find_by_key(conn: &Connection, key: &NaturalKey) -> RepoResult<Option<Location>> {
    let (predicate, bind_values) = key_predicate(key);
    let mut stmt = conn.prepare(&format!(
        "{LOCATION_SELECT_SQL} WHERE {predicate} ORDER BY id ASC LIMIT 1;"
    ))?;

    let mut rows = stmt.query(params_from_iter(bind_values))?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_location_row(row)?));
    }

    Ok(None)
}

fn find_id_by_key(conn: &Connection, key: &NaturalKey) -> RepoResult<Option<LocationId>> {
    let (predicate, bind_values) = key_predicate(key);
    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM locations WHERE {predicate} ORDER BY id ASC LIMIT 1;"
    ))?;

    let mut rows = stmt.query(params_from_iter(bind_values))?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

fn insert_location(conn: &Connection, location: &Location) -> RepoResult<LocationId> {
    let mut stmt = conn.prepare_cached(LOCATION_INSERT_SQL)?;
    stmt.execute(params![
        location.city_id.as_str(),
        location.weather_source.as_id(),
        bool_to_int(location.current_position),
        location.latitude,
        location.longitude,
        location.time_zone.as_str(),
        location.country.as_str(),
        location.province.as_str(),
        location.city.as_str(),
        location.district.as_str(),
        bool_to_int(location.resident_position),
        bool_to_int(location.china),
    ])?;
    Ok(conn.last_insert_rowid())
}

fn replace_location(conn: &Connection, id: LocationId, location: &Location) -> RepoResult<()> {
    conn.execute(
        "UPDATE locations
         SET
            city_id = ?1,
            weather_source = ?2,
            current_position = ?3,
            latitude = ?4,
            longitude = ?5,
            time_zone = ?6,
            country = ?7,
            province = ?8,
            city = ?9,
            district = ?10,
            resident_position = ?11,
            china = ?12
         WHERE id = ?13;",
        params![
            location.city_id.as_str(),
            location.weather_source.as_id(),
            bool_to_int(location.current_position),
            location.latitude,
            location.longitude,
            location.time_zone.as_str(),
            location.country.as_str(),
            location.province.as_str(),
            location.city.as_str(),
            location.district.as_str(),
            bool_to_int(location.resident_position),
            bool_to_int(location.china),
            id,
        ],
    )?;
    Ok(())
}

fn parse_location_row(row: &Row<'_>) -> RepoResult<Location> {
    let source_text: String = row.get("weather_source")?;
    let weather_source = WeatherSource::from_id(&source_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid weather source `{source_text}` in locations.weather_source"
        ))
    })?;

    Ok(Location {
        id: Some(row.get("id")?),
        city_id: row.get("city_id")?,
        weather_source,
        current_position: parse_flag(row, "current_position")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        time_zone: row.get("time_zone")?,
        country: row.get("country")?,
        province: row.get("province")?,
        city: row.get("city")?,
        district: row.get("district")?,
        resident_position: parse_flag(row, "resident_position")?,
        china: parse_flag(row, "china")?,
    })
}

fn parse_flag(row: &Row<'_>, column: &'static str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in locations.{column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_location_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, LOCATIONS_TABLE)? {
        return Err(RepoError::MissingRequiredTable(LOCATIONS_TABLE));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, LOCATIONS_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: LOCATIONS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
