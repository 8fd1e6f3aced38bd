//! FFI use-case API for Flutter-facing location calls.
//!
//! # Responsibility
//! - Expose the location store to Dart via FRB as flat, sync functions.
//! - Keep error semantics simple: `ok` flag plus a human-readable message.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Weather sources cross the boundary as lowercase ids (`accu`, `owm`, ...).

use locstore_core::db::open_db;
use locstore_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Location, LocationService, RepoResult, SqliteLocationRepository, WeatherSource,
};
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;

const LOCATION_DB_FILE_NAME: &str = "locstore_locations.sqlite3";
const LOCATION_DB_PATH_ENV: &str = "LOCSTORE_DB_PATH";
static LOCATION_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// Returns an empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Flat location shape exchanged with Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationItem {
    /// Surrogate id; `None` for records not yet stored.
    pub id: Option<i64>,
    pub city_id: String,
    /// Lowercase weather source id.
    pub weather_source: String,
    pub current_position: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub time_zone: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub resident_position: bool,
    pub china: bool,
    /// `CURRENT_POSITION` or `{city_id}&{SOURCE}`. Ignored on input.
    pub formatted_id: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Affected surrogate id, when the action has one.
    pub location_id: Option<i64>,
    /// Affected row count, when the action has one.
    pub affected: Option<u64>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl LocationActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            location_id: None,
            affected: None,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            location_id: None,
            affected: None,
            message: message.into(),
        }
    }
}

/// List/lookup response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationListResponse {
    pub ok: bool,
    /// Matching locations; empty on failure or when nothing matches.
    pub items: Vec<LocationItem>,
    pub message: String,
}

impl LocationListResponse {
    fn from_result(operation: &str, result: Result<Vec<Location>, String>) -> Self {
        match result {
            Ok(locations) => {
                let items = locations.iter().map(to_location_item).collect::<Vec<_>>();
                let message = if items.is_empty() {
                    "No locations.".to_string()
                } else {
                    format!("Found {} location(s).", items.len())
                };
                Self {
                    ok: true,
                    items,
                    message,
                }
            }
            Err(err) => Self {
                ok: false,
                items: Vec::new(),
                message: format!("{operation} failed: {err}"),
            },
        }
    }
}

/// Saves one location, replacing any stored copy with the same natural key.
#[flutter_rust_bridge::frb(sync)]
pub fn location_upsert(item: LocationItem) -> LocationActionResponse {
    let result = from_location_item(&item)
        .and_then(|location| with_location_service(|service| service.write_location(&location)));
    match result {
        Ok(id) => LocationActionResponse {
            location_id: Some(id),
            ..LocationActionResponse::success("Location saved.")
        },
        Err(err) => LocationActionResponse::failure(format!("location_upsert failed: {err}")),
    }
}

/// Replaces the full location list. An empty list is a no-op.
#[flutter_rust_bridge::frb(sync)]
pub fn location_replace_all(items: Vec<LocationItem>) -> LocationActionResponse {
    let result = items
        .iter()
        .map(from_location_item)
        .collect::<Result<Vec<_>, _>>()
        .and_then(|locations| {
            with_location_service(|service| service.write_location_list(&locations))
                .map(|()| locations.len())
        });
    match result {
        Ok(count) => LocationActionResponse {
            affected: Some(count as u64),
            ..LocationActionResponse::success("Location list replaced.")
        },
        Err(err) => {
            LocationActionResponse::failure(format!("location_replace_all failed: {err}"))
        }
    }
}

/// Deletes the location matching the given natural key, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn location_delete(item: LocationItem) -> LocationActionResponse {
    let result = from_location_item(&item)
        .and_then(|location| with_location_service(|service| service.delete_location(&location)));
    match result {
        Ok(removed) => LocationActionResponse {
            affected: Some(u64::from(removed)),
            ..LocationActionResponse::success(if removed {
                "Location deleted."
            } else {
                "No matching location."
            })
        },
        Err(err) => LocationActionResponse::failure(format!("location_delete failed: {err}")),
    }
}

/// Removes every stored location.
#[flutter_rust_bridge::frb(sync)]
pub fn location_clear() -> LocationActionResponse {
    match with_location_service(|service| service.clear_locations()) {
        Ok(removed) => LocationActionResponse {
            affected: Some(removed as u64),
            ..LocationActionResponse::success("Locations cleared.")
        },
        Err(err) => LocationActionResponse::failure(format!("location_clear failed: {err}")),
    }
}

/// Looks up one location by natural key. `items` holds zero or one entry.
#[flutter_rust_bridge::frb(sync)]
pub fn location_find(
    city_id: String,
    weather_source: String,
    current_position: bool,
) -> LocationListResponse {
    let result = parse_source(&weather_source).and_then(|source| {
        with_location_service(|service| {
            service.read_location(&city_id, source, current_position)
        })
        .map(|found| found.into_iter().collect::<Vec<_>>())
    });
    LocationListResponse::from_result("location_find", result)
}

/// Lists every stored location in storage order.
#[flutter_rust_bridge::frb(sync)]
pub fn location_list() -> LocationListResponse {
    let result = with_location_service(|service| service.read_location_list());
    LocationListResponse::from_result("location_list", result)
}

/// Returns the stored location count.
#[flutter_rust_bridge::frb(sync)]
pub fn location_count() -> LocationActionResponse {
    match with_location_service(|service| service.location_count()) {
        Ok(count) => LocationActionResponse {
            affected: Some(count),
            ..LocationActionResponse::success(format!("{count} location(s)."))
        },
        Err(err) => LocationActionResponse::failure(format!("location_count failed: {err}")),
    }
}

fn resolve_location_db_path() -> PathBuf {
    LOCATION_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(LOCATION_DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(LOCATION_DB_FILE_NAME)
        })
        .clone()
}

fn with_location_service<T>(
    f: impl FnOnce(&mut LocationService<SqliteLocationRepository<'_>>) -> RepoResult<T>,
) -> Result<T, String> {
    let db_path = resolve_location_db_path();
    let mut conn = open_db(&db_path).map_err(|err| format!("location DB open failed: {err}"))?;
    let repo = SqliteLocationRepository::try_new(&mut conn)
        .map_err(|err| format!("location repo init failed: {err}"))?;
    let mut service = LocationService::new(repo);
    f(&mut service).map_err(|err| err.to_string())
}

fn parse_source(value: &str) -> Result<WeatherSource, String> {
    let normalized = value.trim().to_ascii_lowercase();
    WeatherSource::from_id(&normalized).ok_or_else(|| {
        warn!("event=ffi_input module=ffi status=error error_code=unknown_weather_source");
        format!("unknown weather source `{normalized}`")
    })
}

fn from_location_item(item: &LocationItem) -> Result<Location, String> {
    Ok(Location {
        id: item.id,
        city_id: item.city_id.clone(),
        weather_source: parse_source(&item.weather_source)?,
        current_position: item.current_position,
        latitude: item.latitude,
        longitude: item.longitude,
        time_zone: item.time_zone.clone(),
        country: item.country.clone(),
        province: item.province.clone(),
        city: item.city.clone(),
        district: item.district.clone(),
        resident_position: item.resident_position,
        china: item.china,
    })
}

fn to_location_item(location: &Location) -> LocationItem {
    LocationItem {
        id: location.id,
        city_id: location.city_id.clone(),
        weather_source: location.weather_source.as_id().to_string(),
        current_position: location.current_position,
        latitude: location.latitude,
        longitude: location.longitude,
        time_zone: location.time_zone.clone(),
        country: location.country.clone(),
        province: location.province.clone(),
        city: location.city.clone(),
        district: location.district.clone(),
        resident_position: location.resident_position,
        china: location.china,
        formatted_id: location.formatted_id(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, from_location_item, init_logging, location_clear, location_count,
        location_delete, location_find, location_list, location_replace_all, location_upsert,
        ping, to_location_item, LocationItem,
    };
    use locstore_core::{Location, WeatherSource};

    fn item(city_id: &str, source: &str, city: &str) -> LocationItem {
        let mut location = Location::new(city_id, WeatherSource::Accu);
        location.city = city.to_string();
        LocationItem {
            weather_source: source.to_string(),
            ..to_location_item(&location)
        }
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn item_conversion_accepts_any_case_source_and_rejects_unknown() {
        let location = from_location_item(&item("1", " OWM ", "x")).unwrap();
        assert_eq!(location.weather_source, WeatherSource::Owm);

        let err = from_location_item(&item("1", "yahoo", "x")).unwrap_err();
        assert!(err.contains("yahoo"));
    }

    #[test]
    fn invalid_source_fails_without_touching_store() {
        let response = location_upsert(item("1", "yahoo", "x"));
        assert!(!response.ok);
        assert!(response.message.contains("location_upsert failed"));

        let lookup = location_find("1".to_string(), "nope".to_string(), false);
        assert!(!lookup.ok);
        assert!(lookup.items.is_empty());
    }

    // Single test so the shared DB file is not mutated concurrently.
    #[test]
    fn location_lifecycle_through_ffi() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(super::LOCATION_DB_PATH_ENV, dir.path().join("ffi.sqlite3"));

        assert!(location_clear().ok);

        let replaced = location_replace_all(vec![
            item("1", "accu", "One"),
            item("2", "cn", "Two"),
        ]);
        assert!(replaced.ok, "{}", replaced.message);
        assert_eq!(replaced.affected, Some(2));
        assert_eq!(location_count().affected, Some(2));

        let saved = location_upsert(item("2", "cn", "Two renamed"));
        assert!(saved.ok, "{}", saved.message);
        let found = location_find("2".to_string(), "cn".to_string(), false);
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.items[0].city, "Two renamed");
        assert_eq!(found.items[0].id, saved.location_id);
        assert_eq!(found.items[0].formatted_id, "2&CN");

        let deleted = location_delete(item("1", "accu", ""));
        assert_eq!(deleted.affected, Some(1));
        let missing = location_delete(item("1", "accu", ""));
        assert!(missing.ok);
        assert_eq!(missing.affected, Some(0));

        let listed = location_list();
        assert!(listed.ok);
        assert_eq!(listed.items.len(), 1);

        let empty = location_replace_all(Vec::new());
        assert!(empty.ok);
        assert_eq!(location_count().affected, Some(1));
    }
}
