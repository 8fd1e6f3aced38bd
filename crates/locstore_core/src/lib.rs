//! Core persistence for weather locations.
//! This crate is the single source of truth for location identity rules.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::location::{Location, LocationId, NaturalKey, WeatherSource, CURRENT_POSITION_ID};
pub use repo::location_repo::{
    LocationRepository, RepoError, RepoResult, SqliteLocationRepository,
};
pub use service::location_service::LocationService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
