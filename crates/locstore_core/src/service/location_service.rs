//! Location use-case service.
//!
//! # Responsibility
//! - Provide the entry points the location-management layer calls.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Service APIs never bypass repository matching rules.
//! - Service layer remains storage-agnostic.

use crate::model::location::{Location, LocationId, NaturalKey, WeatherSource};
use crate::repo::location_repo::{LocationRepository, RepoResult};
use log::info;

/// Use-case service wrapper for location persistence.
pub struct LocationService<R: LocationRepository> {
    repo: R,
}

impl<R: LocationRepository> LocationService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Saves one location, replacing the stored copy with the same key.
    pub fn write_location(&mut self, location: &Location) -> RepoResult<LocationId> {
        self.repo.upsert(location)
    }

    /// Replaces the full saved list, e.g. after the user reorders it.
    ///
    /// An empty list leaves the store untouched.
    pub fn write_location_list(&mut self, locations: &[Location]) -> RepoResult<()> {
        self.repo.upsert_batch(locations)?;
        if !locations.is_empty() {
            info!(
                "event=location_list_write module=service status=ok count={}",
                locations.len()
            );
        }
        Ok(())
    }

    /// Deletes one location by natural key. Returns whether it existed.
    pub fn delete_location(&mut self, location: &Location) -> RepoResult<bool> {
        self.repo.delete_one(location)
    }

    /// Removes every stored location.
    pub fn clear_locations(&mut self) -> RepoResult<usize> {
        let removed = self.repo.delete_all()?;
        info!("event=location_clear module=service status=ok removed={removed}");
        Ok(removed)
    }

    pub fn read_location(
        &self,
        city_id: &str,
        weather_source: WeatherSource,
        current_position: bool,
    ) -> RepoResult<Option<Location>> {
        self.repo.find_one(city_id, weather_source, current_position)
    }

    /// Returns the current-position location, if one is stored.
    pub fn read_current_position(&self) -> RepoResult<Option<Location>> {
        // Source is ignored for current-position lookups.
        self.repo.find_one("", WeatherSource::Accu, true)
    }

    /// Resolves a formatted id (`CURRENT_POSITION` or `{city}&{SOURCE}`).
    ///
    /// Unparseable ids resolve to `Ok(None)`.
    pub fn find_by_formatted_id(&self, formatted_id: &str) -> RepoResult<Option<Location>> {
        match NaturalKey::parse_formatted_id(formatted_id) {
            Some(NaturalKey::CurrentPosition) => self.read_current_position(),
            Some(NaturalKey::Saved {
                city_id,
                weather_source,
            }) => self.repo.find_one(&city_id, weather_source, false),
            None => Ok(None),
        }
    }

    /// Lists every stored location; empty when nothing is stored.
    pub fn read_location_list(&self) -> RepoResult<Vec<Location>> {
        self.repo.list_all()
    }

    pub fn location_count(&self) -> RepoResult<u64> {
        self.repo.count()
    }
}
