//! Location domain model.
//!
//! # Responsibility
//! - Define the canonical weather location record persisted by core.
//! - Define the natural key used to match "the same" location across writes.
//!
//! # Invariants
//! - `id` is assigned by storage and never changes once set.
//! - At most one stored location has `current_position == true`. Callers
//!   uphold this; lookups rely on it.
//! - Payload fields are opaque to storage and never validated here.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Storage-assigned surrogate identifier (SQLite rowid).
pub type LocationId = i64;

/// Formatted id reserved for the current-position location.
pub const CURRENT_POSITION_ID: &str = "CURRENT_POSITION";

const FORMATTED_ID_SEPARATOR: char = '&';

/// Weather data provider that issued a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSource {
    /// AccuWeather.
    Accu,
    /// China Meteorological Administration.
    Cn,
    /// Caiyun.
    Caiyun,
    /// OpenWeatherMap.
    Owm,
    /// Meteo France.
    Mf,
    /// Korea Meteorological Administration.
    Kma,
}

impl WeatherSource {
    /// All known sources in declaration order.
    pub const ALL: [WeatherSource; 6] = [
        WeatherSource::Accu,
        WeatherSource::Cn,
        WeatherSource::Caiyun,
        WeatherSource::Owm,
        WeatherSource::Mf,
        WeatherSource::Kma,
    ];

    /// Canonical persisted id. This is what lookups compare against.
    pub fn as_id(self) -> &'static str {
        match self {
            Self::Accu => "accu",
            Self::Cn => "cn",
            Self::Caiyun => "caiyun",
            Self::Owm => "owm",
            Self::Mf => "mf",
            Self::Kma => "kma",
        }
    }

    /// Parses a canonical id. Matching is exact (lowercase only).
    pub fn from_id(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|source| source.as_id() == value)
    }
}

impl Display for WeatherSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_id())
    }
}

/// Caller-meaningful identity of a location.
///
/// The current-position slot is a singleton and ignores city/source;
/// every other location is keyed by `(city_id, weather_source)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NaturalKey {
    /// The single live/auto-detected location.
    CurrentPosition,
    /// A user-saved location.
    Saved {
        city_id: String,
        weather_source: WeatherSource,
    },
}

impl NaturalKey {
    /// Builds a key from the three persisted key columns.
    ///
    /// `city_id` and `weather_source` are discarded when `current_position`
    /// is set.
    pub fn from_parts(
        city_id: impl Into<String>,
        weather_source: WeatherSource,
        current_position: bool,
    ) -> Self {
        if current_position {
            Self::CurrentPosition
        } else {
            Self::Saved {
                city_id: city_id.into(),
                weather_source,
            }
        }
    }

    /// Renders the application-facing formatted id.
    ///
    /// - `CurrentPosition` -> `CURRENT_POSITION`
    /// - `Saved` -> `{city_id}&{SOURCE}`
    pub fn formatted_id(&self) -> String {
        match self {
            Self::CurrentPosition => CURRENT_POSITION_ID.to_string(),
            Self::Saved {
                city_id,
                weather_source,
            } => format!(
                "{city_id}{FORMATTED_ID_SEPARATOR}{}",
                weather_source.as_id().to_ascii_uppercase()
            ),
        }
    }

    /// Parses a formatted id back into a key.
    ///
    /// Returns `None` when the separator is missing or the source is unknown.
    /// The split happens on the last separator so city ids may contain `&`.
    pub fn parse_formatted_id(value: &str) -> Option<Self> {
        if value == CURRENT_POSITION_ID {
            return Some(Self::CurrentPosition);
        }
        let (city_id, source) = value.rsplit_once(FORMATTED_ID_SEPARATOR)?;
        let weather_source = WeatherSource::from_id(&source.to_ascii_lowercase())?;
        Some(Self::Saved {
            city_id: city_id.to_string(),
            weather_source,
        })
    }
}

/// Canonical weather location record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Surrogate id. `None` until the record has been persisted once.
    pub id: Option<LocationId>,
    /// Provider city id. Empty is allowed for the current position.
    pub city_id: String,
    pub weather_source: WeatherSource,
    /// Marks the live/auto-detected location slot.
    pub current_position: bool,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone name, e.g. `Europe/Paris`.
    pub time_zone: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
    /// Set when the user marked this as their resident location.
    pub resident_position: bool,
    /// Set when the location lies in mainland China.
    pub china: bool,
}

impl Location {
    /// Creates an unsaved, user-saved location with empty payload.
    pub fn new(city_id: impl Into<String>, weather_source: WeatherSource) -> Self {
        Self {
            id: None,
            city_id: city_id.into(),
            weather_source,
            current_position: false,
            latitude: 0.0,
            longitude: 0.0,
            time_zone: String::new(),
            country: String::new(),
            province: String::new(),
            city: String::new(),
            district: String::new(),
            resident_position: false,
            china: false,
        }
    }

    /// Creates an unsaved current-position location with empty city id.
    pub fn current_position(weather_source: WeatherSource) -> Self {
        Self {
            current_position: true,
            ..Self::new(String::new(), weather_source)
        }
    }

    /// Returns the natural key this record is matched by.
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::from_parts(
            self.city_id.as_str(),
            self.weather_source,
            self.current_position,
        )
    }

    /// Shorthand for `natural_key().formatted_id()`.
    pub fn formatted_id(&self) -> String {
        self.natural_key().formatted_id()
    }

    /// Returns a copy carrying the given surrogate id.
    pub fn with_id(mut self, id: LocationId) -> Self {
        self.id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Location, NaturalKey, WeatherSource, CURRENT_POSITION_ID};

    #[test]
    fn source_ids_roundtrip_for_every_variant() {
        for source in WeatherSource::ALL {
            assert_eq!(WeatherSource::from_id(source.as_id()), Some(source));
        }
        assert_eq!(WeatherSource::from_id("ACCU"), None);
        assert_eq!(WeatherSource::from_id(""), None);
    }

    #[test]
    fn current_position_key_ignores_city_and_source() {
        let a = NaturalKey::from_parts("123", WeatherSource::Accu, true);
        let b = NaturalKey::from_parts("", WeatherSource::Mf, true);
        assert_eq!(a, b);
        assert_eq!(a, NaturalKey::CurrentPosition);
    }

    #[test]
    fn formatted_id_uses_uppercase_source_suffix() {
        let location = Location::new("101010100", WeatherSource::Cn);
        assert_eq!(location.formatted_id(), "101010100&CN");
        assert_eq!(
            Location::current_position(WeatherSource::Owm).formatted_id(),
            CURRENT_POSITION_ID
        );
    }

    #[test]
    fn parse_formatted_id_splits_on_last_separator() {
        let key = NaturalKey::parse_formatted_id("a&b&MF").expect("should parse");
        assert_eq!(
            key,
            NaturalKey::Saved {
                city_id: "a&b".to_string(),
                weather_source: WeatherSource::Mf,
            }
        );
        assert_eq!(
            NaturalKey::parse_formatted_id(CURRENT_POSITION_ID),
            Some(NaturalKey::CurrentPosition)
        );
        assert_eq!(NaturalKey::parse_formatted_id("no-separator"), None);
        assert_eq!(NaturalKey::parse_formatted_id("1&UNKNOWN"), None);
    }
}
