//! Geographic points and the reference dates that anchor time-windowed sources.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days on either side of the reference date searched for optical scenes.
pub const INDEX_WINDOW_DAYS: u64 = 15;

/// Days summed by the longer precipitation window.
pub const PRECIPITATION_WINDOW_DAYS: u64 = 3;

/// Calendar room a reference date needs on either side. Covers the optical
/// window and every precipitation window plus its publication lag.
pub const REFERENCE_MARGIN_DAYS: u64 = 31;

/// A WGS84 location in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Coordinates in the `[lon, lat]` order Earth Engine geometries expect.
    #[must_use]
    pub fn coordinates(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    /// Validate that the point lies on the globe.
    ///
    /// # Errors
    /// Returns a description of the first out-of-range coordinate.
    pub fn validate(&self) -> Result<(), String> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("Latitude {} out of range [-90, 90]", self.lat));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!("Longitude {} out of range [-180, 180]", self.lon));
        }
        Ok(())
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

/// Closed-open date range `[start, end)` used to filter image collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window spanning `half_width` days either side of `center`.
    ///
    /// Saturates at the calendar bounds.
    #[must_use]
    pub fn centered(center: NaiveDate, half_width: u64) -> Self {
        Self {
            start: center
                .checked_sub_days(Days::new(half_width))
                .unwrap_or(NaiveDate::MIN),
            end: center
                .checked_add_days(Days::new(half_width))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    /// Window of `days` days that ends (exclusive) at `end`.
    #[must_use]
    pub fn ending(end: NaiveDate, days: u64) -> Self {
        Self {
            start: end
                .checked_sub_days(Days::new(days))
                .unwrap_or(NaiveDate::MIN),
            end,
        }
    }
}

/// Sentinel-2 date known to have cloud-free coverage over the service region.
#[must_use]
pub fn known_good_index_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 8, 15).unwrap_or(NaiveDate::MIN)
}

/// Dates each time-windowed source is anchored on for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceDates {
    /// Last day of the precipitation windows.
    pub precipitation_end: NaiveDate,
    /// Center of the optical scene search window.
    pub index_center: NaiveDate,
}

impl ReferenceDates {
    /// Resolve the request's optional date.
    ///
    /// Without a date, precipitation ends today and the optical window is
    /// centered on [`known_good_index_date`].
    ///
    /// # Errors
    /// Returns a description when the requested date sits within
    /// [`REFERENCE_MARGIN_DAYS`] of the calendar bounds.
    pub fn resolve(requested: Option<NaiveDate>, today: NaiveDate) -> Result<Self, String> {
        if let Some(date) = requested {
            let margin = Days::new(REFERENCE_MARGIN_DAYS);
            if date.checked_sub_days(margin).is_none() || date.checked_add_days(margin).is_none() {
                return Err(format!("Date {date} is outside the supported range"));
            }
        }
        Ok(Self {
            precipitation_end: requested.unwrap_or(today),
            index_center: requested.unwrap_or_else(known_good_index_date),
        })
    }
}
