//! Earth-observation ports: Traits for the remote geospatial and weather sources.
//!
//! These traits return raw reads (`None` where the platform returned null).
//! Defaults and derived quantities are applied by the feature builder.

use chrono::NaiveDate;

use crate::domain::{DateWindow, GeoPoint};

/// Errors raised by a remote data source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned HTTP {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

/// Composite NDVI/NDWI sampled at a point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectralSample {
    pub ndvi: Option<f64>,
    pub ndwi: Option<f64>,
}

/// Elevation (m), slope and aspect (degrees) at a point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TerrainSample {
    pub elevation: Option<f64>,
    pub slope: Option<f64>,
    pub aspect: Option<f64>,
}

/// Upstream contributing area (m²) and slope (degrees) at a point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HydrologySample {
    pub upstream_area_m2: Option<f64>,
    pub slope_deg: Option<f64>,
}

/// Precipitation totals (mm) for the 1-day and 3-day windows.
///
/// `None` means the provider had no data for the window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PrecipitationSample {
    pub one_day: Option<f64>,
    pub three_day: Option<f64>,
}

/// Point reductions on the geospatial analysis platform.
pub trait EarthObservation: Send + Sync {
    /// Surface-water occurrence (percent) at the point.
    ///
    /// # Errors
    /// Returns error if the platform call fails.
    fn surface_water_occurrence(&self, point: GeoPoint) -> Result<Option<f64>, SourceError>;

    /// Cloud-masked composite of the optical scenes within `window`.
    ///
    /// # Returns
    /// `None` when no scene qualifies for the window.
    ///
    /// # Errors
    /// Returns error if the platform call fails.
    fn spectral_indices(
        &self,
        point: GeoPoint,
        window: DateWindow,
    ) -> Result<Option<SpectralSample>, SourceError>;

    /// Landcover class code at the point.
    ///
    /// # Errors
    /// Returns error if the platform call fails.
    fn landcover_class(&self, point: GeoPoint) -> Result<Option<f64>, SourceError>;

    /// Terrain derived from the elevation model.
    ///
    /// # Errors
    /// Returns error if the platform call fails.
    fn terrain(&self, point: GeoPoint) -> Result<TerrainSample, SourceError>;

    /// Flow accumulation and slope inputs for the wetness index.
    ///
    /// # Errors
    /// Returns error if the platform call fails.
    fn hydrology(&self, point: GeoPoint) -> Result<HydrologySample, SourceError>;
}

/// Daily precipitation provider.
pub trait PrecipitationSource: Send + Sync {
    /// Totals for the windows ending at `end`.
    ///
    /// # Errors
    /// Returns error if the provider cannot be reached or answers with an error.
    fn precipitation(
        &self,
        point: GeoPoint,
        end: NaiveDate,
    ) -> Result<PrecipitationSample, SourceError>;
}
