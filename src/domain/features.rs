//! The ordered flood feature vector.
//!
//! Order matches the columns the classification pipeline was trained on.

use serde::{Deserialize, Serialize};

use super::wire;

/// Number of features the pipeline consumes.
pub const FEATURE_COUNT: usize = 11;

/// Feature names in training order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "jrc_perm_water",
    "precip_1d",
    "precip_3d",
    "NDVI",
    "NDWI",
    "landcover",
    "elevation",
    "slope",
    "aspect",
    "upstream_area",
    "TWI",
];

/// Name of the wetness-index column, which may legitimately be non-finite.
pub const TWI_FEATURE: &str = "TWI";

/// One location's features, produced per request and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloodFeatures {
    /// 1.0 when the point is permanent surface water
    pub jrc_perm_water: f64,
    /// Precipitation on the last day of the window (mm)
    pub precip_1d: f64,
    /// Precipitation summed over the 3-day window (mm)
    pub precip_3d: f64,
    pub ndvi: f64,
    pub ndwi: f64,
    /// Landcover class code
    pub landcover: f64,
    /// Elevation (m)
    pub elevation: f64,
    /// Slope (degrees)
    pub slope: f64,
    /// Aspect (degrees)
    pub aspect: f64,
    /// Upstream contributing area (km²)
    pub upstream_area: f64,
    /// Topographic wetness index
    pub twi: f64,
}

impl FloodFeatures {
    /// Values in [`FEATURE_NAMES`] order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.jrc_perm_water,
            self.precip_1d,
            self.precip_3d,
            self.ndvi,
            self.ndwi,
            self.landcover,
            self.elevation,
            self.slope,
            self.aspect,
            self.upstream_area,
            self.twi,
        ]
    }

    /// `(name, value)` pairs in training order.
    #[must_use]
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES.iter().copied().zip(self.to_vec()).collect()
    }
}

/// `{"features": [...]}` body exchanged between the two services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePayload {
    #[serde(with = "wire::float_seq")]
    pub features: Vec<f64>,
}

impl FeaturePayload {
    #[must_use]
    pub fn new(features: Vec<f64>) -> Self {
        Self { features }
    }
}

impl From<&FloodFeatures> for FeaturePayload {
    fn from(f: &FloodFeatures) -> Self {
        Self::new(f.to_vec())
    }
}
