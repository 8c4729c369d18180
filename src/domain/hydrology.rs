//! Scalar rules applied to raw reads from the earth-observation sources.
//!
//! Every source hands back `Option<f64>` where the platform returned null.
//! The defaults live here so that each feature applies the same fallback.

/// Surface-water occurrence (percent of observations) at or above which a
/// pixel counts as permanent water.
pub const PERMANENT_WATER_OCCURRENCE: f64 = 90.0;

/// Slope floor in radians; keeps `tan(slope)` away from zero.
pub const MIN_SLOPE_RAD: f64 = 0.001;

const SQUARE_METERS_PER_SQUARE_KM: f64 = 1_000_000.0;

/// Read a possibly-null value, substituting `default` when it is missing.
#[must_use]
pub fn safe_read(raw: Option<f64>, default: f64) -> f64 {
    raw.unwrap_or(default)
}

/// 1.0 when the occurrence read marks permanent water, else 0.0.
///
/// Null occurrence reads as 0 (not permanent water).
#[must_use]
pub fn permanent_water_flag(occurrence: Option<f64>) -> f64 {
    if safe_read(occurrence, 0.0) >= PERMANENT_WATER_OCCURRENCE {
        1.0
    } else {
        0.0
    }
}

/// Upstream contributing area in km² from the sampled area in m².
#[must_use]
pub fn upstream_area_km2(upstream_m2: Option<f64>) -> f64 {
    safe_read(upstream_m2, 0.0) / SQUARE_METERS_PER_SQUARE_KM
}

/// Slope in radians for the wetness index.
///
/// A null read becomes [`MIN_SLOPE_RAD`]; the result is then floored at the
/// same value.
#[must_use]
pub fn wetness_slope_rad(slope_deg: Option<f64>) -> f64 {
    safe_read(slope_deg.map(f64::to_radians), MIN_SLOPE_RAD).max(MIN_SLOPE_RAD)
}

/// Topographic wetness index `ln(A / tan(beta))`.
///
/// `upstream_km2` of zero yields negative infinity; callers forward that value
/// unchanged and the inference side treats it as undefined.
#[must_use]
pub fn topographic_wetness_index(upstream_km2: f64, slope_rad: f64) -> f64 {
    (upstream_km2 / slope_rad.tan()).ln()
}
