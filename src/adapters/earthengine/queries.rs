//! Expression builders and result readers for each Earth Engine dataset.

use serde_json::Value;

use super::expr::{self, Expr, MAPPING_VAR};
use crate::domain::{DateWindow, GeoPoint};

pub const SURFACE_WATER: &str = "JRC/GSW1_4/GlobalSurfaceWater";
pub const SENTINEL2_SR: &str = "COPERNICUS/S2_SR_HARMONIZED";
pub const WORLD_COVER: &str = "ESA/WorldCover/v200";
pub const SRTM: &str = "USGS/SRTMGL1_003";
pub const FLOW_ACCUMULATION: &str = "WWF/HydroSHEDS/15ACC";
pub const CHIRPS_DAILY: &str = "UCSB-CHG/CHIRPS/DAILY";

/// Scenes above this cloudy-pixel percentage are skipped.
const MAX_CLOUDY_PIXEL_PERCENTAGE: f64 = 30.0;
const QA_CLOUD_BIT: f64 = (1 << 10) as f64;
const QA_CIRRUS_BIT: f64 = (1 << 11) as f64;
const REFLECTANCE_SCALE: f64 = 10_000.0;
/// Sampling buffer that tolerates registration error between scenes.
const SPECTRAL_BUFFER_M: f64 = 100.0;

/// Number stored under `key` in a reduction dictionary; `None` for null or absent.
#[must_use]
pub fn band_value(result: &Value, key: &str) -> Option<f64> {
    result.get(key).and_then(Value::as_f64)
}

pub fn surface_water_occurrence(p: GeoPoint) -> Expr {
    expr::first_in_region(
        expr::select(expr::image(SURFACE_WATER), &["occurrence"]),
        expr::point(p),
        Expr::from(30.0),
    )
}

fn sentinel_scenes(p: GeoPoint, window: DateWindow) -> Expr {
    let scenes = expr::filter_bounds(expr::image_collection(SENTINEL2_SR), expr::point(p));
    let scenes = expr::filter_date(scenes, window);
    expr::filter_less_than(scenes, "CLOUDY_PIXEL_PERCENTAGE", MAX_CLOUDY_PIXEL_PERCENTAGE)
}

/// Number of scenes that qualify for the composite.
pub fn sentinel_scene_count(p: GeoPoint, window: DateWindow) -> Expr {
    expr::size(sentinel_scenes(p, window))
}

/// Mask cloud and cirrus pixels, scale to reflectance, and emit NDVI/NDWI bands.
fn masked_indices() -> Expr {
    let scene = Expr::Argument(MAPPING_VAR);
    let qa = expr::select(scene.clone(), &["QA60"]);
    let clear = |bit: f64| {
        expr::image_op(
            "Image.eq",
            expr::image_op("Image.bitwiseAnd", qa.clone(), expr::constant_image(bit)),
            expr::constant_image(0.0),
        )
    };
    let mask = expr::image_op("Image.and", clear(QA_CLOUD_BIT), clear(QA_CIRRUS_BIT));
    let masked = Expr::call("Image.updateMask", [("image", scene), ("mask", mask)]);
    let reflectance = expr::image_op(
        "Image.divide",
        masked,
        expr::constant_image(REFLECTANCE_SCALE),
    );

    let ndvi = expr::rename(
        expr::normalized_difference(reflectance.clone(), "B8", "B4"),
        "NDVI",
    );
    let ndwi = expr::rename(expr::normalized_difference(reflectance, "B3", "B8"), "NDWI");
    Expr::lambda(
        vec![MAPPING_VAR],
        Expr::call("Image.addBands", [("dstImg", ndvi), ("srcImg", ndwi)]),
    )
}

/// Median NDVI/NDWI composite sampled around the point.
///
/// The result dictionary is keyed `NDVI_median` and `NDWI_median`.
pub fn sentinel_composite(p: GeoPoint, window: DateWindow) -> Expr {
    let indices = expr::map(sentinel_scenes(p, window), masked_indices());
    expr::first_in_region(
        expr::reduce(indices, "Reducer.median"),
        expr::buffer(expr::point(p), SPECTRAL_BUFFER_M),
        Expr::from(10.0),
    )
}

pub const NDVI_KEY: &str = "NDVI_median";
pub const NDWI_KEY: &str = "NDWI_median";

pub fn landcover(p: GeoPoint) -> Expr {
    expr::first_in_region(
        expr::select(expr::first(expr::image_collection(WORLD_COVER)), &["Map"]),
        expr::point(p),
        Expr::from(10.0),
    )
}

/// Elevation, slope and aspect in one reduction.
pub fn terrain(p: GeoPoint) -> Expr {
    let products = Expr::call("Terrain.products", [("input", expr::image(SRTM))]);
    expr::first_in_region(
        expr::select(products, &["elevation", "slope", "aspect"]),
        expr::point(p),
        Expr::from(30.0),
    )
}

/// Flow-accumulation cell count times cell area, on the accumulation grid.
///
/// The result dictionary is keyed `b1` and holds m².
pub fn upstream_area(p: GeoPoint) -> Expr {
    let accumulation = expr::select(expr::image(FLOW_ACCUMULATION), &["b1"]);
    let projection = Expr::call("Image.projection", [("image", accumulation.clone())]);
    let cell_area = Expr::call(
        "Image.reproject",
        [
            ("image", Expr::invoke("Image.pixelArea")),
            ("crs", projection.clone()),
        ],
    );
    expr::first_in_region(
        expr::image_op("Image.multiply", accumulation, cell_area),
        expr::point(p),
        Expr::call("Projection.nominalScale", [("proj", projection)]),
    )
}

pub fn slope(p: GeoPoint) -> Expr {
    expr::first_in_region(
        Expr::call("Terrain.slope", [("input", expr::image(SRTM))]),
        expr::point(p),
        Expr::from(30.0),
    )
}

fn chirps_days(p: GeoPoint, window: DateWindow) -> Expr {
    let days = expr::filter_bounds(expr::image_collection(CHIRPS_DAILY), expr::point(p));
    expr::filter_date(days, window)
}

pub fn chirps_day_count(p: GeoPoint, window: DateWindow) -> Expr {
    expr::size(chirps_days(p, window))
}

/// Summed precipitation over the window, keyed `precipitation_sum`.
pub fn chirps_total(p: GeoPoint, window: DateWindow) -> Expr {
    expr::first_in_region(
        expr::reduce(chirps_days(p, window), "Reducer.sum"),
        expr::point(p),
        Expr::from(5000.0),
    )
}

pub const CHIRPS_TOTAL_KEY: &str = "precipitation_sum";
