//! Earth Engine adapter: Implementation of EarthObservation over the REST API.
//!
//! Each feature source becomes one or two `value:compute` calls. Reductions
//! run on the platform; this module only builds expressions and reads the
//! returned dictionaries.
//!
//! Calls carry no request timeout and are never retried. A slow platform
//! stalls the request.

pub mod chirps;
pub mod expr;
pub mod queries;

use reqwest::blocking::Client;
use serde_json::{json, Value};

use crate::config::{AccessToken, EarthEngineConfig};
use crate::domain::{DateWindow, GeoPoint};
use crate::ports::{
    EarthObservation, HydrologySample, SourceError, SpectralSample, TerrainSample,
};

use expr::Expr;

const SERVICE: &str = "Earth Engine";

/// Longest error body quoted back in a `SourceError`.
const MAX_ERROR_BODY: usize = 500;

/// Blocking Earth Engine REST client bound to one cloud project.
pub struct EarthEngineClient {
    http: Client,
    endpoint: String,
    token: AccessToken,
}

impl std::fmt::Debug for EarthEngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EarthEngineClient")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token)
            .finish()
    }
}

impl EarthEngineClient {
    /// Create a client for `value:compute` in the configured project.
    ///
    /// # Errors
    /// Returns `SourceError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &EarthEngineConfig) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| SourceError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let endpoint = format!(
            "{}/projects/{}/value:compute",
            config.api_base.trim_end_matches('/'),
            config.project
        );
        tracing::info!("Earth Engine endpoint: {}", endpoint);

        Ok(Self {
            http,
            endpoint,
            token: config.token.clone(),
        })
    }

    /// Evaluate an expression and return its `result` value.
    ///
    /// # Errors
    /// Returns error on transport failure, a non-2xx status (with the API's
    /// error message), or an undecodable body.
    pub fn compute(&self, expression: &Expr) -> Result<Value, SourceError> {
        let body = json!({ "expression": expression.encode() });

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.token.expose())
            .json(&body)
            .send()
            .map_err(|e| SourceError::Transport {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(SourceError::Status {
                service: SERVICE,
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let mut payload: Value = resp.json().map_err(|e| SourceError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;
        Ok(payload
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    fn compute_count(&self, expression: &Expr) -> Result<u64, SourceError> {
        let value = self.compute(expression)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().map(|f| f.max(0.0) as u64))
            .ok_or_else(|| SourceError::Decode {
                service: SERVICE,
                message: format!("expected a collection size, got {value}"),
            })
    }
}

/// Pull `error.message` out of a Google API error body, else quote the body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let mut end = body.len().min(MAX_ERROR_BODY);
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body[..end].to_string()
        })
}

impl EarthObservation for EarthEngineClient {
    fn surface_water_occurrence(&self, point: GeoPoint) -> Result<Option<f64>, SourceError> {
        let result = self.compute(&queries::surface_water_occurrence(point))?;
        Ok(queries::band_value(&result, "occurrence"))
    }

    fn spectral_indices(
        &self,
        point: GeoPoint,
        window: DateWindow,
    ) -> Result<Option<SpectralSample>, SourceError> {
        let scenes = self.compute_count(&queries::sentinel_scene_count(point, window))?;
        tracing::debug!(
            "{} Sentinel-2 scenes between {} and {}",
            scenes,
            window.start,
            window.end
        );
        if scenes == 0 {
            return Ok(None);
        }

        let result = self.compute(&queries::sentinel_composite(point, window))?;
        Ok(Some(SpectralSample {
            ndvi: queries::band_value(&result, queries::NDVI_KEY),
            ndwi: queries::band_value(&result, queries::NDWI_KEY),
        }))
    }

    fn landcover_class(&self, point: GeoPoint) -> Result<Option<f64>, SourceError> {
        let result = self.compute(&queries::landcover(point))?;
        Ok(queries::band_value(&result, "Map"))
    }

    fn terrain(&self, point: GeoPoint) -> Result<TerrainSample, SourceError> {
        let result = self.compute(&queries::terrain(point))?;
        Ok(TerrainSample {
            elevation: queries::band_value(&result, "elevation"),
            slope: queries::band_value(&result, "slope"),
            aspect: queries::band_value(&result, "aspect"),
        })
    }

    fn hydrology(&self, point: GeoPoint) -> Result<HydrologySample, SourceError> {
        let upstream = self.compute(&queries::upstream_area(point))?;
        let slope = self.compute(&queries::slope(point))?;
        Ok(HydrologySample {
            upstream_area_m2: queries::band_value(&upstream, "b1"),
            slope_deg: queries::band_value(&slope, "slope"),
        })
    }
}
