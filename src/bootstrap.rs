//! Service wiring: Turns loaded configuration into ready-to-serve services.

use std::sync::Arc;

use crate::adapters::{
    load_bundle, ChirpsPrecipitation, EarthEngineClient, HttpInferenceGateway, OpenMeteoClient,
    Pipeline,
};
use crate::application::{FeatureBuilder, InferenceService, PredictionBridge};
use crate::config::{BackendConfig, InferenceConfig, PrecipitationProvider};
use crate::ports::{EarthObservation, InferenceGateway, PrecipitationSource};
use crate::Result;

/// Build the backend's feature builder and forwarding bridge.
///
/// Creates blocking HTTP clients; call outside the async runtime.
///
/// # Errors
/// Returns error if an HTTP client cannot be built.
pub fn prediction_bridge(config: &BackendConfig) -> Result<PredictionBridge> {
    let ee = Arc::new(EarthEngineClient::new(&config.earth_engine)?);

    let precipitation: Arc<dyn PrecipitationSource> = match config.precipitation {
        PrecipitationProvider::OpenMeteo => Arc::new(OpenMeteoClient::new(
            config.open_meteo_url.clone(),
            config.precipitation_timezone.clone(),
        )?),
        PrecipitationProvider::Chirps => Arc::new(ChirpsPrecipitation::new(Arc::clone(&ee))),
    };
    tracing::info!("Precipitation source: {:?}", config.precipitation);

    let earth: Arc<dyn EarthObservation> = ee;
    let gateway: Arc<dyn InferenceGateway> =
        Arc::new(HttpInferenceGateway::new(config.ai_service_url.clone())?);

    Ok(PredictionBridge::new(
        FeatureBuilder::new(earth, precipitation),
        gateway,
    ))
}

/// Load (downloading if needed) the model bundle and wrap it in the service.
///
/// # Errors
/// Returns error if the bundle is missing, fails verification, or is invalid.
pub fn inference_service(config: &InferenceConfig) -> Result<InferenceService<Pipeline>> {
    let (feature_columns, pipeline) = load_bundle(&config.model)?.into_parts();
    Ok(InferenceService::new(Arc::new(pipeline), feature_columns)?)
}
