//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (Earth Engine, weather API,
//! the model pipeline, the inference service).

mod classifier;
mod earth_observation;
mod inference;

pub use classifier::{Classifier, FeatureFrame, ModelError};
pub use earth_observation::{
    EarthObservation, HydrologySample, PrecipitationSample, PrecipitationSource, SourceError,
    SpectralSample, TerrainSample,
};
pub use inference::{GatewayError, InferenceGateway};
