//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external services:
//! - `earthengine`: Earth Engine REST API (geospatial reductions, CHIRPS)
//! - `openmeteo`: Open-Meteo daily precipitation
//! - `pipeline`: exported classification pipelines
//! - `model_store`: bundle download, verification and loading
//! - `ai_client`: HTTP forwarding to the inference service
//! - `sanitize`: credential filtering for logs

pub mod ai_client;
pub mod earthengine;
pub mod model_store;
pub mod openmeteo;
pub mod pipeline;
pub mod sanitize;

pub use ai_client::HttpInferenceGateway;
pub use earthengine::chirps::ChirpsPrecipitation;
pub use earthengine::EarthEngineClient;
pub use model_store::{load_bundle, ModelSource};
pub use openmeteo::OpenMeteoClient;
pub use pipeline::{ModelBundle, Pipeline};
