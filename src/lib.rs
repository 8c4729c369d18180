//! # Floodsense
//!
//! Flood-risk prediction for a latitude/longitude point.
//!
//! This crate provides:
//! - A feature builder that derives eleven geospatial features from Earth
//!   Engine and Open-Meteo
//! - An inference service that guards inputs and evaluates an exported
//!   classification pipeline
//! - The HTTP surfaces of both services
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (points, feature vector, replies, hydrology math)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (Earth Engine, Open-Meteo, model pipeline)
//! - `application`: Use cases orchestrating domain and ports
//! - `http`: axum routers for the backend and the inference service
//! - `bootstrap`: wiring of configured adapters into the services

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod http;
pub mod ports;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use domain::{FloodFeatures, GeoPoint, InferenceReply};

/// Result type for Floodsense operations
pub type Result<T> = std::result::Result<T, FloodsenseError>;

/// Main error type for Floodsense
#[derive(Debug, thiserror::Error)]
pub enum FloodsenseError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Feature source failed: {0}")]
    Source(#[from] ports::SourceError),

    #[error("Model error: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Inference forwarding failed: {0}")]
    Gateway(#[from] ports::GatewayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
