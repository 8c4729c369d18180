//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the two services' use cases: building features, running inference,
//! and bridging the two.

mod feature_builder;
mod inference;
mod orchestrator;

pub use feature_builder::FeatureBuilder;
pub use inference::InferenceService;
pub use orchestrator::{BridgeReply, PredictionBridge, FORWARD_FAILURE_MESSAGE};

#[cfg(test)]
pub(crate) use feature_builder::fakes as feature_fakes;
#[cfg(test)]
pub(crate) use inference::fakes as inference_fakes;
