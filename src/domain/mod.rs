//! Domain layer: Core flood-risk types and rules.
//!
//! Pure Rust types with no I/O. Everything here is shared by the feature
//! builder and the inference service.

mod features;
mod geo;
pub mod hydrology;
mod prediction;
pub mod wire;

pub use features::{FeaturePayload, FloodFeatures, FEATURE_COUNT, FEATURE_NAMES, TWI_FEATURE};
pub use geo::{
    known_good_index_date, DateWindow, GeoPoint, ReferenceDates, INDEX_WINDOW_DAYS,
    PRECIPITATION_WINDOW_DAYS,
};
pub use prediction::{InferenceReply, NON_FINITE_INPUT_MESSAGE, UNDEFINED_TWI_PREDICTION};
