//! Prediction bridge: Builds features and forwards them to the inference service.

use std::sync::Arc;

use serde::Serialize;

use super::FeatureBuilder;
use crate::domain::{wire, GeoPoint, ReferenceDates};
use crate::ports::{InferenceGateway, SourceError};

/// Error text returned when the inference service cannot be reached.
pub const FORWARD_FAILURE_MESSAGE: &str = "AI service call failed";

/// Backend reply for one location.
///
/// Both variants are answered with HTTP 200.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BridgeReply {
    /// Features as sent and the inference service's JSON, verbatim.
    Success {
        #[serde(with = "wire::float_seq")]
        features: Vec<f64>,
        ai_response: serde_json::Value,
    },
    UpstreamFailure { error: String, details: String },
}

pub struct PredictionBridge<G: InferenceGateway + ?Sized = dyn InferenceGateway> {
    features: FeatureBuilder,
    gateway: Arc<G>,
}

impl<G: InferenceGateway + ?Sized> PredictionBridge<G> {
    pub fn new(features: FeatureBuilder, gateway: Arc<G>) -> Self {
        Self { features, gateway }
    }

    /// Build the feature vector for `point` and forward it.
    ///
    /// # Errors
    /// Returns the feature source error if assembly fails. Forwarding
    /// failures are not errors; they become [`BridgeReply::UpstreamFailure`].
    pub fn predict(&self, point: GeoPoint, dates: ReferenceDates) -> Result<BridgeReply, SourceError> {
        let features = self.features.build(point, dates)?.to_vec();

        match self.gateway.predict(&features) {
            Ok(ai_response) => Ok(BridgeReply::Success {
                features,
                ai_response,
            }),
            Err(e) => {
                tracing::warn!("Forwarding features for {} failed: {}", point, e);
                Ok(BridgeReply::UpstreamFailure {
                    error: FORWARD_FAILURE_MESSAGE.to_string(),
                    details: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::adapters::HttpInferenceGateway;
    use crate::application::feature_builder::fakes::{builder, FakeSources};
    use crate::ports::{GatewayError, HydrologySample};

    struct RecordingGateway {
        sent: Mutex<Vec<Vec<f64>>>,
        reply: serde_json::Value,
    }

    impl InferenceGateway for RecordingGateway {
        fn predict(&self, features: &[f64]) -> Result<serde_json::Value, GatewayError> {
            self.sent.lock().expect("lock").push(features.to_vec());
            Ok(self.reply.clone())
        }
    }

    fn dates() -> ReferenceDates {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).expect("date");
        ReferenceDates::resolve(None, today).expect("resolve")
    }

    #[test]
    fn test_success_returns_features_and_reply_verbatim() {
        let (_, features) = builder(FakeSources::typical());
        let gateway = Arc::new(RecordingGateway {
            sent: Mutex::new(Vec::new()),
            reply: json!({"prediction": 1, "risk_score": 0.83}),
        });
        let bridge = PredictionBridge::new(features, Arc::clone(&gateway));

        let reply = bridge.predict(GeoPoint::new(-6.2, 106.8), dates()).expect("predict");
        let body = serde_json::to_value(&reply).expect("json");

        assert_eq!(body["ai_response"], json!({"prediction": 1, "risk_score": 0.83}));
        assert_eq!(body["features"].as_array().map(Vec::len), Some(11));
        assert_eq!(gateway.sent.lock().expect("lock").len(), 1);
    }

    #[test]
    fn test_undefined_twi_is_sent_as_token() {
        let (_, features) = builder(FakeSources {
            hydrology: HydrologySample {
                upstream_area_m2: Some(0.0),
                slope_deg: Some(0.0),
            },
            ..FakeSources::typical()
        });
        let gateway = Arc::new(RecordingGateway {
            sent: Mutex::new(Vec::new()),
            reply: json!({"prediction": -1, "risk_score": 0}),
        });
        let bridge = PredictionBridge::new(features, gateway);

        let reply = bridge.predict(GeoPoint::new(0.0, 0.0), dates()).expect("predict");
        let body = serde_json::to_value(&reply).expect("json");
        assert_eq!(body["features"][10], "-Infinity");
    }

    #[test]
    fn test_unreachable_service_is_structured_failure() {
        let (_, features) = builder(FakeSources::typical());
        let gateway = HttpInferenceGateway::new("http://127.0.0.1:1/predict").expect("client");
        let bridge = PredictionBridge::new(features, Arc::new(gateway));

        let reply = bridge.predict(GeoPoint::new(-6.2, 106.8), dates()).expect("predict");
        match reply {
            BridgeReply::UpstreamFailure { error, details } => {
                assert_eq!(error, "AI service call failed");
                assert!(!details.is_empty());
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_feature_failure_is_an_error() {
        let (_, features) = builder(FakeSources {
            fail_on: Some("jrc_perm_water"),
            ..FakeSources::typical()
        });
        let gateway = Arc::new(RecordingGateway {
            sent: Mutex::new(Vec::new()),
            reply: json!({}),
        });
        let bridge = PredictionBridge::new(features, Arc::clone(&gateway));

        assert!(bridge.predict(GeoPoint::new(0.0, 0.0), dates()).is_err());
        assert!(gateway.sent.lock().expect("lock").is_empty());
    }
}
