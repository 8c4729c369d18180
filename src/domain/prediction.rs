//! Replies produced by the inference service.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Error text returned when a non-TWI feature is NaN or infinite.
pub const NON_FINITE_INPUT_MESSAGE: &str = "Input contains NaN or infinite values (non-TWI)";

/// Prediction reported when the wetness index is undefined at the location.
pub const UNDEFINED_TWI_PREDICTION: i64 = -1;

/// Outcome of one `/predict` call on the inference service.
///
/// Every variant is answered with HTTP 200; the body shape tells them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceReply {
    /// The pipeline ran. `risk_score` is the positive-class probability when
    /// the pipeline can produce one.
    Prediction {
        prediction: i64,
        risk_score: Option<f64>,
    },
    /// TWI was NaN or infinite; the pipeline was not invoked.
    UndefinedTwi,
    /// Wrong number of features; the pipeline was not invoked.
    ShapeMismatch {
        expected: usize,
        got: usize,
        expected_order: Vec<String>,
    },
    /// A non-TWI feature was NaN or infinite; the pipeline was not invoked.
    NonFiniteInput,
}

impl InferenceReply {
    fn field_count(&self) -> usize {
        match self {
            Self::NonFiniteInput => 1,
            _ => 2,
        }
    }
}

impl Serialize for InferenceReply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.field_count()))?;
        match self {
            Self::Prediction {
                prediction,
                risk_score,
            } => {
                map.serialize_entry("prediction", prediction)?;
                map.serialize_entry("risk_score", risk_score)?;
            }
            Self::UndefinedTwi => {
                map.serialize_entry("prediction", &UNDEFINED_TWI_PREDICTION)?;
                map.serialize_entry("risk_score", &0)?;
            }
            Self::ShapeMismatch {
                expected,
                got,
                expected_order,
            } => {
                map.serialize_entry(
                    "error",
                    &format!("Expected {expected} features, got {got}"),
                )?;
                map.serialize_entry("expected_order", expected_order)?;
            }
            Self::NonFiniteInput => {
                map.serialize_entry("error", NON_FINITE_INPUT_MESSAGE)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_undefined_twi_shape_is_exact() {
        let v = serde_json::to_value(InferenceReply::UndefinedTwi).expect("serialize");
        assert_eq!(v, json!({"prediction": -1, "risk_score": 0}));
    }

    #[test]
    fn test_prediction_without_probability_serializes_null() {
        let v = serde_json::to_value(InferenceReply::Prediction {
            prediction: 1,
            risk_score: None,
        })
        .expect("serialize");
        assert_eq!(v, json!({"prediction": 1, "risk_score": null}));
    }

    #[test]
    fn test_shape_mismatch_names_expected_order() {
        let v = serde_json::to_value(InferenceReply::ShapeMismatch {
            expected: 2,
            got: 3,
            expected_order: vec!["a".into(), "TWI".into()],
        })
        .expect("serialize");
        assert_eq!(
            v,
            json!({"error": "Expected 2 features, got 3", "expected_order": ["a", "TWI"]})
        );
    }

    #[test]
    fn test_non_finite_input_message() {
        let v = serde_json::to_value(InferenceReply::NonFiniteInput).expect("serialize");
        assert_eq!(v, json!({"error": NON_FINITE_INPUT_MESSAGE}));
    }

    #[test]
    fn test_field_count_matches_serialized_entries() {
        let replies = [
            InferenceReply::Prediction {
                prediction: 0,
                risk_score: Some(0.2),
            },
            InferenceReply::UndefinedTwi,
            InferenceReply::ShapeMismatch {
                expected: 11,
                got: 3,
                expected_order: Vec::new(),
            },
            InferenceReply::NonFiniteInput,
        ];
        for reply in replies {
            let v = serde_json::to_value(&reply).expect("serialize");
            assert_eq!(v.as_object().map(|m| m.len()), Some(reply.field_count()));
        }
    }
}
