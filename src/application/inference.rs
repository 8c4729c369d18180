//! Inference service: Guards inputs and runs the classification pipeline.
//!
//! Each request goes through four checks, in order:
//! 1. Feature count must match the bundle's `feature_columns`
//! 2. A non-finite TWI short-circuits to the undefined-TWI reply
//! 3. Any other non-finite value is rejected
//! 4. The pipeline predicts a class and, if it can, a risk score
//!
//! The pipeline is invoked only in step 4.

use std::sync::Arc;

use crate::domain::{InferenceReply, TWI_FEATURE};
use crate::ports::{Classifier, FeatureFrame, ModelError};

/// Service wrapping a loaded classifier and its expected feature ordering.
///
/// Read-only after construction; share it behind an `Arc` across requests.
pub struct InferenceService<C: Classifier + ?Sized> {
    classifier: Arc<C>,
    feature_columns: Vec<String>,
    twi_index: usize,
}

impl<C: Classifier + ?Sized> InferenceService<C> {
    /// # Errors
    /// Returns `ModelError::Format` if `feature_columns` has no TWI column.
    pub fn new(classifier: Arc<C>, feature_columns: Vec<String>) -> Result<Self, ModelError> {
        let twi_index = feature_columns
            .iter()
            .position(|c| c == TWI_FEATURE)
            .ok_or_else(|| {
                ModelError::Format(format!("feature_columns must include {TWI_FEATURE}"))
            })?;

        tracing::info!(
            "Inference service ready ({} features, {} at index {})",
            feature_columns.len(),
            TWI_FEATURE,
            twi_index
        );
        Ok(Self {
            classifier,
            feature_columns,
            twi_index,
        })
    }

    #[must_use]
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Validate `features` and, if they pass, run the pipeline.
    ///
    /// # Errors
    /// Returns `ModelError::Evaluation` only when the pipeline itself fails,
    /// which means the loaded bundle is inconsistent.
    pub fn predict(&self, features: &[f64]) -> Result<InferenceReply, ModelError> {
        if features.len() != self.feature_columns.len() {
            tracing::info!(
                "Rejected input: expected {} features, got {}",
                self.feature_columns.len(),
                features.len()
            );
            return Ok(InferenceReply::ShapeMismatch {
                expected: self.feature_columns.len(),
                got: features.len(),
                expected_order: self.feature_columns.clone(),
            });
        }

        if !features[self.twi_index].is_finite() {
            tracing::info!("TWI is {}; returning undefined prediction", features[self.twi_index]);
            return Ok(InferenceReply::UndefinedTwi);
        }

        if features.iter().any(|v| !v.is_finite()) {
            tracing::info!("Rejected input with non-finite non-TWI values");
            return Ok(InferenceReply::NonFiniteInput);
        }

        let frame = FeatureFrame::new(&self.feature_columns, features)?;
        let prediction = self.classifier.predict(&frame)?;
        let risk_score = self.classifier.positive_probability(&frame)?;

        tracing::info!("Prediction {} (risk_score={:?})", prediction, risk_score);
        Ok(InferenceReply::Prediction {
            prediction,
            risk_score,
        })
    }
}
