//! Classifier port: Trait for the pre-trained flood classification pipeline.

use std::path::PathBuf;

/// Errors raised while loading or evaluating a model bundle.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model file {0:?} not found and MODEL_URL is not set")]
    Missing(PathBuf),

    #[error("Model download failed: {0}")]
    Download(String),

    #[error("Model checksum mismatch: expected {expected}, got {actual}")]
    Checksum { expected: String, actual: String },

    #[error("Invalid model bundle: {0}")]
    Format(String),

    #[error("Model evaluation failed: {0}")]
    Evaluation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One input row with named columns, in the order the caller supplied.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFrame<'a> {
    columns: &'a [String],
    values: &'a [f64],
}

impl<'a> FeatureFrame<'a> {
    /// Pair column names with values.
    ///
    /// # Errors
    /// Returns `ModelError::Evaluation` if the lengths differ.
    pub fn new(columns: &'a [String], values: &'a [f64]) -> Result<Self, ModelError> {
        if columns.len() != values.len() {
            return Err(ModelError::Evaluation(format!(
                "Frame has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    #[must_use]
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Value of the named column.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i])
    }
}

/// A fitted transformation + classification pipeline.
///
/// Implementations are read-only after construction and shared across
/// concurrent requests.
pub trait Classifier: Send + Sync {
    /// Predicted class label for one row.
    ///
    /// # Errors
    /// Returns `ModelError::Evaluation` if the row cannot be evaluated.
    fn predict(&self, frame: &FeatureFrame<'_>) -> Result<i64, ModelError>;

    /// Probability of the positive class, or `None` when the pipeline has no
    /// probability output.
    ///
    /// # Errors
    /// Returns `ModelError::Evaluation` if the row cannot be evaluated.
    fn positive_probability(&self, frame: &FeatureFrame<'_>) -> Result<Option<f64>, ModelError>;
}
