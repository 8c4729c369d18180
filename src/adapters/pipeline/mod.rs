//! Model pipeline adapter: Evaluates exported classification pipelines.
//!
//! A bundle is the JSON export of a fitted scikit-learn pipeline: a list of
//! transforms followed by one binary estimator, plus the feature ordering the
//! caller must send.
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "feature_columns": ["jrc_perm_water", "...", "TWI"],
//!   "pipeline": {
//!     "steps": [{"kind": "standard_scaler", "mean": [...], "scale": [...]}],
//!     "estimator": {"kind": "logistic_regression", "classes": [0, 1],
//!                   "coef": [...], "intercept": -1.2}
//!   }
//! }
//! ```

mod tree;

pub use tree::{DecisionTree, RandomForest, Tree, TreeNode};

use serde::Deserialize;

use crate::domain::TWI_FEATURE;
use crate::ports::{Classifier, FeatureFrame, ModelError};

pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// Exported pipeline together with its expected feature ordering.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    pub feature_columns: Vec<String>,
    pub pipeline: Pipeline,
}

impl ModelBundle {
    /// Parse and validate a bundle.
    ///
    /// # Errors
    /// Returns `ModelError::Format` if the JSON is malformed or inconsistent.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let bundle: Self = serde_json::from_slice(bytes)
            .map_err(|e| ModelError::Format(format!("Failed to parse bundle: {e}")))?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// # Errors
    /// Returns `ModelError::Format` describing the first inconsistency.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(ModelError::Format(format!(
                "Unsupported format_version {} (expected {SUPPORTED_FORMAT_VERSION})",
                self.format_version
            )));
        }
        if self.feature_columns.is_empty() {
            return Err(ModelError::Format("feature_columns is empty".into()));
        }
        if !self.feature_columns.iter().any(|c| c == TWI_FEATURE) {
            return Err(ModelError::Format(format!(
                "feature_columns must include {TWI_FEATURE}"
            )));
        }
        if let Some(names) = &self.pipeline.feature_names_in {
            if let Some(unknown) = names.iter().find(|n| !self.feature_columns.contains(n)) {
                return Err(ModelError::Format(format!(
                    "Pipeline input {unknown:?} is not among feature_columns"
                )));
            }
        }

        let width = self
            .pipeline
            .feature_names_in
            .as_ref()
            .map_or(self.feature_columns.len(), Vec::len);
        self.pipeline.validate(width)
    }

    /// Split into the feature ordering and the evaluable pipeline.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Pipeline) {
        (self.feature_columns, self.pipeline)
    }
}

/// Fitted preprocessing step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    StandardScaler { mean: Vec<f64>, scale: Vec<f64> },
}

impl Transform {
    fn validate(&self, width: usize) -> Result<(), ModelError> {
        match self {
            Self::StandardScaler { mean, scale } => {
                if mean.len() != width || scale.len() != width {
                    return Err(ModelError::Format(format!(
                        "standard_scaler has {} means and {} scales for {width} inputs",
                        mean.len(),
                        scale.len()
                    )));
                }
                Ok(())
            }
        }
    }

    fn apply(&self, x: &mut [f64]) {
        match self {
            Self::StandardScaler { mean, scale } => {
                for ((v, m), s) in x.iter_mut().zip(mean).zip(scale) {
                    // Constant training columns are exported with scale 0.
                    let s = if *s == 0.0 { 1.0 } else { *s };
                    *v = (*v - m) / s;
                }
            }
        }
    }
}

/// Linear decision function `coef · x + intercept`.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    pub classes: Vec<i64>,
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    fn decision(&self, x: &[f64]) -> f64 {
        self.coef.iter().zip(x).map(|(c, v)| c * v).sum::<f64>() + self.intercept
    }
}

/// Final binary estimator of a pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression(LinearModel),
    LinearSvc(LinearModel),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl Estimator {
    fn classes(&self) -> &[i64] {
        match self {
            Self::LogisticRegression(m) | Self::LinearSvc(m) => &m.classes,
            Self::DecisionTree(t) => &t.classes,
            Self::RandomForest(f) => &f.classes,
        }
    }

    fn validate(&self, width: usize) -> Result<(), ModelError> {
        if self.classes().len() != 2 {
            return Err(ModelError::Format(format!(
                "Estimator must be binary, found {} classes",
                self.classes().len()
            )));
        }
        match self {
            Self::LogisticRegression(m) | Self::LinearSvc(m) => {
                if m.coef.len() != width {
                    return Err(ModelError::Format(format!(
                        "Estimator has {} coefficients for {width} inputs",
                        m.coef.len()
                    )));
                }
                Ok(())
            }
            Self::DecisionTree(t) => t.validate(width),
            Self::RandomForest(f) => f.validate(width),
        }
    }

    /// Class probabilities in `classes` order, if the estimator has them.
    fn proba(&self, x: &[f64]) -> Result<Option<Vec<f64>>, ModelError> {
        match self {
            Self::LogisticRegression(m) => {
                let p = sigmoid(m.decision(x));
                Ok(Some(vec![1.0 - p, p]))
            }
            Self::LinearSvc(_) => Ok(None),
            Self::DecisionTree(t) => t.proba(x).map(Some),
            Self::RandomForest(f) => f.proba(x).map(Some),
        }
    }

    fn predict(&self, x: &[f64]) -> Result<i64, ModelError> {
        let classes = self.classes();
        let positive = match self {
            Self::LogisticRegression(m) | Self::LinearSvc(m) => m.decision(x) > 0.0,
            Self::DecisionTree(_) | Self::RandomForest(_) => {
                // Ties resolve to the first class, like argmax.
                let p = self.proba(x)?.unwrap_or_default();
                p.get(1).copied().unwrap_or(0.0) > p.first().copied().unwrap_or(0.0)
            }
        };
        Ok(classes[usize::from(positive)])
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Transforms followed by an estimator, evaluated on one row at a time.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    /// Column names the pipeline was fitted on, when it was fitted on a frame.
    #[serde(default)]
    pub feature_names_in: Option<Vec<String>>,
    #[serde(default)]
    pub steps: Vec<Transform>,
    pub estimator: Estimator,
}

impl Pipeline {
    /// # Errors
    /// Returns `ModelError::Format` if any step disagrees with `width`.
    pub fn validate(&self, width: usize) -> Result<(), ModelError> {
        for step in &self.steps {
            step.validate(width)?;
        }
        self.estimator.validate(width)
    }

    /// Select the pipeline's input columns from the frame and apply every step.
    fn transform(&self, frame: &FeatureFrame<'_>) -> Result<Vec<f64>, ModelError> {
        let mut x = match &self.feature_names_in {
            Some(names) => names
                .iter()
                .map(|name| {
                    frame.get(name).ok_or_else(|| {
                        ModelError::Evaluation(format!("Frame has no column {name:?}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => frame.values().to_vec(),
        };
        for step in &self.steps {
            step.apply(&mut x);
        }
        Ok(x)
    }
}

impl Classifier for Pipeline {
    fn predict(&self, frame: &FeatureFrame<'_>) -> Result<i64, ModelError> {
        let x = self.transform(frame)?;
        self.estimator.predict(&x)
    }

    fn positive_probability(&self, frame: &FeatureFrame<'_>) -> Result<Option<f64>, ModelError> {
        let x = self.transform(frame)?;
        Ok(self.estimator.proba(&x)?.and_then(|p| p.get(1).copied()))
    }
}
