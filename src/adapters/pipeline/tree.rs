//! Tree estimators exported from fitted scikit-learn trees and forests.
//!
//! Node arrays follow the library's flat layout: node 0 is the root, a node
//! is a leaf when `left == -1`, and a sample goes left when
//! `x[feature] <= threshold`. Children always sit after their parent, which
//! makes traversal terminate.

use serde::Deserialize;

use crate::ports::ModelError;

const LEAF: i64 = -1;

#[derive(Debug, Clone, Deserialize)]
pub struct TreeNode {
    pub feature: i64,
    pub threshold: f64,
    pub left: i64,
    pub right: i64,
    /// Per-class training weight reaching this node.
    pub value: Vec<f64>,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.left == LEAF
    }
}

/// Check a node array against the input width and class count.
fn validate_nodes(
    nodes: &[TreeNode],
    n_features: usize,
    n_classes: usize,
) -> Result<(), ModelError> {
    if nodes.is_empty() {
        return Err(ModelError::Format("Tree has no nodes".into()));
    }

    let len = nodes.len() as i64;
    for (i, node) in nodes.iter().enumerate() {
        let idx = i as i64;
        if node.is_leaf() {
            if node.value.len() != n_classes {
                return Err(ModelError::Format(format!(
                    "Leaf {i} has {} class weights, expected {n_classes}",
                    node.value.len()
                )));
            }
            continue;
        }
        if node.feature < 0 || node.feature as usize >= n_features {
            return Err(ModelError::Format(format!(
                "Node {i} splits on feature {} of {n_features}",
                node.feature
            )));
        }
        for child in [node.left, node.right] {
            if child <= idx || child >= len {
                return Err(ModelError::Format(format!(
                    "Node {i} has child {child} outside ({i}, {len})"
                )));
            }
        }
    }
    Ok(())
}

/// Class probabilities at the leaf reached by `x`.
fn leaf_proba(nodes: &[TreeNode], x: &[f64]) -> Result<Vec<f64>, ModelError> {
    let mut idx = 0usize;
    let leaf = loop {
        let node = nodes
            .get(idx)
            .ok_or_else(|| ModelError::Evaluation(format!("Tree node {idx} missing")))?;
        if node.is_leaf() {
            break node;
        }
        let value = x.get(node.feature as usize).copied().ok_or_else(|| {
            ModelError::Evaluation(format!("Feature {} out of range", node.feature))
        })?;
        let next = if value <= node.threshold {
            node.left
        } else {
            node.right
        };
        idx = usize::try_from(next)
            .map_err(|_| ModelError::Evaluation(format!("Node {idx} has child {next}")))?;
    };

    let total: f64 = leaf.value.iter().sum();
    if total <= 0.0 {
        return Err(ModelError::Evaluation("Leaf has no class weight".into()));
    }
    Ok(leaf.value.iter().map(|w| w / total).collect())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// # Errors
    /// Returns `ModelError::Format` naming the first offending node.
    pub fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), ModelError> {
        validate_nodes(&self.nodes, n_features, n_classes)
    }

    /// # Errors
    /// Returns `ModelError::Evaluation` on a malformed node array.
    pub fn proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        leaf_proba(&self.nodes, x)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub classes: Vec<i64>,
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// # Errors
    /// Returns `ModelError::Format` on an invalid node array.
    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        validate_nodes(&self.nodes, n_features, self.classes.len())
    }

    /// # Errors
    /// Returns `ModelError::Evaluation` on a malformed node array.
    pub fn proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        leaf_proba(&self.nodes, x)
    }
}

/// Forest whose probability is the mean of its trees' leaf probabilities.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<i64>,
    pub trees: Vec<Tree>,
}

impl RandomForest {
    /// # Errors
    /// Returns `ModelError::Format` if the forest is empty or any tree is invalid.
    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Format("Forest has no trees".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(n_features, self.classes.len())
                .map_err(|e| ModelError::Format(format!("Tree {i}: {e}")))?;
        }
        Ok(())
    }

    /// # Errors
    /// Returns `ModelError::Evaluation` on a malformed node array.
    pub fn proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        let mut sum = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.proba(x)?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }
}
