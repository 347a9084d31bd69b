//! Gradient-boosted tree ensemble evaluated on raw descriptors
//!
//! Trees are stored as flat node arrays exported from the trained booster.
//! A split sends `x[feature] < threshold` to the left child, matching XGBoost.

use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::feature::{FEATURE_COUNT, FEATURE_NAMES};
use crate::scaler::check_feature_names;

/// One node of a regression tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Training weight (hessian sum) that reached this node
        cover: f64,
    },
    Leaf {
        value: f64,
        cover: f64,
    },
}

impl Node {
    #[inline]
    #[must_use]
    pub fn cover(&self) -> f64 {
        match self {
            Node::Split { cover, .. } | Node::Leaf { cover, .. } => *cover,
        }
    }
}

/// A single regression tree; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Leaf value reached by `x`
    pub fn predict(&self, x: &[f64]) -> Result<f64> {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf { value, .. }) => return Ok(*value),
                Some(Node::Split { feature, threshold, left, right, .. }) => {
                    let value = x.get(*feature).ok_or_else(|| {
                        Error::Inference(format!(
                            "tree splits on feature {} but input has {} features",
                            feature,
                            x.len()
                        ))
                    })?;
                    index = if *value < *threshold { *left } else { *right };
                }
                None => {
                    return Err(Error::Inference(format!("tree has no node {}", index)));
                }
            }
        }
    }

    /// Cover-weighted mean leaf value, the tree's output with no features known
    pub fn expected_value(&self) -> Result<f64> {
        self.node_mean(0)
    }

    fn node(&self, index: usize) -> Result<&Node> {
        self.nodes
            .get(index)
            .ok_or_else(|| Error::Inference(format!("tree has no node {}", index)))
    }

    fn node_mean(&self, index: usize) -> Result<f64> {
        match self.node(index)? {
            Node::Leaf { value, .. } => Ok(*value),
            Node::Split { left, right, .. } => {
                if *left <= index || *right <= index {
                    return Err(Error::Inference(format!(
                        "node {} points back to an earlier node",
                        index
                    )));
                }
                let left_cover = self.node(*left)?.cover();
                let right_cover = self.node(*right)?.cover();
                Ok((left_cover * self.node_mean(*left)?
                    + right_cover * self.node_mean(*right)?)
                    / (left_cover + right_cover))
            }
        }
    }

    fn validate(&self, num_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            let cover = node.cover();
            if !(cover.is_finite() && cover > 0.0) {
                return Err(format!("node {} has invalid cover {}", index, cover));
            }
            match node {
                Node::Leaf { value, .. } if !value.is_finite() => {
                    return Err(format!("leaf {} has non-finite value", index));
                }
                Node::Split { feature, threshold, left, right, .. } => {
                    if *feature >= num_features {
                        return Err(format!(
                            "node {} splits on feature {} of {}",
                            index, feature, num_features
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has NaN threshold", index));
                    }
                    // children always follow their parent, so the walk terminates
                    for child in [left, right] {
                        if *child <= index || *child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", index, child));
                        }
                    }
                }
                Node::Leaf { .. } => {}
            }
        }
        Ok(())
    }
}

fn default_base_score() -> f64 {
    0.5
}

/// Binary logistic tree ensemble
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeEnsemble {
    pub num_features: usize,
    /// Prior probability the boosting started from
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    pub trees: Vec<Tree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl TreeEnsemble {
    pub fn new(num_features: usize, base_score: f64, trees: Vec<Tree>) -> Self {
        Self {
            num_features,
            base_score,
            trees,
            feature_names: None,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.num_features != FEATURE_COUNT {
            return Err(format!(
                "model trained on {} features, expected {} ({})",
                self.num_features,
                FEATURE_COUNT,
                FEATURE_NAMES.join(", ")
            ));
        }
        if !(self.base_score > 0.0 && self.base_score < 1.0) {
            return Err(format!("base_score {} outside (0, 1)", self.base_score));
        }
        if self.trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.num_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        check_feature_names(self.feature_names.as_deref())
    }

    /// Log-odds the boosting started from
    #[inline]
    #[must_use]
    pub fn base_margin(&self) -> f64 {
        (self.base_score / (1.0 - self.base_score)).ln()
    }

    /// Raw log-odds output for an unscaled descriptor row
    pub fn margin(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.num_features {
            return Err(Error::Inference(format!(
                "model expects {} features, got {}",
                self.num_features,
                x.len()
            )));
        }
        let mut margin = self.base_margin();
        for tree in &self.trees {
            margin += tree.predict(x)?;
        }
        if !margin.is_finite() {
            return Err(Error::Inference("model produced a non-finite margin".to_string()));
        }
        Ok(margin)
    }

    pub fn predict_probability(&self, x: &[f64]) -> Result<f64> {
        self.margin(x).map(sigmoid)
    }

    /// Expected margin over the training distribution recorded in node covers
    pub fn expected_margin(&self) -> Result<f64> {
        let mut margin = self.base_margin();
        for tree in &self.trees {
            margin += tree.expected_value()?;
        }
        Ok(margin)
    }
}

#[inline]
pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
