//! Additive feature attribution for the tree ensemble
//!
//! Implements path-dependent TreeSHAP (Lundberg et al., "Consistent
//! Individualized Feature Attribution for Tree Ensembles", Algorithm 2).
//! The background distribution is the training cover stored on every node,
//! so no reference dataset is needed at serving time.
//!
//! For any input `x` the attributions satisfy
//! `base_value + sum(phi) == ensemble.margin(x)`.

use ordered_float::OrderedFloat;
use serde::Serialize;
use smallvec::SmallVec;
use std::sync::Arc;
use crate::classifier::round_to;
use crate::ensemble::{Node, Tree, TreeEnsemble};
use crate::error::{Error, Result};
use crate::feature::{FeatureVector, FEATURE_NAMES};

/// Decimal places kept in reported impacts
pub const IMPACT_DECIMALS: u32 = 4;

/// Signed contribution of one descriptor to the model's log-odds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionEntry {
    pub feature: &'static str,
    pub impact: f64,
}

/// Attributions for one compound, in feature order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    /// Expected model margin before any feature is known
    pub base_value: f64,
    #[serde(rename = "explanation")]
    pub entries: Vec<AttributionEntry>,
}

impl Explanation {
    /// Entries by descending absolute impact
    pub fn ranked(&self) -> Vec<&AttributionEntry> {
        let mut ranked: Vec<&AttributionEntry> = self.entries.iter().collect();
        ranked.sort_by_key(|e| std::cmp::Reverse(OrderedFloat(e.impact.abs())));
        ranked
    }
}

/// One step of the decision path: which feature split, and what fraction of
/// the paths flow through when the feature is unknown (`zero`) or known (`one`)
#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

type Path = SmallVec<[PathElement; 16]>;

/// SHAP explainer bound to a loaded tree ensemble
#[derive(Debug, Clone)]
pub struct TreeExplainer {
    ensemble: Arc<TreeEnsemble>,
    base_value: f64,
}

impl TreeExplainer {
    /// Binds to `ensemble`, rejecting any tree the attribution walk could not traverse.
    /// An ensemble with no trees is accepted and reports "not loaded" on use.
    pub fn new(ensemble: Arc<TreeEnsemble>) -> Result<Self> {
        let base_value = if ensemble.trees.is_empty() {
            0.0
        } else {
            ensemble.validate().map_err(Error::Explainability)?;
            ensemble
                .expected_margin()
                .map_err(|e| Error::Explainability(e.to_string()))?
        };
        Ok(Self { ensemble, base_value })
    }

    #[inline]
    #[must_use]
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    /// Raw per-feature attributions for one unscaled row
    pub fn shap_values(&self, x: &[f64]) -> Result<Vec<f64>> {
        if self.ensemble.trees.is_empty() {
            return Err(Error::Explainability(
                "tree ensemble is not loaded".to_string(),
            ));
        }
        if x.len() != self.ensemble.num_features {
            return Err(Error::Explainability(format!(
                "model was trained on {} features, input has {}",
                self.ensemble.num_features,
                x.len()
            )));
        }

        let mut phi = vec![0.0; x.len()];
        for tree in &self.ensemble.trees {
            let root = PathElement {
                feature: None,
                zero_fraction: 1.0,
                one_fraction: 1.0,
                pweight: 0.0,
            };
            recurse(tree, 0, x, &mut phi, &Path::new(), 0, root)?;
        }
        Ok(phi)
    }

    /// Rounded attributions labelled with feature names
    pub fn explain(&self, features: &FeatureVector) -> Result<Explanation> {
        let phi = self.shap_values(features.as_slice())?;
        let entries = FEATURE_NAMES
            .iter()
            .zip(phi)
            .map(|(name, impact)| AttributionEntry {
                feature: *name,
                impact: round_to(impact, IMPACT_DECIMALS),
            })
            .collect();
        Ok(Explanation {
            base_value: round_to(self.base_value, IMPACT_DECIMALS),
            entries,
        })
    }
}

fn recurse(
    tree: &Tree,
    index: usize,
    x: &[f64],
    phi: &mut [f64],
    parent_path: &Path,
    mut depth: usize,
    incoming: PathElement,
) -> Result<()> {
    let mut path: Path = parent_path[..depth].iter().copied().collect();
    path.push(incoming);
    extend_path(&mut path, depth);

    match tree.nodes.get(index) {
        Some(Node::Leaf { value, .. }) => {
            for i in 1..=depth {
                let weight = unwound_path_sum(&path, depth, i);
                let element = path[i];
                if let Some(feature) = element.feature {
                    phi[feature] +=
                        weight * (element.one_fraction - element.zero_fraction) * value;
                }
            }
            Ok(())
        }
        Some(Node::Split { feature, threshold, left, right, cover }) => {
            let value = x.get(*feature).ok_or_else(|| {
                Error::Explainability(format!("tree splits on unknown feature {}", feature))
            })?;
            let (hot, cold) = if *value < *threshold {
                (*left, *right)
            } else {
                (*right, *left)
            };
            let child_cover = |child: usize| {
                tree.nodes.get(child).map(Node::cover).ok_or_else(|| {
                    Error::Explainability(format!("tree has no node {}", child))
                })
            };
            let hot_zero = child_cover(hot)? / cover;
            let cold_zero = child_cover(cold)? / cover;

            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;

            // a feature split on twice along one path is only counted once
            if let Some(k) = (1..=depth).find(|&k| path[k].feature == Some(*feature)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, depth, k);
                depth -= 1;
                path.truncate(depth + 1);
            }

            recurse(
                tree,
                hot,
                x,
                phi,
                &path,
                depth + 1,
                PathElement {
                    feature: Some(*feature),
                    zero_fraction: hot_zero * incoming_zero,
                    one_fraction: incoming_one,
                    pweight: 0.0,
                },
            )?;
            recurse(
                tree,
                cold,
                x,
                phi,
                &path,
                depth + 1,
                PathElement {
                    feature: Some(*feature),
                    zero_fraction: cold_zero * incoming_zero,
                    one_fraction: 0.0,
                    pweight: 0.0,
                },
            )
        }
        None => Err(Error::Explainability(format!("tree has no node {}", index))),
    }
}

/// Append the element at `depth` and update the permutation weights
fn extend_path(path: &mut Path, depth: usize) {
    let zero = path[depth].zero_fraction;
    let one = path[depth].one_fraction;
    path[depth].pweight = if depth == 0 { 1.0 } else { 0.0 };

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero * path[i].pweight * (depth - i) as f64 / denom;
    }
}

/// Remove element `index` from the path, undoing its effect on the weights
fn unwind_path(path: &mut Path, depth: usize, index: usize) {
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one);
            next_one_portion = tmp - path[i].pweight * zero * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
}

/// Total permutation weight the path would have without element `index`
fn unwound_path_sum(path: &Path, depth: usize, index: usize) -> f64 {
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero * (depth - i) as f64 / denom;
        } else if zero != 0.0 {
            total += path[i].pweight / zero / ((depth - i) as f64 / denom);
        }
    }
    total
}
