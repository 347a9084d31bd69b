use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use crate::ensemble::{sigmoid, TreeEnsemble};
use crate::error::{Error, Result};
use crate::feature::{FeatureVector, ScaledVector, FEATURE_COUNT};
use crate::scaler::{check_feature_names, StandardScaler};

/// Probability at or above which a compound is called active. Not configurable.
pub const ACTIVE_THRESHOLD: f64 = 0.5;

/// Decimal places kept in reported probabilities
pub const PROBABILITY_DECIMALS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLabel {
    Active,
    Inactive,
}

impl ActivityLabel {
    #[inline]
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability >= ACTIVE_THRESHOLD {
            ActivityLabel::Active
        } else {
            ActivityLabel::Inactive
        }
    }
}

impl fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityLabel::Active => write!(f, "Active"),
            ActivityLabel::Inactive => write!(f, "Inactive"),
        }
    }
}

/// Outcome of one classifier on one compound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub model: String,
    pub prediction: ActivityLabel,
    pub probability: f64,
}

impl PredictionResult {
    /// Round the probability for display and derive the label from the
    /// rounded value, so the reported pair always agrees with the threshold.
    pub fn new(model: &str, probability: f64) -> Self {
        let probability = round_to(probability, PROBABILITY_DECIMALS);
        Self {
            model: model.to_string(),
            prediction: ActivityLabel::from_probability(probability),
            probability,
        }
    }
}

pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Uniform view over differently shaped trained classifiers.
///
/// Implementations are immutable after load and may be called from any
/// number of threads at once.
pub trait Classifier: Send + Sync {
    /// Display name reported in [`PredictionResult::model`]
    fn name(&self) -> &'static str;

    /// Probability of the active class, in `[0, 1]`
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64>;

    /// Label of the reported (rounded) probability, so it always agrees with [`Classifier::predict`]
    fn predict_label(&self, features: &FeatureVector) -> Result<ActivityLabel> {
        self.predict(features).map(|result| result.prediction)
    }

    fn predict(&self, features: &FeatureVector) -> Result<PredictionResult> {
        let probability = self.predict_probability(features)?;
        Ok(PredictionResult::new(self.name(), probability))
    }
}

/// Fitted logistic regression over standardized descriptors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            feature_names: None,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(format!(
                "expected {} coefficients, got {}",
                FEATURE_COUNT,
                self.coefficients.len()
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err("coefficients must be finite".to_string());
        }
        check_feature_names(self.feature_names.as_deref())
    }

    /// Log-odds for a scaled row. Raw rows are rejected by the type.
    pub fn margin(&self, x: &ScaledVector) -> Result<f64> {
        let x = x.as_slice();
        if self.coefficients.len() != x.len() {
            return Err(Error::Inference(format!(
                "model has {} coefficients, input has {} features",
                self.coefficients.len(),
                x.len()
            )));
        }
        let margin = self.intercept
            + self
                .coefficients
                .iter()
                .zip(x)
                .map(|(w, v)| w * v)
                .sum::<f64>();
        if !margin.is_finite() {
            return Err(Error::Inference("model produced a non-finite margin".to_string()));
        }
        Ok(margin)
    }
}

/// Linear path: the scaler it was trained with, then the logistic model
#[derive(Debug, Clone)]
pub struct LogisticAdapter {
    scaler: StandardScaler,
    model: LogisticRegression,
}

impl LogisticAdapter {
    pub const NAME: &'static str = "Logistic Regression";

    /// Pair a model with the scaler fitted alongside it
    pub fn new(scaler: StandardScaler, model: LogisticRegression) -> Self {
        Self { scaler, model }
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}

impl Classifier for LogisticAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
        let scaled = self.scaler.apply(features)?;
        self.model.margin(&scaled).map(sigmoid)
    }
}

/// Tree path: raw descriptors straight into the ensemble, never scaled
#[derive(Debug, Clone)]
pub struct XgboostAdapter {
    ensemble: Arc<TreeEnsemble>,
}

impl XgboostAdapter {
    pub const NAME: &'static str = "XGBoost";

    pub fn new(ensemble: Arc<TreeEnsemble>) -> Self {
        Self { ensemble }
    }

    pub fn ensemble(&self) -> &Arc<TreeEnsemble> {
        &self.ensemble
    }
}

impl Classifier for XgboostAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
        self.ensemble.predict_probability(features.as_slice())
    }
}
