use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::feature::{FeatureVector, ScaledVector, FEATURE_COUNT, FEATURE_NAMES};

/// Per-feature z-score transform fitted offline.
///
/// Must be the scaler that was fitted together with the logistic model it
/// feeds. Nothing at runtime can detect a mismatched pair; the probabilities
/// are just wrong.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    /// Column order the scaler was fitted on, when the exporter recorded it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            mean,
            scale,
            feature_names: None,
        }
    }

    /// Check the fitted parameters against the feature contract
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(format!(
                "expected {} means and scales, got {} and {}",
                FEATURE_COUNT,
                self.mean.len(),
                self.scale.len()
            ));
        }
        if self.mean.iter().chain(self.scale.iter()).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".to_string());
        }
        check_feature_names(self.feature_names.as_deref())
    }

    /// Apply `(x - mean) / scale` to every feature
    pub fn apply(&self, features: &FeatureVector) -> Result<ScaledVector> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(Error::Inference(format!(
                "scaler expects {} features, vector has {}",
                self.mean.len(),
                FEATURE_COUNT
            )));
        }

        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, x) in features.as_slice().iter().enumerate() {
            // constant columns get scale 0 at fit time and are left unscaled
            let scale = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
            scaled[i] = (x - self.mean[i]) / scale;
        }
        Ok(ScaledVector::new(scaled))
    }
}

/// Recorded training column order must equal [`FEATURE_NAMES`]
pub(crate) fn check_feature_names(names: Option<&[String]>) -> std::result::Result<(), String> {
    match names {
        Some(names) if names.iter().map(String::as_str).ne(FEATURE_NAMES.iter().copied()) => {
            Err(format!(
                "artifact was trained on columns {:?}, expected {:?}",
                names, FEATURE_NAMES
            ))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_standardizes() {
        let scaler = StandardScaler::new(
            vec![300.0, 3.0, 70.0, 2.0, 5.0, 4.0],
            vec![100.0, 1.0, 10.0, 1.0, 2.0, 0.0],
        );
        let features = FeatureVector::from_values([320.0, 3.1, 75.0, 2.0, 5.0, 6.0]).unwrap();
        let scaled = scaler.apply(&features).unwrap();
        let expected = [0.2, 0.1, 0.5, 0.0, 0.0, 2.0];
        for (got, want) in scaled.as_slice().iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-9, "got {}, want {}", got, want);
        }
    }

    #[test]
    fn test_validate_arity() {
        let scaler = StandardScaler::new(vec![0.0; 5], vec![1.0; 5]);
        assert!(scaler.validate().is_err());
        let features = FeatureVector::from_values([1.0; FEATURE_COUNT]).unwrap();
        assert!(matches!(scaler.apply(&features), Err(Error::Inference(_))));
    }

    #[test]
    fn test_validate_feature_names() {
        let mut scaler = StandardScaler::new(vec![0.0; 6], vec![1.0; 6]);
        scaler.feature_names = Some(FEATURE_NAMES.iter().map(|s| s.to_string()).collect());
        assert!(scaler.validate().is_ok());

        let mut swapped: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        swapped.swap(0, 1);
        scaler.feature_names = Some(swapped);
        assert!(scaler.validate().is_err());
    }
}
