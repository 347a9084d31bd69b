//! Model artifacts loaded once at startup
//!
//! A model directory holds:
//!
//! - `scaler.json` - [`StandardScaler`] fitted alongside the logistic model
//! - `logistic_regression.json` - [`LogisticRegression`]
//! - `xgboost.json` - [`TreeEnsemble`]
//! - `metrics.json` (optional) - list of [`ModelMetrics`] recorded at training time
//!
//! Any failure loading the first three is fatal; the server must not take
//! prediction traffic with a partial model set.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use crate::classifier::{LogisticAdapter, LogisticRegression, XgboostAdapter};
use crate::ensemble::TreeEnsemble;
use crate::error::{Error, Result};
use crate::explain::TreeExplainer;
use crate::scaler::StandardScaler;

pub const SCALER_FILE: &str = "scaler.json";
pub const LOGISTIC_FILE: &str = "logistic_regression.json";
pub const XGBOOST_FILE: &str = "xgboost.json";
pub const METRICS_FILE: &str = "metrics.json";

/// Held-out evaluation scores of one trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    pub name: String,
    pub accuracy: f64,
    pub roc_auc: f64,
    pub f1_score: f64,
    pub precision: f64,
    pub recall: f64,
}

/// Immutable set of loaded models shared by every request
#[derive(Debug, Clone)]
pub struct ModelContext {
    logistic: LogisticAdapter,
    xgboost: XgboostAdapter,
    explainer: TreeExplainer,
    metrics: Vec<ModelMetrics>,
}

impl ModelContext {
    /// Assemble a context from in-memory parts; a malformed ensemble is rejected
    pub fn new(
        scaler: StandardScaler,
        logistic: LogisticRegression,
        ensemble: TreeEnsemble,
        metrics: Vec<ModelMetrics>,
    ) -> Result<Self> {
        let ensemble = Arc::new(ensemble);
        let explainer = TreeExplainer::new(ensemble.clone())?;
        Ok(Self {
            logistic: LogisticAdapter::new(scaler, logistic),
            xgboost: XgboostAdapter::new(ensemble),
            explainer,
            metrics,
        })
    }

    pub fn load<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let dir = model_dir.as_ref();
        info!("Loading model artifacts from {:?}", dir);

        let scaler_path = dir.join(SCALER_FILE);
        let scaler: StandardScaler = read_artifact(&scaler_path)?;
        scaler.validate().map_err(|e| Error::artifact(&scaler_path, e))?;

        let logistic_path = dir.join(LOGISTIC_FILE);
        let logistic: LogisticRegression = read_artifact(&logistic_path)?;
        logistic.validate().map_err(|e| Error::artifact(&logistic_path, e))?;

        let xgboost_path = dir.join(XGBOOST_FILE);
        let ensemble: TreeEnsemble = read_artifact(&xgboost_path)?;
        ensemble.validate().map_err(|e| Error::artifact(&xgboost_path, e))?;
        info!(
            "Loaded tree ensemble: {} trees, base score {}",
            ensemble.trees.len(),
            ensemble.base_score
        );

        let metrics_path = dir.join(METRICS_FILE);
        let metrics = if metrics_path.exists() {
            read_artifact(&metrics_path)?
        } else {
            warn!("No {} in {:?}; model metrics will be empty", METRICS_FILE, dir);
            Vec::new()
        };

        Self::new(scaler, logistic, ensemble, metrics)
    }

    pub fn logistic(&self) -> &LogisticAdapter {
        &self.logistic
    }

    pub fn xgboost(&self) -> &XgboostAdapter {
        &self.xgboost
    }

    pub fn explainer(&self) -> &TreeExplainer {
        &self.explainer
    }

    pub fn metrics(&self) -> &[ModelMetrics] {
        &self.metrics
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::artifact(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::artifact(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::ensemble::tests::sample_ensemble;
    use crate::ensemble::Tree;
    use crate::feature::{FeatureVector, FEATURE_COUNT};
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, value: &serde_json::Value) {
        std::fs::write(dir.join(name), serde_json::to_vec(value).unwrap()).unwrap();
    }

    fn write_models(dir: &Path) {
        write(
            dir,
            SCALER_FILE,
            &json!({"mean": [380.0, 3.2, 80.0, 1.8, 5.5, 5.0], "scale": [110.0, 1.4, 35.0, 1.3, 2.2, 2.9]}),
        );
        write(
            dir,
            LOGISTIC_FILE,
            &json!({"coefficients": [-0.9, 0.4, -0.3, -0.2, 0.1, -0.5], "intercept": 0.2}),
        );
        write(dir, XGBOOST_FILE, &serde_json::to_value(sample_ensemble()).unwrap());
    }

    #[test]
    fn test_load_complete_directory() {
        let dir = TempDir::new().unwrap();
        write_models(dir.path());
        write(
            dir.path(),
            METRICS_FILE,
            &json!([{"name": "XGBoost", "accuracy": 0.928, "rocAuc": 0.967, "f1Score": 0.921, "precision": 0.932, "recall": 0.91}]),
        );

        let context = ModelContext::load(dir.path()).unwrap();
        assert_eq!(context.metrics().len(), 1);
        assert_eq!(context.metrics()[0].roc_auc, 0.967);

        let x = FeatureVector::from_values([320.0, 3.1, 75.0, 2.0, 5.0, 4.0]).unwrap();
        assert!(context.logistic().predict(&x).is_ok());
        assert!(context.xgboost().predict(&x).is_ok());
        assert_eq!(context.explainer().explain(&x).unwrap().entries.len(), 6);
    }

    #[test]
    fn test_new_rejects_malformed_ensemble() {
        let broken = TreeEnsemble::new(FEATURE_COUNT, 0.5, vec![Tree::new(vec![])]);
        let context = ModelContext::new(
            StandardScaler::new(vec![0.0; 6], vec![1.0; 6]),
            LogisticRegression::new(vec![0.1; 6], 0.0),
            broken,
            Vec::new(),
        );
        assert!(matches!(context, Err(Error::Explainability(_))));
    }

    #[test]
    fn test_metrics_are_optional() {
        let dir = TempDir::new().unwrap();
        write_models(dir.path());
        let context = ModelContext::load(dir.path()).unwrap();
        assert!(context.metrics().is_empty());
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_models(dir.path());
        std::fs::remove_file(dir.path().join(XGBOOST_FILE)).unwrap();
        match ModelContext::load(dir.path()) {
            Err(Error::ArtifactLoad { path, .. }) => assert!(path.ends_with(XGBOOST_FILE)),
            other => panic!("expected ArtifactLoad, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_malformed_artifact_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_models(dir.path());
        std::fs::write(dir.path().join(SCALER_FILE), b"not json").unwrap();
        assert!(matches!(ModelContext::load(dir.path()), Err(Error::ArtifactLoad { .. })));

        write_models(dir.path());
        write(dir.path(), LOGISTIC_FILE, &json!({"coefficients": [1.0, 2.0], "intercept": 0.0}));
        assert!(matches!(ModelContext::load(dir.path()), Err(Error::ArtifactLoad { .. })));
    }

    #[test]
    fn test_reordered_columns_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_models(dir.path());
        write(
            dir.path(),
            SCALER_FILE,
            &json!({
                "mean": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
                "scale": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
                "feature_names": ["alogp", "mw_freebase", "psa", "hbd", "hba", "rtb"]
            }),
        );
        assert!(matches!(ModelContext::load(dir.path()), Err(Error::ArtifactLoad { .. })));
    }
}
