//! Request orchestration over the shared model context and record store
//!
//! Both services are cheap to clone and hold only `Arc`s to immutable
//! state. Their methods are synchronous and CPU-bound; async callers should
//! run them on a blocking pool.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use crate::artifacts::{ModelContext, ModelMetrics};
use crate::classifier::{Classifier, PredictionResult};
use crate::error::Result;
use crate::explain::Explanation;
use crate::feature::FeatureVector;
use crate::filter::SearchFilter;
use crate::nlq::NlqTranslator;
use crate::record::{BioactivityRecord, RecordStore};

/// Maximum rows returned by a filtered search
pub const SEARCH_RESULT_CAP: usize = 500;

/// Maximum rows returned when browsing the whole table
pub const BROWSE_RESULT_CAP: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Logistic,
    Xgboost,
}

impl ModelKind {
    /// The model `predict_best` routes to. A fixed choice of the more
    /// accurate model, not a per-request comparison.
    pub const BEST: ModelKind = ModelKind::Xgboost;
}

#[derive(Clone)]
pub struct PredictionService {
    models: Arc<ModelContext>,
}

impl PredictionService {
    pub fn new(models: Arc<ModelContext>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &ModelContext {
        &self.models
    }

    fn classifier(&self, kind: ModelKind) -> &dyn Classifier {
        match kind {
            ModelKind::Logistic => self.models.logistic() as &dyn Classifier,
            ModelKind::Xgboost => self.models.xgboost() as &dyn Classifier,
        }
    }

    pub fn predict(&self, kind: ModelKind, input: &Value) -> Result<PredictionResult> {
        let features = FeatureVector::assemble(input)?;
        let result = self.classifier(kind).predict(&features)?;
        debug!(
            "{} -> {} ({})",
            result.model, result.prediction, result.probability
        );
        Ok(result)
    }

    pub fn predict_logistic(&self, input: &Value) -> Result<PredictionResult> {
        self.predict(ModelKind::Logistic, input)
    }

    pub fn predict_xgboost(&self, input: &Value) -> Result<PredictionResult> {
        self.predict(ModelKind::Xgboost, input)
    }

    pub fn predict_best(&self, input: &Value) -> Result<PredictionResult> {
        self.predict(ModelKind::BEST, input)
    }

    pub fn explain(&self, input: &Value) -> Result<Explanation> {
        let features = FeatureVector::assemble(input)?;
        let explanation = self.models.explainer().explain(&features)?;
        if let Some(top) = explanation.ranked().first() {
            debug!("Top contributor: {} ({})", top.feature, top.impact);
        }
        Ok(explanation)
    }

    pub fn metrics(&self) -> &[ModelMetrics] {
        self.models.metrics()
    }
}

#[derive(Clone)]
pub struct SearchService {
    store: Arc<dyn RecordStore>,
    translator: NlqTranslator,
}

impl SearchService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_translator(store, NlqTranslator::new())
    }

    pub fn with_translator(store: Arc<dyn RecordStore>, translator: NlqTranslator) -> Self {
        Self { store, translator }
    }

    /// Merge the phrase into the explicit bounds and query the store
    pub fn search(&self, request: &SearchFilter) -> Result<Vec<BioactivityRecord>> {
        request.validate()?;

        let effective = match request.nlq.as_deref() {
            Some(phrase) if !phrase.trim().is_empty() => {
                let assignments = self.translator.translate(phrase);
                debug!("Phrase {:?} -> {:?}", phrase, assignments);
                request.merge(&assignments)
            }
            _ => request.clone(),
        };

        let predicate = effective.compile();
        debug!("Search predicate: {}", predicate);
        self.store.query(&predicate, SEARCH_RESULT_CAP)
    }

    /// Unfiltered rows for the data explorer
    pub fn browse(&self) -> Result<Vec<BioactivityRecord>> {
        self.store
            .query(&SearchFilter::default().compile(), BROWSE_RESULT_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::tests::sample_ensemble;
    use crate::error::Error;
    use crate::filter::{CompiledPredicate, Filter};
    use crate::classifier::LogisticRegression;
    use crate::scaler::StandardScaler;
    use serde_json::json;
    use std::sync::Mutex;

    fn service() -> PredictionService {
        let context = ModelContext::new(
            StandardScaler::new(
                vec![380.0, 3.2, 80.0, 1.8, 5.5, 5.0],
                vec![110.0, 1.4, 35.0, 1.3, 2.2, 2.9],
            ),
            LogisticRegression::new(vec![-0.9, 0.4, -0.3, -0.2, 0.1, -0.5], 0.2),
            sample_ensemble(),
            Vec::new(),
        )
        .unwrap();
        PredictionService::new(Arc::new(context))
    }

    fn scenario() -> Value {
        json!({"mw_freebase": 320, "alogp": 3.1, "psa": 75, "hbd": 2, "hba": 5, "rtb": 4})
    }

    #[test]
    fn test_model_names() {
        let svc = service();
        assert_eq!(svc.predict_logistic(&scenario()).unwrap().model, "Logistic Regression");
        assert_eq!(svc.predict_xgboost(&scenario()).unwrap().model, "XGBoost");
    }

    #[test]
    fn test_best_is_always_xgboost() {
        let svc = service();
        for mw in [120.0, 320.0, 480.0, 650.0] {
            let input = json!({"mw_freebase": mw, "alogp": 3.1, "psa": 75, "hbd": 2, "hba": 5, "rtb": 4});
            assert_eq!(
                svc.predict_best(&input).unwrap(),
                svc.predict_xgboost(&input).unwrap()
            );
        }
    }

    #[test]
    fn test_explain_scenario() {
        let explanation = service().explain(&scenario()).unwrap();
        let names: Vec<&str> = explanation.entries.iter().map(|e| e.feature).collect();
        assert_eq!(names, vec!["mw_freebase", "alogp", "psa", "hbd", "hba", "rtb"]);
    }

    #[test]
    fn test_invalid_input_never_reaches_models() {
        let svc = service();
        let input = json!({"mw_freebase": 320, "alogp": 3.1});
        assert!(matches!(svc.predict_logistic(&input), Err(Error::Validation(_))));
        assert!(matches!(svc.explain(&input), Err(Error::Validation(_))));
    }

    /// Store that records the predicate and limit it was asked for
    #[derive(Default)]
    struct RecordingStore {
        rows: Vec<BioactivityRecord>,
        calls: Mutex<Vec<(CompiledPredicate, usize)>>,
    }

    impl RecordStore for RecordingStore {
        fn query(&self, predicate: &CompiledPredicate, limit: usize) -> Result<Vec<BioactivityRecord>> {
            self.calls.lock().unwrap().push((predicate.clone(), limit));
            Ok(self
                .rows
                .iter()
                .filter(|r| predicate.matches(r))
                .take(limit)
                .cloned()
                .collect())
        }
    }

    fn row(id: i64, mw: f64, active: i64) -> BioactivityRecord {
        BioactivityRecord {
            activity_id: id,
            compound_id: Some(format!("CHEMBL{}", id)),
            mw_freebase: mw,
            alogp: 2.0,
            psa: 60.0,
            hbd: 1,
            hba: 4,
            rtb: 3,
            is_active: active,
            target_name: Some("Acetylcholinesterase".to_string()),
        }
    }

    #[test]
    fn test_search_merges_phrase() {
        let store = Arc::new(RecordingStore {
            rows: vec![row(1, 250.0, 1), row(2, 250.0, 0), row(3, 450.0, 1)],
            ..Default::default()
        });
        let svc = SearchService::new(store.clone());
        let request = SearchFilter {
            is_active: Some(0),
            nlq: Some("Low molecular weight and active".to_string()),
            ..Default::default()
        };
        let rows = svc.search(&request).unwrap();
        assert_eq!(rows.iter().map(|r| r.activity_id).collect::<Vec<_>>(), vec![1]);

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls[0].1, SEARCH_RESULT_CAP);
        assert_eq!(calls[0].0.to_string(), "mw_freebase <= 300 AND is_active = 1");
    }

    #[test]
    fn test_empty_search_is_universal() {
        let store = Arc::new(RecordingStore {
            rows: vec![row(1, 250.0, 1), row(2, 900.0, 0)],
            ..Default::default()
        });
        let svc = SearchService::new(store.clone());
        let request = SearchFilter {
            nlq: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(svc.search(&request).unwrap().len(), 2);
        assert!(store.calls.lock().unwrap()[0].0.is_universal());
    }

    #[test]
    fn test_browse_uses_browse_cap() {
        let store = Arc::new(RecordingStore::default());
        SearchService::new(store.clone()).browse().unwrap();
        let calls = store.calls.lock().unwrap();
        assert!(calls[0].0.is_universal());
        assert_eq!(calls[0].1, BROWSE_RESULT_CAP);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let svc = SearchService::new(Arc::new(RecordingStore::default()));
        let request = SearchFilter {
            is_active: Some(7),
            ..Default::default()
        };
        assert!(matches!(svc.search(&request), Err(Error::Validation(_))));
    }
}
