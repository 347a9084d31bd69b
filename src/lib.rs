//! # BioInsight
//!
//! Molecular bioactivity predictions with per-feature explanations, plus
//! range and phrase-driven search over a bioactivity table.
//!
//! Given six descriptors of a compound (`mw_freebase`, `alogp`, `psa`,
//! `hbd`, `hba`, `rtb`, always in that order) BioInsight returns an
//! Active/Inactive call from a logistic regression or a gradient-boosted
//! tree ensemble, and TreeSHAP attributions for the ensemble.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! bioinsight --model-dir ./models --data-file ./data/bioactivity.json --http-port 8000
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use bioinsight::prelude::*;
//! use std::sync::Arc;
//!
//! let models = Arc::new(ModelContext::load("./models").unwrap());
//! let service = PredictionService::new(models);
//!
//! let compound = serde_json::json!({
//!     "mw_freebase": 320.0, "alogp": 3.1, "psa": 75.0, "hbd": 2, "hba": 5, "rtb": 4
//! });
//! let result = service.predict_best(&compound).unwrap();
//! let explanation = service.explain(&compound).unwrap();
//! ```
//!
//! ## Crate Structure
//!
//! - `bioinsight-core` - features, scaling, classifiers, TreeSHAP, phrase translation, filters
//! - `bioinsight-storage` - in-memory bioactivity table with snapshots
//! - `bioinsight-api` - actix-web REST endpoints

// Re-export core types
pub use bioinsight_core::{
    ActivityLabel, AttributionEntry, BioactivityRecord, Classifier, CompiledPredicate,
    Explanation, FeatureVector, Filter, FilterAssignments, ModelContext, ModelKind,
    NlqTranslator, PredictionResult, PredictionService, RecordStore, SearchFilter,
    SearchService, TreeExplainer, Error, Result, FEATURE_NAMES,
};

// Re-export storage
pub use bioinsight_storage::StorageManager;

// Re-export API
pub use bioinsight_api::{AppState, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ActivityLabel, AttributionEntry, BioactivityRecord, Classifier, CompiledPredicate,
        Explanation, FeatureVector, Filter, FilterAssignments, ModelContext, ModelKind,
        NlqTranslator, PredictionResult, PredictionService, RecordStore, SearchFilter,
        SearchService, TreeExplainer, Error, Result, FEATURE_NAMES,
        StorageManager,
        AppState, RestApi,
    };
}
