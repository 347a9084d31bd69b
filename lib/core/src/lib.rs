//! # BioInsight Core
//!
//! Core library for the BioInsight bioactivity service.
//!
//! This crate provides the prediction and search pipeline:
//!
//! - [`FeatureVector`] - the six descriptors in fixed model order
//! - [`StandardScaler`] - z-score transform applied before the linear model only
//! - [`Classifier`] - uniform adapter over [`LogisticAdapter`] and [`XgboostAdapter`]
//! - [`TreeExplainer`] - TreeSHAP attributions for the tree ensemble
//! - [`NlqTranslator`] - fixed phrase rules mapped to filter bounds
//! - [`SearchFilter`] - explicit bounds, phrase merge and [`CompiledPredicate`]
//!
//! ## Example
//!
//! ```rust
//! use bioinsight_core::{NlqTranslator, SearchFilter};
//!
//! let explicit = SearchFilter {
//!     molwt_min: Some(200.0),
//!     ..Default::default()
//! };
//! let assignments = NlqTranslator::new().translate("active compounds");
//! let predicate = explicit.merge(&assignments).compile();
//! assert_eq!(predicate.to_string(), "mw_freebase >= 200 AND is_active = 1");
//! ```

pub mod error;
pub mod feature;
pub mod scaler;
pub mod classifier;
pub mod ensemble;
pub mod explain;
pub mod nlq;
pub mod filter;
pub mod record;
pub mod artifacts;
pub mod service;

pub use error::{Error, Result};
pub use feature::{FeatureVector, ScaledVector, FEATURE_COUNT, FEATURE_NAMES};
pub use scaler::StandardScaler;
pub use classifier::{
    ActivityLabel, Classifier, LogisticAdapter, LogisticRegression, PredictionResult,
    XgboostAdapter, ACTIVE_THRESHOLD,
};
pub use ensemble::{Node, Tree, TreeEnsemble};
pub use explain::{AttributionEntry, Explanation, TreeExplainer};
pub use nlq::{ActivityConflict, FilterAssignments, NlqTranslator};
pub use filter::{Clause, Column, Comparison, CompiledPredicate, Filter, SearchFilter};
pub use record::{BioactivityRecord, RecordStore};
pub use artifacts::{ModelContext, ModelMetrics};
pub use service::{ModelKind, PredictionService, SearchService, BROWSE_RESULT_CAP, SEARCH_RESULT_CAP};
