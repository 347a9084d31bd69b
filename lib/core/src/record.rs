use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::feature::FeatureVector;
use crate::filter::CompiledPredicate;

/// One row of the bioactivity table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioactivityRecord {
    pub activity_id: i64,
    #[serde(default)]
    pub compound_id: Option<String>,
    pub mw_freebase: f64,
    pub alogp: f64,
    pub psa: f64,
    pub hbd: i64,
    pub hba: i64,
    pub rtb: i64,
    pub is_active: i64,
    #[serde(default)]
    pub target_name: Option<String>,
}

impl BioactivityRecord {
    /// Descriptors of this row in model order
    pub fn features(&self) -> Result<FeatureVector> {
        FeatureVector::from_values([
            self.mw_freebase,
            self.alogp,
            self.psa,
            self.hbd as f64,
            self.hba as f64,
            self.rtb as f64,
        ])
    }
}

/// Tabular store the search endpoints read from.
///
/// The store owns persistence, schema and result ordering; callers only
/// hand it a predicate and a result cap.
pub trait RecordStore: Send + Sync {
    fn query(&self, predicate: &CompiledPredicate, limit: usize) -> Result<Vec<BioactivityRecord>>;
}
