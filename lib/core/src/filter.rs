// Search filters: explicit bounds, phrase merge, and compiled predicates
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::{Error, Result};
use crate::nlq::FilterAssignments;
use crate::record::BioactivityRecord;

pub trait Filter {
    fn matches(&self, record: &BioactivityRecord) -> bool;
}

/// Search request: optional numeric bounds plus an optional free-text phrase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(default)]
    pub molwt_min: Option<f64>,
    #[serde(default)]
    pub molwt_max: Option<f64>,
    #[serde(default)]
    pub logp_min: Option<f64>,
    #[serde(default)]
    pub logp_max: Option<f64>,
    #[serde(default)]
    pub psa_max: Option<f64>,
    #[serde(default)]
    pub is_active: Option<u8>,
    #[serde(default, alias = "phrase")]
    pub nlq: Option<String>,
}

impl SearchFilter {
    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("molwt_min", self.molwt_min),
            ("molwt_max", self.molwt_max),
            ("logp_min", self.logp_min),
            ("logp_max", self.logp_max),
            ("psa_max", self.psa_max),
        ];
        for (name, bound) in bounds {
            if matches!(bound, Some(v) if !v.is_finite()) {
                return Err(Error::Validation(format!("'{}' must be finite", name)));
            }
        }
        match self.is_active {
            None | Some(0) | Some(1) => Ok(()),
            Some(other) => Err(Error::Validation(format!(
                "'is_active' must be 0 or 1, got {}",
                other
            ))),
        }
    }

    /// Overlay phrase-derived fields on the explicit filter.
    ///
    /// A field the phrase assigned replaces the explicit value; every other
    /// field keeps its explicit value, absent or not.
    #[must_use]
    pub fn merge(&self, assignments: &FilterAssignments) -> SearchFilter {
        SearchFilter {
            molwt_min: assignments.molwt_min.or(self.molwt_min),
            molwt_max: assignments.molwt_max.or(self.molwt_max),
            logp_min: assignments.logp_min.or(self.logp_min),
            logp_max: assignments.logp_max.or(self.logp_max),
            psa_max: self.psa_max,
            is_active: assignments.is_active.or(self.is_active),
            nlq: self.nlq.clone(),
        }
    }

    /// One clause per present bound, AND-ed together
    #[must_use]
    pub fn compile(&self) -> CompiledPredicate {
        use Column::*;
        use Comparison::*;

        let candidates = [
            (MwFreebase, GreaterEqual, self.molwt_min),
            (MwFreebase, LessEqual, self.molwt_max),
            (Alogp, GreaterEqual, self.logp_min),
            (Alogp, LessEqual, self.logp_max),
            (Psa, LessEqual, self.psa_max),
            (IsActive, Equals, self.is_active.map(f64::from)),
        ];
        let clauses = candidates
            .into_iter()
            .filter_map(|(column, op, bound)| bound.map(|value| Clause { column, op, value }))
            .collect();

        CompiledPredicate { clauses }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    MwFreebase,
    Alogp,
    Psa,
    IsActive,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::MwFreebase => "mw_freebase",
            Column::Alogp => "alogp",
            Column::Psa => "psa",
            Column::IsActive => "is_active",
        }
    }

    fn value(&self, record: &BioactivityRecord) -> f64 {
        match self {
            Column::MwFreebase => record.mw_freebase,
            Column::Alogp => record.alogp,
            Column::Psa => record.psa,
            Column::IsActive => record.is_active as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterEqual,
    LessEqual,
    Equals,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clause {
    pub column: Column,
    pub op: Comparison,
    pub value: f64,
}

impl Clause {
    fn matches(&self, record: &BioactivityRecord) -> bool {
        let actual = self.column.value(record);
        match self.op {
            Comparison::GreaterEqual => actual >= self.value,
            Comparison::LessEqual => actual <= self.value,
            Comparison::Equals => actual == self.value,
        }
    }
}

/// Conjunction of range and equality clauses; no clauses matches every record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledPredicate {
    clauses: Vec<Clause>,
}

impl CompiledPredicate {
    /// The predicate that matches everything
    pub fn universal() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_universal(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

impl Filter for CompiledPredicate {
    fn matches(&self, record: &BioactivityRecord) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }
}

impl fmt::Display for CompiledPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return write!(f, "TRUE");
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            let op = match clause.op {
                Comparison::GreaterEqual => ">=",
                Comparison::LessEqual => "<=",
                Comparison::Equals => "=",
            };
            write!(f, "{} {} {}", clause.column.name(), op, clause.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlq::NlqTranslator;

    fn record(mw: f64, logp: f64, psa: f64, active: i64) -> BioactivityRecord {
        BioactivityRecord {
            activity_id: 1,
            compound_id: Some("CHEMBL1".to_string()),
            mw_freebase: mw,
            alogp: logp,
            psa,
            hbd: 1,
            hba: 3,
            rtb: 2,
            is_active: active,
            target_name: None,
        }
    }

    #[test]
    fn test_translator_overrides_explicit_field() {
        let explicit = SearchFilter {
            is_active: Some(0),
            ..Default::default()
        };
        let merged = explicit.merge(&NlqTranslator::new().translate("active"));
        assert_eq!(merged.is_active, Some(1));
    }

    #[test]
    fn test_untouched_fields_survive_merge() {
        let explicit = SearchFilter {
            molwt_min: Some(200.0),
            nlq: Some("active".to_string()),
            ..Default::default()
        };
        let merged = explicit.merge(&NlqTranslator::new().translate("active"));
        assert_eq!(merged.molwt_min, Some(200.0));
        assert_eq!(merged.is_active, Some(1));
        assert_eq!(merged.molwt_max, None);
        assert_eq!(merged.logp_min, None);
        assert_eq!(merged.logp_max, None);
        assert_eq!(merged.psa_max, None);
    }

    #[test]
    fn test_empty_assignments_leave_filter_unchanged() {
        let explicit = SearchFilter {
            molwt_max: Some(450.0),
            psa_max: Some(90.0),
            is_active: Some(0),
            ..Default::default()
        };
        assert_eq!(explicit.merge(&FilterAssignments::default()), explicit);
    }

    #[test]
    fn test_empty_filter_compiles_to_universal() {
        let predicate = SearchFilter::default().compile();
        assert!(predicate.is_universal());
        assert_eq!(predicate.to_string(), "TRUE");
        assert!(predicate.matches(&record(1000.0, -5.0, 300.0, 0)));
    }

    #[test]
    fn test_compile_clause_per_bound() {
        let filter = SearchFilter {
            molwt_min: Some(200.0),
            molwt_max: Some(500.0),
            logp_max: Some(3.0),
            psa_max: Some(90.0),
            is_active: Some(1),
            ..Default::default()
        };
        let predicate = filter.compile();
        assert_eq!(predicate.clauses().len(), 5);
        assert_eq!(
            predicate.to_string(),
            "mw_freebase >= 200 AND mw_freebase <= 500 AND alogp <= 3 AND psa <= 90 AND is_active = 1"
        );

        assert!(predicate.matches(&record(320.0, 2.5, 75.0, 1)));
        // bounds are inclusive
        assert!(predicate.matches(&record(500.0, 3.0, 90.0, 1)));
        assert!(!predicate.matches(&record(320.0, 2.5, 75.0, 0)));
        assert!(!predicate.matches(&record(150.0, 2.5, 75.0, 1)));
        assert!(!predicate.matches(&record(320.0, 3.5, 75.0, 1)));
        assert!(!predicate.matches(&record(320.0, 2.5, 95.0, 1)));
    }

    #[test]
    fn test_validate() {
        assert!(SearchFilter::default().validate().is_ok());
        let bad = SearchFilter {
            is_active: Some(2),
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(Error::Validation(_))));
        let bad = SearchFilter {
            psa_max: Some(f64::NAN),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_deserialize_accepts_phrase_alias() {
        let filter: SearchFilter =
            serde_json::from_str(r#"{"phrase": "low logp", "psa_max": 120}"#).unwrap();
        assert_eq!(filter.nlq.as_deref(), Some("low logp"));
        assert_eq!(filter.psa_max, Some(120.0));

        let filter: SearchFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, SearchFilter::default());
    }
}
