//! Free-text phrase to filter translation
//!
//! A phrase is lower-cased and checked against a fixed table of substrings.
//! Every rule is evaluated; rules never consume text, so "low molecular
//! weight and high logp" sets two bounds. Unrecognized text sets nothing.

use serde::Serialize;

/// One filter field set by a phrase rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assignment {
    MolwtMin(f64),
    MolwtMax(f64),
    LogpMin(f64),
    LogpMax(f64),
    IsActive(u8),
}

/// Substring rules in declaration order
pub const RULES: [(&str, Assignment); 6] = [
    ("low molecular weight", Assignment::MolwtMax(300.0)),
    ("high molecular weight", Assignment::MolwtMin(500.0)),
    ("active", Assignment::IsActive(1)),
    ("inactive", Assignment::IsActive(0)),
    ("low logp", Assignment::LogpMax(3.0)),
    ("high logp", Assignment::LogpMin(4.0)),
];

/// How to settle a phrase that matches both the "active" and "inactive" rules.
///
/// Every phrase containing "inactive" also contains "active", and the two
/// rules write opposite values to the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityConflict {
    /// Any occurrence of "inactive" yields `is_active = 0`
    #[default]
    InactiveDominates,
    /// The keyword mentioned last wins; an "active" inside "inactive" does
    /// not count as a mention of "active"
    LastMention,
}

/// Filter fields set by a phrase; `None` means the phrase did not mention it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FilterAssignments {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molwt_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub molwt_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logp_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logp_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<u8>,
}

impl FilterAssignments {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn set(&mut self, assignment: Assignment) {
        match assignment {
            Assignment::MolwtMin(v) => self.molwt_min = Some(v),
            Assignment::MolwtMax(v) => self.molwt_max = Some(v),
            Assignment::LogpMin(v) => self.logp_min = Some(v),
            Assignment::LogpMax(v) => self.logp_max = Some(v),
            Assignment::IsActive(v) => self.is_active = Some(v),
        }
    }
}

/// Deterministic phrase translator
#[derive(Debug, Clone, Copy, Default)]
pub struct NlqTranslator {
    conflict: ActivityConflict,
}

impl NlqTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activity_conflict(conflict: ActivityConflict) -> Self {
        Self { conflict }
    }

    #[inline]
    #[must_use]
    pub fn activity_conflict(&self) -> ActivityConflict {
        self.conflict
    }

    /// Translate a phrase into filter assignments. Never fails.
    pub fn translate(&self, phrase: &str) -> FilterAssignments {
        let text = phrase.to_lowercase();
        let mut assignments = FilterAssignments::default();

        for (needle, assignment) in RULES {
            // the two activity rules are resolved together below
            if matches!(assignment, Assignment::IsActive(_)) {
                continue;
            }
            if text.contains(needle) {
                assignments.set(assignment);
            }
        }
        assignments.is_active = self.resolve_activity(&text);

        assignments
    }

    fn resolve_activity(&self, text: &str) -> Option<u8> {
        let last_inactive = text.rfind("inactive");
        match self.conflict {
            ActivityConflict::InactiveDominates => match last_inactive {
                Some(_) => Some(0),
                None => text.contains("active").then_some(1),
            },
            ActivityConflict::LastMention => {
                let last_active = standalone_active_positions(text).last();
                match (last_active, last_inactive) {
                    (Some(a), Some(i)) => Some(if a > i { 1 } else { 0 }),
                    (Some(_), None) => Some(1),
                    (None, Some(_)) => Some(0),
                    (None, None) => None,
                }
            }
        }
    }
}

/// Byte offsets of "active" not preceded by "in"
fn standalone_active_positions(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.match_indices("active")
        .map(|(pos, _)| pos)
        .filter(move |&pos| !text[..pos].ends_with("in"))
}
