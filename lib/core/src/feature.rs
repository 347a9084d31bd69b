use serde_json::Value;
use crate::error::{Error, Result};

/// Number of descriptors every model is trained on
pub const FEATURE_COUNT: usize = 6;

/// Descriptor names in model order.
///
/// The scaler, both classifiers and the explainer index features by
/// position, so this order must match the column order used at training time.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "mw_freebase",
    "alogp",
    "psa",
    "hbd",
    "hba",
    "rtb",
];

/// Index of the first integer count descriptor (`hbd`)
const FIRST_COUNT_INDEX: usize = 3;

/// Six physicochemical descriptors of one compound, in [`FEATURE_NAMES`] order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build a vector from already-ordered values
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Result<Self> {
        for (index, value) in values.iter().enumerate() {
            check_value(index, *value)?;
        }
        Ok(Self { values })
    }

    /// Extract the descriptors from a flat JSON object.
    ///
    /// Unknown keys are ignored. Missing or non-numeric descriptors, and
    /// count descriptors that are not non-negative integers, are rejected.
    pub fn assemble(record: &Value) -> Result<Self> {
        let object = record.as_object().ok_or_else(|| {
            Error::Validation("input must be a JSON object of descriptors".to_string())
        })?;

        let mut values = [0.0; FEATURE_COUNT];
        for (index, name) in FEATURE_NAMES.iter().enumerate() {
            let raw = object
                .get(*name)
                .ok_or_else(|| Error::Validation(format!("missing field '{}'", name)))?;
            let value = raw.as_f64().ok_or_else(|| {
                Error::Validation(format!("field '{}' must be a number, got {}", name, raw))
            })?;
            check_value(index, value)?;
            values[index] = value;
        }

        Ok(Self { values })
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// `(name, value)` pairs in model order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

fn check_value(index: usize, value: f64) -> Result<()> {
    let name = FEATURE_NAMES[index];
    if !value.is_finite() {
        return Err(Error::Validation(format!("field '{}' must be finite", name)));
    }
    if index >= FIRST_COUNT_INDEX && (value < 0.0 || value.fract() != 0.0) {
        return Err(Error::Validation(format!(
            "field '{}' must be a non-negative integer count, got {}",
            name, value
        )));
    }
    Ok(())
}

/// A feature vector after standardization.
///
/// Only the linear model accepts this type; the tree ensemble takes the raw
/// [`FeatureVector`]. Keeping the two apart stops a scaled vector from
/// reaching the trees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledVector {
    values: [f64; FEATURE_COUNT],
}

impl ScaledVector {
    pub(crate) fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}
