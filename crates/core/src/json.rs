//! Strict JSON boundary shared by every top-level model type.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// JSON helpers plus the range checks serde cannot express.
///
/// `from_json` rejects unknown fields and unknown shape tags through serde,
/// then runs [`JsonModel::validate`] so out-of-range values never make it
/// past the boundary.
pub trait JsonModel: Serialize + DeserializeOwned {
    /// Check every invariant of this value and its children.
    fn validate(&self) -> Result<()>;

    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }
}

/// Fail unless `min <= value <= max`. NaN is always rejected.
pub(crate) fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )))
    }
}

pub(crate) fn check_optional_range(
    field: &str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Result<()> {
    match value {
        Some(v) => check_range(field, v, min, max),
        None => Ok(()),
    }
}

pub(crate) fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "{} must be a non-negative number, got {}",
            field, value
        )))
    }
}

pub(crate) fn check_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::validation(format!("{} must be finite", field)))
    }
}

/// Keep `value` only when it lies within `min..=max`.
pub(crate) fn within(value: f64, min: f64, max: f64) -> Option<f64> {
    (value >= min && value <= max).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_checks() {
        assert!(check_range("size_pt", 1.0, 1.0, 512.0).is_ok());
        assert!(check_range("size_pt", 512.5, 1.0, 512.0).is_err());
        assert!(check_range("size_pt", f64::NAN, 1.0, 512.0).is_err());
        assert!(check_optional_range("size_pt", None, 1.0, 512.0).is_ok());
        assert!(check_non_negative("width_pt", -0.5).is_err());
        assert!(check_non_negative("width_pt", f64::INFINITY).is_err());
        assert!(check_finite("left_pt", -12.0).is_ok());
    }

    #[test]
    fn test_within() {
        assert_eq!(within(3.0, 0.5, 10.0), Some(3.0));
        assert_eq!(within(12.0, 0.5, 10.0), None);
    }
}
