//! Outcome tracking for best-effort writes to a live document.

use crate::engine::EngineResult;
use serde::Serialize;
use std::fmt;

/// A field that could not be written, with the engine's reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFailure {
    pub field: String,
    pub error: String,
}

/// Which fields a build or update pass wrote, and which it had to skip.
///
/// Every property write in the apply paths is independent: a failure is
/// recorded here and the pass moves on to the next field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<String>,
    pub failures: Vec<FieldFailure>,
}

impl ApplyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of writing `field`. Returns whether it succeeded.
    pub fn record(&mut self, field: &str, outcome: EngineResult<()>) -> bool {
        match outcome {
            Ok(()) => {
                self.applied.push(field.to_string());
                true
            }
            Err(e) => {
                self.fail(field, &e);
                false
            }
        }
    }

    pub fn fail(&mut self, field: &str, error: &dyn fmt::Display) {
        log::debug!("Skipping {}: {}", field, error);
        self.failures.push(FieldFailure {
            field: field.to_string(),
            error: error.to_string(),
        });
    }

    /// Merge another report, qualifying its field names with `prefix`.
    pub fn absorb(&mut self, prefix: &str, other: ApplyReport) {
        let qualify = |field: String| {
            if prefix.is_empty() {
                field
            } else {
                format!("{}.{}", prefix, field)
            }
        };

        self.applied.extend(other.applied.into_iter().map(qualify));
        self.failures
            .extend(other.failures.into_iter().map(|failure| FieldFailure {
                field: qualify(failure.field),
                error: failure.error,
            }));
    }

    /// True when no field failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn was_applied(&self, field: &str) -> bool {
        self.applied.iter().any(|f| f == field)
    }

    pub fn failed(&self, field: &str) -> bool {
        self.failures.iter().any(|f| f.field == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;

    #[test]
    fn test_record_splits_outcomes() {
        let mut report = ApplyReport::new();
        assert!(report.record("style", Ok(())));
        assert!(!report.record("title", Err(EngineError::Failed("locked".into()))));

        assert!(report.was_applied("style"));
        assert!(report.failed("title"));
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].error, "failed: locked");
    }

    #[test]
    fn test_absorb_prefixes_fields() {
        let mut inner = ApplyReport::new();
        inner.record("size", Ok(()));
        inner.record("color", Err(EngineError::Unsupported("color".into())));

        let mut outer = ApplyReport::new();
        outer.absorb("run[0].font", inner);

        assert!(outer.was_applied("run[0].font.size"));
        assert!(outer.failed("run[0].font.color"));

        let mut flat = ApplyReport::new();
        flat.absorb("", outer);
        assert!(flat.was_applied("run[0].font.size"));
    }
}
