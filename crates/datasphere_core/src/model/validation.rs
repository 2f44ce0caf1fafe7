//! Field-level validation results for creation inputs.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why a single field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    /// The field was not provided.
    Missing,
    /// The field was provided but is blank.
    Empty,
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub reason: ViolationReason,
}

impl Display for FieldViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            ViolationReason::Missing => write!(f, "field {} is required", self.field),
            ViolationReason::Empty => write!(f, "field {} must not be empty", self.field),
        }
    }
}

/// Every violation found in one input, in field declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub(crate) fn require<T>(&mut self, field: &'static str, value: Option<&T>) {
        if value.is_none() {
            self.push(field, ViolationReason::Missing);
        }
    }

    pub(crate) fn require_text(&mut self, field: &'static str, value: Option<&str>) {
        match value {
            None => self.push(field, ViolationReason::Missing),
            Some(text) if text.trim().is_empty() => self.push(field, ViolationReason::Empty),
            Some(_) => {}
        }
    }

    pub(crate) fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn push(&mut self, field: &'static str, reason: ViolationReason) {
        self.violations.push(FieldViolation { field, reason });
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("validation error: ")?;
        for (index, violation) in self.violations.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::{ValidationErrors, ViolationReason};

    #[test]
    fn collects_violations_in_order() {
        let mut errors = ValidationErrors::default();
        errors.require_text("filename", None);
        errors.require_text("name", Some("   "));
        errors.require::<u64>("size", Some(&0));

        assert_eq!(errors.violations().len(), 2);
        assert_eq!(errors.violations()[0].reason, ViolationReason::Missing);
        assert_eq!(errors.violations()[1].reason, ViolationReason::Empty);
        assert_eq!(
            errors.to_string(),
            "validation error: field filename is required, field name must not be empty"
        );
    }

    #[test]
    fn empty_collection_is_ok() {
        assert!(ValidationErrors::default().into_result().is_ok());
    }
}
