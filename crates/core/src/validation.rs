//! Input validation utilities.
//!
//! This module contains functions for validating user inputs to ensure they meet
//! safety and correctness requirements before being used in operations.

use crate::error::{RegulationError, RegulationResult};
use nir_types::NonEmptyText;

/// Validates that a facility name is safe for embedding in commit metadata.
///
/// The facility name is rendered into the `Care-Location` commit trailer, so it must be a
/// single printable line of bounded length:
/// - Rejects empty or whitespace-only strings
/// - Rejects embedded newlines
/// - Bounds the length to avoid pathological inputs
///
/// # Errors
///
/// Returns `RegulationError::MissingCareLocation` for blank input and
/// `RegulationError::InvalidCareLocation` otherwise.
pub fn validate_facility_name(facility: &str) -> RegulationResult<()> {
    const MAX_FACILITY_LEN: usize = 120;

    if facility.trim().is_empty() {
        return Err(RegulationError::MissingCareLocation);
    }

    if facility.contains(['\n', '\r']) || facility.len() > MAX_FACILITY_LEN {
        return Err(RegulationError::InvalidCareLocation);
    }

    Ok(())
}

/// Converts a caller-supplied justification into a [`NonEmptyText`].
///
/// Used at the DTO/CLI boundary where reasons arrive as plain strings. The `field`
/// name is included in the error so the caller can surface it inline.
///
/// # Errors
///
/// Returns `RegulationError::InvalidInput` if the justification is empty or
/// whitespace-only.
pub fn require_justification(field: &str, value: &str) -> RegulationResult<NonEmptyText> {
    NonEmptyText::new(value)
        .map_err(|_| RegulationError::InvalidInput(format!("{field} requires a justification")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facility_name_accepts_plain_names() {
        validate_facility_name("Hospital Estadual Central").expect("valid name");
    }

    #[test]
    fn facility_name_rejects_blank_and_multiline() {
        assert!(matches!(
            validate_facility_name("   "),
            Err(RegulationError::MissingCareLocation)
        ));
        assert!(matches!(
            validate_facility_name("line one\nline two"),
            Err(RegulationError::InvalidCareLocation)
        ));
        assert!(matches!(
            validate_facility_name(&"x".repeat(200)),
            Err(RegulationError::InvalidCareLocation)
        ));
    }

    #[test]
    fn justification_rejects_blank_with_field_name() {
        let err = require_justification("denial", "  ").expect_err("blank justification");
        match err {
            RegulationError::InvalidInput(msg) => assert!(msg.contains("denial")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn justification_trims_valid_input() {
        let reason = require_justification("cancel", " sem vaga ").expect("valid justification");
        assert_eq!(reason.as_str(), "sem vaga");
    }
}
