//! Wire/boundary support for the transfer regulation record.
//!
//! This crate provides **wire models** and **format/translation helpers** for the on-disk,
//! version-controlled `REGULATION.yaml` status file:
//! - one record per patient-transfer episode
//! - strict schema validation (`deny_unknown_fields`)
//! - translation between domain primitives and wire structs
//!
//! This crate deliberately knows nothing about storage or Git; those concerns live in
//! `nir-core`. It also contains no workflow rules — which status may follow which is
//! decided by the core transition map, not by the wire format.

pub mod regulation;
pub mod status;

// Re-export facades
pub use regulation::RegulationRecord;

// Re-export public domain-level types
pub use regulation::{ClinicalHold, RegulationRecordData, SpecialtyChange, TeamSignal};
pub use status::{Status, SupportType};

/// Errors returned by the `nir-record` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid UUID: {0}")]
    InvalidUuid(String),
}

/// Type alias for Results that can fail with a [`RecordError`].
pub type RecordResult<T> = Result<T, RecordError>;
