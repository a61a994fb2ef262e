//! Wire model and translation helpers for the regulation record.
//!
//! One `REGULATION.yaml` file exists per patient-transfer episode. This module provides
//! both the domain-level carrier used throughout the workspace and the strict wire model
//! for serialisation/deserialisation of that file.
//!
//! Responsibilities:
//! - Define public domain-level types for core/API use
//! - Define a strict wire model for serialisation/deserialisation
//! - Provide translation helpers between domain primitives and the wire model
//! - Validate record structure and enforce required fields
//!
//! Notes:
//! - The status file is mutable and overwriteable; history lives in version control
//! - Actor-attributed fields store the author's display name; professional
//!   registrations are recorded in the commit trailers, not here

use crate::status::{Status, SupportType};
use crate::RecordError;
use chrono::{DateTime, Utc};
use nir_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Public domain-level types
// ============================================================================

/// Domain-level carrier for one regulation request.
///
/// Field groups mirror who writes them: the request block is written once at
/// creation, the transition fields by the coordinator, and the hold/signal
/// groups by the care team. The clinical hold and the team-confirmed pair are
/// mutually exclusive patient-state flags; the service layer clears one when
/// setting the other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegulationRecordData {
    /// Unique identifier for this regulation record (UUID).
    pub regulation_id: Uuid,

    /// Reference to the patient this transfer episode belongs to (not owned here).
    pub patient_id: Uuid,

    /// Monotonic revision counter, bumped on every committed mutation.
    pub revision: u64,

    /// False marks soft deletion; the record stays on disk and in history.
    pub is_active: bool,

    /// Requested destination specialty.
    pub support_type: SupportType,

    /// Set when the specialty is changed mid-flow.
    pub previous_support_type: Option<SupportType>,

    /// When and by whom the request was created.
    pub requested_at: DateTime<Utc>,
    pub created_by: String,

    /// Current workflow status.
    pub status: Status,

    /// Coordinator transition fields.
    pub regulated_at: Option<DateTime<Utc>>,
    pub regulated_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub transferred_at: Option<DateTime<Utc>>,
    pub denied_at: Option<DateTime<Utc>>,
    pub denial_reason: Option<NonEmptyText>,

    /// Care-team clinical hold; mutually exclusive with `team_confirmed_*`.
    pub clinical_hold: Option<ClinicalHold>,

    /// Care-team readiness confirmation; mutually exclusive with `clinical_hold`.
    pub team_confirmed_at: Option<DateTime<Utc>>,
    pub team_confirmed_by: Option<String>,

    /// Pending care-team signals; consumed manually by the coordinator and
    /// never change `status` themselves.
    pub cancel_request: Option<TeamSignal>,
    pub relisting_request: Option<TeamSignal>,

    /// Set only when the specialty was changed (which forces a status reset).
    pub specialty_change: Option<SpecialtyChange>,
}

/// Care-team declaration that the patient cannot transfer yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClinicalHold {
    pub at: DateTime<Utc>,
    pub by: String,
    pub reason: NonEmptyText,
    /// Reassessment deadline, set by the coordinator after the hold exists.
    pub deadline: Option<DateTime<Utc>>,
    pub deadline_set_by: Option<String>,
}

/// A justified care-team request waiting for coordinator action
/// (cancellation or relisting).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TeamSignal {
    pub at: DateTime<Utc>,
    pub by: String,
    pub reason: NonEmptyText,
}

/// Audit trail of the most recent specialty change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecialtyChange {
    pub at: DateTime<Utc>,
    pub by: String,
    pub reason: NonEmptyText,
}

impl RegulationRecordData {
    /// Creates a fresh record as the care team's create operation produces it:
    /// status `aguardando_regulacao`, revision 1, everything downstream unset.
    pub fn new(
        regulation_id: Uuid,
        patient_id: Uuid,
        support_type: SupportType,
        created_by: impl Into<String>,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            regulation_id,
            patient_id,
            revision: 1,
            is_active: true,
            support_type,
            previous_support_type: None,
            requested_at,
            created_by: created_by.into(),
            status: Status::AguardandoRegulacao,
            regulated_at: None,
            regulated_by: None,
            confirmed_at: None,
            transferred_at: None,
            denied_at: None,
            denial_reason: None,
            clinical_hold: None,
            team_confirmed_at: None,
            team_confirmed_by: None,
            cancel_request: None,
            relisting_request: None,
            specialty_change: None,
        }
    }

    /// Returns true when a coordinator-set clinical-hold deadline has elapsed
    /// while the record is still waiting for transfer.
    ///
    /// This is a plain data comparison against the supplied clock; nothing is
    /// enforced or persisted by evaluating it.
    pub fn deadline_expired(&self, now: DateTime<Utc>) -> bool {
        if self.status != Status::AguardandoTransferencia {
            return false;
        }
        match &self.clinical_hold {
            Some(hold) => matches!(hold.deadline, Some(deadline) if deadline < now),
            None => false,
        }
    }

    /// Returns true when a care-team signal (cancellation or relisting) is
    /// waiting for coordinator action.
    pub fn has_pending_signal(&self) -> bool {
        self.cancel_request.is_some() || self.relisting_request.is_some()
    }
}

// ============================================================================
// Public RegulationRecord operations
// ============================================================================

/// Regulation record wire operations.
///
/// This is a zero-sized type used for namespacing parse/render of the
/// `REGULATION.yaml` file. All methods are associated functions.
pub struct RegulationRecord;

impl RegulationRecord {
    /// Parse a regulation record from YAML text.
    ///
    /// Uses `serde_path_to_error` to surface a best-effort "path" (e.g.
    /// `status.current`) to the failing field when the YAML does not match the
    /// wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if:
    /// - the YAML does not represent a valid regulation record,
    /// - any field has an unexpected type,
    /// - any unknown keys are present (due to `#[serde(deny_unknown_fields)]`),
    /// - `regulation_id` or `patient_id` are not valid UUIDs.
    pub fn parse(yaml_text: &str) -> Result<RegulationRecordData, RecordError> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire = match serde_path_to_error::deserialize::<_, RegulationWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(RecordError::Translation(format!(
                    "Regulation record schema mismatch at {path}: {source}"
                )));
            }
        };

        wire_to_domain(wire)
    }

    /// Render a regulation record as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError`] if serialisation fails.
    pub fn render(data: &RegulationRecordData) -> Result<String, RecordError> {
        let wire = domain_to_wire(data);
        serde_yaml::to_string(&wire).map_err(|e| {
            RecordError::Translation(format!("Failed to serialise regulation record: {e}"))
        })
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

/// Wire representation of a regulation record for on-disk YAML.
///
/// This is the exact structure serialised to/from `REGULATION.yaml`. All
/// structs use `#[serde(deny_unknown_fields)]` for strict validation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct RegulationWire {
    pub regulation_id: String,
    pub patient_id: String,
    pub revision: u64,
    pub is_active: bool,
    pub request: RequestWire,
    pub status: StatusWire,
    pub clinical_hold: Option<ClinicalHoldWire>,
    pub team_signals: TeamSignalsWire,
    pub specialty_change: Option<SpecialtyChangeWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct RequestWire {
    pub support_type: SupportType,
    pub previous_support_type: Option<SupportType>,
    pub requested_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct StatusWire {
    pub current: Status,
    pub regulated_at: Option<DateTime<Utc>>,
    pub regulated_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub transferred_at: Option<DateTime<Utc>>,
    pub denied_at: Option<DateTime<Utc>>,
    pub denial_reason: Option<NonEmptyText>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct ClinicalHoldWire {
    pub at: DateTime<Utc>,
    pub by: String,
    pub reason: NonEmptyText,
    pub deadline: Option<DateTime<Utc>>,
    pub deadline_set_by: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct TeamSignalsWire {
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<String>,
    pub cancel: Option<SignalWire>,
    pub relisting: Option<SignalWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct SignalWire {
    pub at: DateTime<Utc>,
    pub by: String,
    pub reason: NonEmptyText,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct SpecialtyChangeWire {
    pub at: DateTime<Utc>,
    pub by: String,
    pub reason: NonEmptyText,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

/// Convert wire format to domain types, validating string identifiers.
fn wire_to_domain(wire: RegulationWire) -> Result<RegulationRecordData, RecordError> {
    let regulation_id = Uuid::parse_str(&wire.regulation_id).map_err(|_| {
        RecordError::InvalidUuid(format!(
            "Invalid UUID in regulation_id: {}",
            wire.regulation_id
        ))
    })?;

    let patient_id = Uuid::parse_str(&wire.patient_id).map_err(|_| {
        RecordError::InvalidUuid(format!("Invalid UUID in patient_id: {}", wire.patient_id))
    })?;

    Ok(RegulationRecordData {
        regulation_id,
        patient_id,
        revision: wire.revision,
        is_active: wire.is_active,
        support_type: wire.request.support_type,
        previous_support_type: wire.request.previous_support_type,
        requested_at: wire.request.requested_at,
        created_by: wire.request.created_by,
        status: wire.status.current,
        regulated_at: wire.status.regulated_at,
        regulated_by: wire.status.regulated_by,
        confirmed_at: wire.status.confirmed_at,
        transferred_at: wire.status.transferred_at,
        denied_at: wire.status.denied_at,
        denial_reason: wire.status.denial_reason,
        clinical_hold: wire.clinical_hold.map(|h| ClinicalHold {
            at: h.at,
            by: h.by,
            reason: h.reason,
            deadline: h.deadline,
            deadline_set_by: h.deadline_set_by,
        }),
        team_confirmed_at: wire.team_signals.confirmed_at,
        team_confirmed_by: wire.team_signals.confirmed_by,
        cancel_request: wire.team_signals.cancel.map(signal_to_domain),
        relisting_request: wire.team_signals.relisting.map(signal_to_domain),
        specialty_change: wire.specialty_change.map(|c| SpecialtyChange {
            at: c.at,
            by: c.by,
            reason: c.reason,
        }),
    })
}

fn signal_to_domain(wire: SignalWire) -> TeamSignal {
    TeamSignal {
        at: wire.at,
        by: wire.by,
        reason: wire.reason,
    }
}

/// Convert domain types to the wire format.
fn domain_to_wire(data: &RegulationRecordData) -> RegulationWire {
    RegulationWire {
        regulation_id: data.regulation_id.simple().to_string(),
        patient_id: data.patient_id.simple().to_string(),
        revision: data.revision,
        is_active: data.is_active,
        request: RequestWire {
            support_type: data.support_type,
            previous_support_type: data.previous_support_type,
            requested_at: data.requested_at,
            created_by: data.created_by.clone(),
        },
        status: StatusWire {
            current: data.status,
            regulated_at: data.regulated_at,
            regulated_by: data.regulated_by.clone(),
            confirmed_at: data.confirmed_at,
            transferred_at: data.transferred_at,
            denied_at: data.denied_at,
            denial_reason: data.denial_reason.clone(),
        },
        clinical_hold: data.clinical_hold.as_ref().map(|h| ClinicalHoldWire {
            at: h.at,
            by: h.by.clone(),
            reason: h.reason.clone(),
            deadline: h.deadline,
            deadline_set_by: h.deadline_set_by.clone(),
        }),
        team_signals: TeamSignalsWire {
            confirmed_at: data.team_confirmed_at,
            confirmed_by: data.team_confirmed_by.clone(),
            cancel: data.cancel_request.as_ref().map(signal_to_wire),
            relisting: data.relisting_request.as_ref().map(signal_to_wire),
        },
        specialty_change: data.specialty_change.as_ref().map(|c| SpecialtyChangeWire {
            at: c.at,
            by: c.by.clone(),
            reason: c.reason.clone(),
        }),
    }
}

fn signal_to_wire(signal: &TeamSignal) -> SignalWire {
    SignalWire {
        at: signal.at,
        by: signal.by.clone(),
        reason: signal.reason.clone(),
    }
}
