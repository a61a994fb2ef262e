//! Regulation Request Repository Management.
//!
//! This module manages regulation request records: one record per patient-transfer
//! episode, mutated by the care team (signals, holds, specialty changes) and by the
//! central coordinator (status transitions, hold deadlines).
//!
//! ## Architecture
//!
//! - **Type-state pattern** for compile-time safety (Uninitialised/Initialised)
//! - **UUID-based sharded storage** for scalability
//! - **Git-based versioning** for all operations
//! - **Soft deletion only** for audit and legal compliance
//!
//! Every mutation follows the same shape: load `REGULATION.yaml`, check the optional
//! revision token, apply the change in memory, bump the revision, re-render the file
//! and commit it. Multi-field updates (for example clearing a hold while confirming
//! readiness) therefore land in one commit or not at all.

use crate::author::Author;
use crate::config::CoreConfig;
use crate::constants::REGULATION_FILE_NAME;
use crate::error::{RegulationError, RegulationResult};
use crate::repositories::shared::create_uuid_and_shard_dir;
use crate::transitions::transition;
use crate::uuid::ShardableUuid;
use crate::versioned_files::{
    FileToWrite, RegCommitAction, RegCommitDomain, RegCommitMessage, VersionedFileService,
};
use chrono::{DateTime, Utc};
use nir_record::{
    ClinicalHold, RegulationRecord, RegulationRecordData, SpecialtyChange, Status, SupportType,
    TeamSignal,
};
use nir_types::NonEmptyText;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// TYPE-STATE MARKERS
// ============================================================================

/// Marker type: regulation record does not yet exist.
///
/// Only `initialise()` can be called in this state.
#[derive(Clone, Copy, Debug)]
pub struct Uninitialised;

/// Marker type: regulation record exists.
///
/// Indicates a valid record repository with a known UUID.
#[derive(Clone, Debug)]
pub struct Initialised {
    regulation_id: ShardableUuid,
}

// ============================================================================
// REGULATION SERVICE
// ============================================================================

/// Service for managing regulation request operations.
///
/// Uses the type-state pattern to enforce correct usage at compile time. Generic
/// parameter `S` is either `Uninitialised` or `Initialised`.
#[derive(Clone, Debug)]
pub struct RegulationService<S> {
    cfg: Arc<CoreConfig>,
    state: S,
}

impl RegulationService<Uninitialised> {
    /// Creates a new regulation service in uninitialised state.
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            cfg,
            state: Uninitialised,
        }
    }

    /// Creates a new regulation request for a patient.
    ///
    /// Creates:
    /// - UUID and sharded directory structure under `regulation/`
    /// - `REGULATION.yaml` with status `aguardando_regulacao` and revision 1
    /// - Git repository with initial commit
    ///
    /// Consumes self and returns `RegulationService<Initialised>` along with the
    /// freshly persisted record.
    ///
    /// # Errors
    ///
    /// Returns `RegulationError` if author validation, directory allocation, record
    /// rendering or the initial commit fail. On failure the allocated directory is
    /// removed again.
    pub fn initialise(
        self,
        author: &Author,
        care_location: &str,
        patient_id: Uuid,
        support_type: SupportType,
    ) -> RegulationResult<(RegulationService<Initialised>, RegulationRecordData)> {
        author.validate_commit_author()?;

        let commit_message = RegCommitMessage::new(
            RegCommitDomain::Record,
            RegCommitAction::Create,
            "Regulation request created",
            care_location,
        )?
        .with_trailer("Support-Type", support_type.as_str())?;

        let regulation_root_dir = self.cfg.regulation_dir();
        let (regulation_uuid, record_dir) =
            create_uuid_and_shard_dir(&regulation_root_dir, ShardableUuid::new)?;

        let record = RegulationRecordData::new(
            regulation_uuid.uuid(),
            patient_id,
            support_type,
            author.name.as_str(),
            Utc::now(),
        );
        let record_yaml = RegulationRecord::render(&record)?;

        let record_file = FileToWrite {
            relative_path: std::path::Path::new(REGULATION_FILE_NAME),
            content: &record_yaml,
            old_content: None,
        };

        VersionedFileService::init_and_commit(
            &record_dir,
            author,
            &commit_message,
            &[record_file],
        )?;

        tracing::info!(
            regulation_id = %regulation_uuid,
            support_type = support_type.as_str(),
            "regulation request created"
        );

        Ok((
            RegulationService {
                cfg: self.cfg,
                state: Initialised {
                    regulation_id: regulation_uuid,
                },
            },
            record,
        ))
    }
}

impl RegulationService<Initialised> {
    /// Creates a regulation service for an existing record.
    pub fn with_id(cfg: Arc<CoreConfig>, regulation_id: Uuid) -> Self {
        Self {
            cfg,
            state: Initialised {
                regulation_id: ShardableUuid::from_uuid(regulation_id),
            },
        }
    }

    /// Returns the regulation UUID.
    pub fn regulation_id(&self) -> &ShardableUuid {
        &self.state.regulation_id
    }

    /// Loads the current record from storage.
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::NotFound` if no record exists under this ID, and
    /// `RegulationError::FileRead`/`RegulationError::Record` for unreadable or
    /// malformed files.
    pub fn load(&self) -> RegulationResult<RegulationRecordData> {
        let status_path = self.record_dir().join(REGULATION_FILE_NAME);
        if !status_path.exists() {
            return Err(RegulationError::NotFound(
                self.state.regulation_id.to_string(),
            ));
        }

        let yaml = fs::read_to_string(&status_path).map_err(RegulationError::FileRead)?;
        Ok(RegulationRecord::parse(&yaml)?)
    }

    fn record_dir(&self) -> PathBuf {
        self.state
            .regulation_id
            .sharded_dir(&self.cfg.regulation_dir())
    }

    /// Loads the record, applies `apply`, bumps the revision and commits the result.
    ///
    /// The optional `expected_revision` token makes the update a compare-and-swap:
    /// a mismatch aborts before `apply` runs and nothing is written. Without a token
    /// the update is last-write-wins.
    fn mutate(
        &self,
        author: &Author,
        message: &RegCommitMessage,
        expected_revision: Option<u64>,
        apply: impl FnOnce(&mut RegulationRecordData) -> RegulationResult<()>,
    ) -> RegulationResult<RegulationRecordData> {
        let record_dir = self.record_dir();
        let status_path = record_dir.join(REGULATION_FILE_NAME);
        if !status_path.exists() {
            return Err(RegulationError::NotFound(
                self.state.regulation_id.to_string(),
            ));
        }

        let old_yaml = fs::read_to_string(&status_path).map_err(RegulationError::FileRead)?;
        let mut record = RegulationRecord::parse(&old_yaml)?;

        if let Some(expected) = expected_revision {
            if expected != record.revision {
                return Err(RegulationError::RevisionConflict {
                    expected,
                    actual: record.revision,
                });
            }
        }

        apply(&mut record)?;
        record.revision += 1;

        let new_yaml = RegulationRecord::render(&record)?;
        let record_file = FileToWrite {
            relative_path: std::path::Path::new(REGULATION_FILE_NAME),
            content: &new_yaml,
            old_content: Some(&old_yaml),
        };

        VersionedFileService::write_and_commit_files(&record_dir, author, message, &[record_file])?;

        Ok(record)
    }

    fn require_status(
        record: &RegulationRecordData,
        operation: &'static str,
        required: Status,
    ) -> RegulationResult<()> {
        if record.status != required {
            return Err(RegulationError::WrongStatus {
                operation,
                required,
                actual: record.status,
            });
        }
        Ok(())
    }
}

// ============================================================================
// TEAM OPERATIONS
// ============================================================================

impl RegulationService<Initialised> {
    /// Soft-deletes the record by clearing the active flag.
    ///
    /// Idempotent: a second call on an already-inactive record succeeds without
    /// writing a new commit. The record and its history stay on disk.
    pub fn soft_delete(
        &self,
        author: &Author,
        care_location: &str,
        expected_revision: Option<u64>,
    ) -> RegulationResult<RegulationRecordData> {
        let record = self.load()?;
        if !record.is_active {
            return Ok(record);
        }

        let message = RegCommitMessage::new(
            RegCommitDomain::Record,
            RegCommitAction::Remove,
            "Regulation request removed",
            care_location,
        )?;

        self.mutate(author, &message, expected_revision, |record| {
            record.is_active = false;
            Ok(())
        })
    }

    /// Records the care team's confirmation that the patient is ready to transfer.
    ///
    /// Clears any clinical hold in the same committed update (the hold and the
    /// confirmation are mutually exclusive patient-state flags).
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::WrongStatus` unless the record is in
    /// `aguardando_transferencia`.
    pub fn confirm_readiness(
        &self,
        author: &Author,
        care_location: &str,
        expected_revision: Option<u64>,
    ) -> RegulationResult<RegulationRecordData> {
        let message = RegCommitMessage::new(
            RegCommitDomain::Team,
            RegCommitAction::Update,
            "Team confirmed transfer readiness",
            care_location,
        )?;
        let now = Utc::now();
        let by = author.name.as_str().to_string();

        self.mutate(author, &message, expected_revision, |record| {
            Self::require_status(record, "confirm_readiness", Status::AguardandoTransferencia)?;
            record.team_confirmed_at = Some(now);
            record.team_confirmed_by = Some(by);
            record.clinical_hold = None;
            Ok(())
        })
    }

    /// Records a clinical hold: the care team declares the patient cannot transfer yet.
    ///
    /// Clears any previous readiness confirmation in the same committed update. The
    /// hold starts without a deadline; the coordinator sets one separately.
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::WrongStatus` unless the record is in
    /// `aguardando_transferencia`.
    pub fn request_clinical_hold(
        &self,
        author: &Author,
        care_location: &str,
        reason: NonEmptyText,
        expected_revision: Option<u64>,
    ) -> RegulationResult<RegulationRecordData> {
        let message = RegCommitMessage::new(
            RegCommitDomain::Team,
            RegCommitAction::Update,
            "Clinical hold requested",
            care_location,
        )?;
        let now = Utc::now();
        let by = author.name.as_str().to_string();

        self.mutate(author, &message, expected_revision, |record| {
            Self::require_status(
                record,
                "request_clinical_hold",
                Status::AguardandoTransferencia,
            )?;
            record.clinical_hold = Some(ClinicalHold {
                at: now,
                by,
                reason,
                deadline: None,
                deadline_set_by: None,
            });
            record.team_confirmed_at = None;
            record.team_confirmed_by = None;
            Ok(())
        })
    }

    /// Records a care-team cancellation request.
    ///
    /// This is a signal for the coordinator: it never changes `status` itself.
    pub fn request_cancellation(
        &self,
        author: &Author,
        care_location: &str,
        reason: NonEmptyText,
        expected_revision: Option<u64>,
    ) -> RegulationResult<RegulationRecordData> {
        let message = RegCommitMessage::new(
            RegCommitDomain::Team,
            RegCommitAction::Update,
            "Cancellation requested",
            care_location,
        )?;
        let now = Utc::now();
        let by = author.name.as_str().to_string();

        self.mutate(author, &message, expected_revision, |record| {
            record.cancel_request = Some(TeamSignal {
                at: now,
                by,
                reason,
            });
            Ok(())
        })
    }

    /// Records a care-team relisting request (typically after a hold deadline lapsed).
    ///
    /// This is a signal for the coordinator: it never changes `status` itself.
    pub fn request_relisting(
        &self,
        author: &Author,
        care_location: &str,
        reason: NonEmptyText,
        expected_revision: Option<u64>,
    ) -> RegulationResult<RegulationRecordData> {
        let message = RegCommitMessage::new(
            RegCommitDomain::Team,
            RegCommitAction::Update,
            "Relisting requested",
            care_location,
        )?;
        let now = Utc::now();
        let by = author.name.as_str().to_string();

        self.mutate(author, &message, expected_revision, |record| {
            record.relisting_request = Some(TeamSignal {
                at: now,
                by,
                reason,
            });
            Ok(())
        })
    }

    /// Changes the requested specialty and resets the workflow.
    ///
    /// Sets `previous_support_type`, moves the record back to
    /// `aguardando_regulacao`, and clears every downstream transition field
    /// (`regulated_at/by`, `confirmed_at`, `transferred_at`, `denied_at`,
    /// `denial_reason`).
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::InvalidInput` if `new_type` equals the current
    /// specialty.
    pub fn change_specialty(
        &self,
        author: &Author,
        care_location: &str,
        new_type: SupportType,
        reason: NonEmptyText,
        expected_revision: Option<u64>,
    ) -> RegulationResult<RegulationRecordData> {
        let message = RegCommitMessage::new(
            RegCommitDomain::Team,
            RegCommitAction::Update,
            "Specialty changed",
            care_location,
        )?
        .with_trailer("Support-Type", new_type.as_str())?;
        let now = Utc::now();
        let by = author.name.as_str().to_string();

        self.mutate(author, &message, expected_revision, |record| {
            if record.support_type == new_type {
                return Err(RegulationError::InvalidInput(format!(
                    "new specialty must differ from the current one ({})",
                    new_type
                )));
            }

            record.previous_support_type = Some(record.support_type);
            record.support_type = new_type;
            record.status = Status::AguardandoRegulacao;
            record.regulated_at = None;
            record.regulated_by = None;
            record.confirmed_at = None;
            record.transferred_at = None;
            record.denied_at = None;
            record.denial_reason = None;
            record.specialty_change = Some(SpecialtyChange {
                at: now,
                by,
                reason,
            });
            Ok(())
        })
    }
}

// ============================================================================
// COORDINATOR OPERATIONS
// ============================================================================

impl RegulationService<Initialised> {
    /// Moves the record to `next`, validating against the transition map first.
    ///
    /// Side effects per target status:
    /// - `regulado`: stamps `regulated_at/by` (also on the re-open path out of
    ///   `negado_hospital`, which additionally clears the denial fields)
    /// - `aguardando_transferencia`: stamps `confirmed_at`
    /// - `transferido`: stamps `transferred_at`
    /// - `negado_nir` / `negado_hospital`: stamps `denied_at` and stores the
    ///   mandatory `denial_reason`
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::InvalidTransition` when the move is not in the map
    /// and `RegulationError::InvalidInput` when a denial target is missing its
    /// justification. Both are rejected before any store write.
    pub fn advance_status(
        &self,
        author: &Author,
        care_location: &str,
        next: Status,
        denial_reason: Option<NonEmptyText>,
        expected_revision: Option<u64>,
    ) -> RegulationResult<RegulationRecordData> {
        let message = RegCommitMessage::new(
            RegCommitDomain::Workflow,
            RegCommitAction::Update,
            "Status advanced",
            care_location,
        )?
        .with_trailer("Status", next.as_str())?;
        let now = Utc::now();
        let by = author.name.as_str().to_string();

        let updated = self.mutate(author, &message, expected_revision, |record| {
            let option = transition(record.status, next)?;
            if option.requires_justification && denial_reason.is_none() {
                return Err(RegulationError::InvalidInput(format!(
                    "transition to {next} requires a justification"
                )));
            }

            record.status = next;
            match next {
                Status::Regulado => {
                    record.regulated_at = Some(now);
                    record.regulated_by = Some(by);
                    // Covers the re-open path out of negado_hospital.
                    record.denied_at = None;
                    record.denial_reason = None;
                }
                Status::AguardandoTransferencia => {
                    record.confirmed_at = Some(now);
                }
                Status::Transferido => {
                    record.transferred_at = Some(now);
                }
                Status::NegadoNir | Status::NegadoHospital => {
                    record.denied_at = Some(now);
                    record.denial_reason = denial_reason;
                }
                Status::AguardandoRegulacao => {}
            }
            Ok(())
        })?;

        tracing::info!(
            regulation_id = %self.state.regulation_id,
            status = next.as_str(),
            "regulation status advanced"
        );

        Ok(updated)
    }

    /// Sets the reassessment deadline on an existing clinical hold.
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::HoldNotSet` when no clinical hold is present.
    pub fn set_clinical_hold_deadline(
        &self,
        author: &Author,
        care_location: &str,
        deadline: DateTime<Utc>,
        expected_revision: Option<u64>,
    ) -> RegulationResult<RegulationRecordData> {
        let message = RegCommitMessage::new(
            RegCommitDomain::Deadline,
            RegCommitAction::Update,
            "Clinical hold deadline set",
            care_location,
        )?;
        let by = author.name.as_str().to_string();

        self.mutate(author, &message, expected_revision, |record| {
            let hold = record
                .clinical_hold
                .as_mut()
                .ok_or(RegulationError::HoldNotSet)?;
            hold.deadline = Some(deadline);
            hold.deadline_set_by = Some(by);
            Ok(())
        })
    }
}

// ============================================================================
// LISTING
// ============================================================================

/// Lists regulation records, newest requests first.
///
/// Inactive (soft-deleted) records are excluded unless `include_inactive` is set. A
/// missing storage directory yields an empty list rather than an error, and an
/// unreadable or malformed record file is logged and skipped so one bad record
/// cannot poison the whole listing.
///
/// # Errors
///
/// Returns `RegulationError::FileRead` when a shard directory cannot be iterated.
pub fn list_records(
    cfg: &CoreConfig,
    include_inactive: bool,
) -> RegulationResult<Vec<RegulationRecordData>> {
    let root = cfg.regulation_dir();
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    // Layout is <root>/<s1>/<s2>/<uuid>/REGULATION.yaml.
    for shard1 in read_subdirs(&root)? {
        for shard2 in read_subdirs(&shard1)? {
            for record_dir in read_subdirs(&shard2)? {
                let status_path = record_dir.join(REGULATION_FILE_NAME);
                if !status_path.is_file() {
                    continue;
                }
                let yaml = match fs::read_to_string(&status_path) {
                    Ok(yaml) => yaml,
                    Err(err) => {
                        tracing::warn!("failed to read {}: {err}", status_path.display());
                        continue;
                    }
                };
                let record = match RegulationRecord::parse(&yaml) {
                    Ok(record) => record,
                    Err(err) => {
                        tracing::warn!("failed to parse {}: {err}", status_path.display());
                        continue;
                    }
                };
                if record.is_active || include_inactive {
                    records.push(record);
                }
            }
        }
    }

    records.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
    Ok(records)
}

/// Lists active records carrying an unconsumed care-team signal
/// (cancellation or relisting request).
///
/// This is the coordinator's worklist: consuming a signal remains a manual
/// coordinator decision.
pub fn pending_signals(cfg: &CoreConfig) -> RegulationResult<Vec<RegulationRecordData>> {
    let mut records = list_records(cfg, false)?;
    records.retain(RegulationRecordData::has_pending_signal);
    Ok(records)
}

fn read_subdirs(dir: &std::path::Path) -> RegulationResult<Vec<PathBuf>> {
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(RegulationError::FileRead)? {
        let entry = entry.map_err(RegulationError::FileRead)?;
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        }
    }
    Ok(subdirs)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nir_types::EmailAddress;
    use tempfile::TempDir;

    const LOCATION: &str = "Hospital Municipal Norte";

    fn setup_test_env() -> (TempDir, Arc<CoreConfig>, Author) {
        let temp_dir = TempDir::new().unwrap();
        let cfg = Arc::new(
            CoreConfig::new(temp_dir.path().to_path_buf(), LOCATION.to_string()).unwrap(),
        );

        let author = Author {
            name: NonEmptyText::new("Dra. Ana Souza").unwrap(),
            role: NonEmptyText::new("Clinician").unwrap(),
            email: EmailAddress::parse("ana.souza@example.org").unwrap(),
            registrations: vec![],
        };

        (temp_dir, cfg, author)
    }

    fn create_request(
        cfg: &Arc<CoreConfig>,
        author: &Author,
        support_type: SupportType,
    ) -> RegulationService<Initialised> {
        let (service, record) = RegulationService::new(cfg.clone())
            .initialise(author, LOCATION, Uuid::new_v4(), support_type)
            .expect("initialise request");
        assert_eq!(record.status, Status::AguardandoRegulacao);
        service
    }

    fn reason(text: &str) -> NonEmptyText {
        NonEmptyText::new(text).unwrap()
    }

    /// Advance a fresh record to `aguardando_transferencia`.
    fn advance_to_awaiting_transfer(service: &RegulationService<Initialised>, author: &Author) {
        service
            .advance_status(author, LOCATION, Status::Regulado, None, None)
            .expect("to regulado");
        service
            .advance_status(author, LOCATION, Status::AguardandoTransferencia, None, None)
            .expect("to aguardando_transferencia");
    }

    #[test]
    fn initialise_creates_versioned_record() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Oncologia);

        let record = service.load().expect("load record");
        assert_eq!(record.status, Status::AguardandoRegulacao);
        assert_eq!(record.revision, 1);
        assert!(record.is_active);
        assert_eq!(record.created_by, "Dra. Ana Souza");

        let record_dir = service.record_dir();
        assert!(record_dir.join(".git").exists());
        assert!(record_dir.join(REGULATION_FILE_NAME).exists());
    }

    #[test]
    fn full_scenario_regulate_deny_and_reopen() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Oncologia);

        let record = service
            .advance_status(&author, LOCATION, Status::Regulado, None, None)
            .expect("advance to regulado");
        assert_eq!(record.status, Status::Regulado);
        assert!(record.regulated_at.is_some());
        assert_eq!(record.regulated_by.as_deref(), Some("Dra. Ana Souza"));

        let record = service
            .advance_status(
                &author,
                LOCATION,
                Status::NegadoHospital,
                Some(reason("sem vaga")),
                None,
            )
            .expect("deny by hospital");
        assert_eq!(record.status, Status::NegadoHospital);
        assert!(record.denied_at.is_some());
        assert_eq!(record.denial_reason.as_ref().unwrap().as_str(), "sem vaga");

        // Re-open path clears the denial fields.
        let record = service
            .advance_status(&author, LOCATION, Status::Regulado, None, None)
            .expect("re-regulate");
        assert_eq!(record.status, Status::Regulado);
        assert!(record.denied_at.is_none());
        assert!(record.denial_reason.is_none());
    }

    #[test]
    fn denial_without_justification_persists_nothing() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Cardiologia);

        let err = service
            .advance_status(&author, LOCATION, Status::NegadoNir, None, None)
            .expect_err("denial without reason");
        assert!(matches!(err, RegulationError::InvalidInput(_)));

        let record = service.load().expect("load");
        assert_eq!(record.status, Status::AguardandoRegulacao);
        assert_eq!(record.revision, 1, "failed mutation must not commit");
    }

    #[test]
    fn transition_outside_map_is_rejected_before_store_write() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Neurologia);

        let err = service
            .advance_status(&author, LOCATION, Status::Transferido, None, None)
            .expect_err("cannot skip to transferido");
        assert!(matches!(err, RegulationError::InvalidTransition { .. }));

        let record = service.load().expect("load");
        assert_eq!(record.revision, 1);
    }

    #[test]
    fn negado_hospital_only_exits_to_regulado() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Toracica);

        service
            .advance_status(&author, LOCATION, Status::Regulado, None, None)
            .expect("to regulado");
        service
            .advance_status(
                &author,
                LOCATION,
                Status::NegadoHospital,
                Some(reason("sem vaga de UTI")),
                None,
            )
            .expect("deny");

        let err = service
            .advance_status(&author, LOCATION, Status::Transferido, None, None)
            .expect_err("no direct transfer out of negado_hospital");
        assert!(matches!(err, RegulationError::InvalidTransition { .. }));

        service
            .advance_status(&author, LOCATION, Status::Regulado, None, None)
            .expect("re-open is the only exit");
    }

    #[test]
    fn hold_and_confirmation_are_mutually_exclusive() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Nefrologia);
        advance_to_awaiting_transfer(&service, &author);

        let record = service
            .confirm_readiness(&author, LOCATION, None)
            .expect("confirm readiness");
        assert!(record.team_confirmed_at.is_some());
        assert_eq!(record.team_confirmed_by.as_deref(), Some("Dra. Ana Souza"));

        let record = service
            .request_clinical_hold(&author, LOCATION, reason("instabilidade hemodinâmica"), None)
            .expect("request hold");
        assert!(record.clinical_hold.is_some());
        assert!(record.team_confirmed_at.is_none(), "hold clears confirmation");
        assert!(record.team_confirmed_by.is_none());

        let record = service
            .confirm_readiness(&author, LOCATION, None)
            .expect("confirm again");
        assert!(record.team_confirmed_at.is_some());
        assert!(record.clinical_hold.is_none(), "confirmation clears hold");
    }

    #[test]
    fn readiness_and_hold_require_awaiting_transfer_status() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Outros);

        let err = service
            .confirm_readiness(&author, LOCATION, None)
            .expect_err("wrong status");
        assert!(matches!(
            err,
            RegulationError::WrongStatus {
                operation: "confirm_readiness",
                required: Status::AguardandoTransferencia,
                actual: Status::AguardandoRegulacao,
            }
        ));

        let err = service
            .request_clinical_hold(&author, LOCATION, reason("ainda instável"), None)
            .expect_err("wrong status");
        assert!(matches!(err, RegulationError::WrongStatus { .. }));
    }

    #[test]
    fn specialty_change_resets_workflow() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Cardiologia);

        service
            .advance_status(&author, LOCATION, Status::Regulado, None, None)
            .expect("to regulado");
        service
            .advance_status(&author, LOCATION, Status::AguardandoTransferencia, None, None)
            .expect("to aguardando_transferencia");

        let record = service
            .change_specialty(
                &author,
                LOCATION,
                SupportType::Neurologia,
                reason("piora neurológica"),
                None,
            )
            .expect("change specialty");

        assert_eq!(record.status, Status::AguardandoRegulacao);
        assert_eq!(record.support_type, SupportType::Neurologia);
        assert_eq!(record.previous_support_type, Some(SupportType::Cardiologia));
        assert!(record.regulated_at.is_none());
        assert!(record.regulated_by.is_none());
        assert!(record.confirmed_at.is_none());
        assert!(record.transferred_at.is_none());
        assert!(record.denied_at.is_none());
        assert!(record.denial_reason.is_none());
        let change = record.specialty_change.expect("change audit");
        assert_eq!(change.reason.as_str(), "piora neurológica");
    }

    #[test]
    fn specialty_change_to_same_type_is_rejected() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Oncologia);

        let err = service
            .change_specialty(
                &author,
                LOCATION,
                SupportType::Oncologia,
                reason("sem mudança real"),
                None,
            )
            .expect_err("same specialty");
        assert!(matches!(err, RegulationError::InvalidInput(_)));
    }

    #[test]
    fn soft_delete_is_idempotent() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Cronicos);

        let record = service
            .soft_delete(&author, LOCATION, None)
            .expect("first soft delete");
        assert!(!record.is_active);
        let revision_after_delete = record.revision;

        let record = service
            .soft_delete(&author, LOCATION, None)
            .expect("second soft delete succeeds");
        assert!(!record.is_active);
        assert_eq!(
            record.revision, revision_after_delete,
            "second delete must not write a commit"
        );
    }

    #[test]
    fn signals_never_change_status() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Neurologia);
        advance_to_awaiting_transfer(&service, &author);

        let record = service
            .request_cancellation(&author, LOCATION, reason("óbito"), None)
            .expect("cancellation signal");
        assert_eq!(record.status, Status::AguardandoTransferencia);
        assert!(record.cancel_request.is_some());

        let record = service
            .request_relisting(&author, LOCATION, reason("paciente estável"), None)
            .expect("relisting signal");
        assert_eq!(record.status, Status::AguardandoTransferencia);
        assert!(record.relisting_request.is_some());
    }

    #[test]
    fn deadline_requires_existing_hold() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Toracica);
        advance_to_awaiting_transfer(&service, &author);

        let deadline = Utc::now() + chrono::Duration::days(2);
        let err = service
            .set_clinical_hold_deadline(&author, LOCATION, deadline, None)
            .expect_err("no hold yet");
        assert!(matches!(err, RegulationError::HoldNotSet));

        service
            .request_clinical_hold(&author, LOCATION, reason("aguardando exame"), None)
            .expect("hold");

        let record = service
            .set_clinical_hold_deadline(&author, LOCATION, deadline, None)
            .expect("set deadline");
        let hold = record.clinical_hold.expect("hold present");
        assert_eq!(hold.deadline, Some(deadline));
        assert_eq!(hold.deadline_set_by.as_deref(), Some("Dra. Ana Souza"));
    }

    #[test]
    fn revision_token_mismatch_aborts_without_commit() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Cardiologia);

        let err = service
            .advance_status(&author, LOCATION, Status::Regulado, None, Some(7))
            .expect_err("stale revision token");
        assert!(matches!(
            err,
            RegulationError::RevisionConflict {
                expected: 7,
                actual: 1
            }
        ));

        let record = service.load().expect("load");
        assert_eq!(record.status, Status::AguardandoRegulacao);
        assert_eq!(record.revision, 1);

        // The matching token succeeds and bumps the revision.
        let record = service
            .advance_status(&author, LOCATION, Status::Regulado, None, Some(1))
            .expect("matching token");
        assert_eq!(record.revision, 2);
    }

    #[test]
    fn revisions_bump_once_per_committed_mutation() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Oncologia);

        service
            .advance_status(&author, LOCATION, Status::Regulado, None, None)
            .expect("to regulado");
        service
            .advance_status(&author, LOCATION, Status::AguardandoTransferencia, None, None)
            .expect("to aguardando_transferencia");
        let record = service
            .confirm_readiness(&author, LOCATION, None)
            .expect("confirm");

        assert_eq!(record.revision, 4);
    }

    #[test]
    fn listing_filters_inactive_and_surfaces_signals() {
        let (_temp, cfg, author) = setup_test_env();
        let first = create_request(&cfg, &author, SupportType::Oncologia);
        let second = create_request(&cfg, &author, SupportType::Neurologia);
        let removed = create_request(&cfg, &author, SupportType::Outros);

        removed
            .soft_delete(&author, LOCATION, None)
            .expect("soft delete");

        let active = list_records(&cfg, false).expect("list active");
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|r| r.is_active));

        let all = list_records(&cfg, true).expect("list all");
        assert_eq!(all.len(), 3);

        advance_to_awaiting_transfer(&second, &author);
        second
            .request_cancellation(&author, LOCATION, reason("óbito"), None)
            .expect("signal");

        let pending = pending_signals(&cfg).expect("pending signals");
        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending[0].regulation_id,
            second.regulation_id().uuid(),
            "only the signalled record is pending"
        );
        assert_ne!(pending[0].regulation_id, first.regulation_id().uuid());
    }

    #[test]
    fn mutations_record_structured_commit_messages() {
        let (_temp, cfg, author) = setup_test_env();
        let service = create_request(&cfg, &author, SupportType::Nefrologia);

        service
            .advance_status(&author, LOCATION, Status::Regulado, None, None)
            .expect("to regulado");

        let repo = VersionedFileService::open(&service.record_dir()).expect("open record repo");
        let message = repo
            .head_commit_message()
            .expect("read head")
            .expect("head commit present");
        assert!(message.starts_with("workflow:update: Status advanced"));
        assert!(message.contains("Author-Name: Dra. Ana Souza"));
        assert!(message.contains("Author-Role: Clinician"));
        assert!(message.contains(&format!("Care-Location: {LOCATION}")));
        assert!(message.contains("Status: regulado"));
    }

    #[test]
    fn load_unknown_record_reports_not_found() {
        let (_temp, cfg, _author) = setup_test_env();
        let service = RegulationService::with_id(cfg, Uuid::new_v4());

        let err = service.load().expect_err("record does not exist");
        assert!(matches!(err, RegulationError::NotFound(_)));
    }
}
