//! Deadline-expiry handling.
//!
//! When a clinical-hold deadline has passed while the record is still in
//! `aguardando_transferencia`, the care team must decide how to proceed. This module
//! models that decision as a small session-local dialog state machine: nothing here is
//! persisted, the dialog only exists to funnel the operator towards exactly one
//! [`DeadlineDecision`], which is then applied through the ordinary team operations.

use crate::author::Author;
use crate::error::{RegulationError, RegulationResult};
use crate::repositories::{Initialised, RegulationService};
use crate::validation::require_justification;
use chrono::{DateTime, Utc};
use nir_record::RegulationRecordData;
use nir_types::NonEmptyText;

// ============================================================================
// DECISION
// ============================================================================

/// The outcome of a completed deadline-expiry dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeadlineDecision {
    /// The patient is ready after all: confirm readiness (this clears the hold).
    ConfirmTransfer,
    /// Ask the coordinator for a fresh transfer slot.
    RequestRelisting(NonEmptyText),
    /// Ask the coordinator to cancel the request altogether.
    RequestCancellation(NonEmptyText),
}

/// Applies a [`DeadlineDecision`] to a record via the regular team operations.
///
/// # Errors
///
/// Propagates the underlying operation's error, for example
/// `RegulationError::WrongStatus` when the record has moved on since the dialog
/// was opened.
pub fn apply_deadline_decision(
    service: &RegulationService<Initialised>,
    author: &Author,
    care_location: &str,
    decision: DeadlineDecision,
    expected_revision: Option<u64>,
) -> RegulationResult<RegulationRecordData> {
    match decision {
        DeadlineDecision::ConfirmTransfer => {
            service.confirm_readiness(author, care_location, expected_revision)
        }
        DeadlineDecision::RequestRelisting(reason) => {
            service.request_relisting(author, care_location, reason, expected_revision)
        }
        DeadlineDecision::RequestCancellation(reason) => {
            service.request_cancellation(author, care_location, reason, expected_revision)
        }
    }
}

// ============================================================================
// DIALOG STATE MACHINE
// ============================================================================

/// The screen the dialog session is currently on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogState {
    Menu,
    RelistingForm,
    CancelForm,
}

/// An operator input to the dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogEvent {
    /// From the menu: confirm the patient is ready to transfer.
    ChooseConfirm,
    /// From the menu: open the relisting justification form.
    ChooseRelisting,
    /// From the menu: open the cancellation justification form.
    ChooseCancellation,
    /// On a form: replace the draft justification text.
    EditDraft(String),
    /// On a form: return to the menu, discarding the draft.
    Back,
    /// On a form: submit the draft justification.
    Submit,
}

/// What the dialog did with an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogOutcome {
    /// The dialog stays open.
    Continue,
    /// The dialog produced a decision and is closed.
    Closed(DeadlineDecision),
}

/// Session state for the deadline-expiry dialog.
///
/// Purely in-memory: opening, navigating and abandoning the dialog never touches
/// the record. Only applying the resulting [`DeadlineDecision`] does.
#[derive(Clone, Debug)]
pub struct DeadlineDialog {
    state: DialogState,
    draft: String,
}

impl DeadlineDialog {
    /// Opens the dialog for a record whose hold deadline has expired.
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::InvalidInput` if the record's deadline has not
    /// expired (or it carries no hold, or it left `aguardando_transferencia`).
    pub fn open(record: &RegulationRecordData, now: DateTime<Utc>) -> RegulationResult<Self> {
        if !record.deadline_expired(now) {
            return Err(RegulationError::InvalidInput(
                "deadline dialog only applies to an expired clinical-hold deadline".to_string(),
            ));
        }
        Ok(Self {
            state: DialogState::Menu,
            draft: String::new(),
        })
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Feeds one operator input into the state machine.
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::InvalidInput` for events that are not available on
    /// the current screen, and for submitting a form without a justification. The
    /// dialog stays open and unchanged in both cases.
    pub fn handle(&mut self, event: DialogEvent) -> RegulationResult<DialogOutcome> {
        match (self.state, event) {
            (DialogState::Menu, DialogEvent::ChooseConfirm) => {
                Ok(DialogOutcome::Closed(DeadlineDecision::ConfirmTransfer))
            }
            (DialogState::Menu, DialogEvent::ChooseRelisting) => {
                self.state = DialogState::RelistingForm;
                Ok(DialogOutcome::Continue)
            }
            (DialogState::Menu, DialogEvent::ChooseCancellation) => {
                self.state = DialogState::CancelForm;
                Ok(DialogOutcome::Continue)
            }
            (DialogState::RelistingForm | DialogState::CancelForm, DialogEvent::EditDraft(text)) => {
                self.draft = text;
                Ok(DialogOutcome::Continue)
            }
            (DialogState::RelistingForm | DialogState::CancelForm, DialogEvent::Back) => {
                self.state = DialogState::Menu;
                self.draft.clear();
                Ok(DialogOutcome::Continue)
            }
            (DialogState::RelistingForm, DialogEvent::Submit) => {
                let reason = require_justification("relisting request", &self.draft)?;
                Ok(DialogOutcome::Closed(DeadlineDecision::RequestRelisting(
                    reason,
                )))
            }
            (DialogState::CancelForm, DialogEvent::Submit) => {
                let reason = require_justification("cancellation request", &self.draft)?;
                Ok(DialogOutcome::Closed(DeadlineDecision::RequestCancellation(
                    reason,
                )))
            }
            (state, event) => Err(RegulationError::InvalidInput(format!(
                "event {event:?} is not available on the {state:?} screen"
            ))),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nir_record::{ClinicalHold, Status, SupportType};
    use uuid::Uuid;

    fn expired_record() -> RegulationRecordData {
        let mut record = RegulationRecordData::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            SupportType::Cardiologia,
            "Dra. Ana Souza",
            Utc::now(),
        );
        record.status = Status::AguardandoTransferencia;
        record.clinical_hold = Some(ClinicalHold {
            at: Utc::now() - chrono::Duration::days(3),
            by: "Dra. Ana Souza".to_string(),
            reason: NonEmptyText::new("instável").unwrap(),
            deadline: Some(Utc::now() - chrono::Duration::hours(1)),
            deadline_set_by: Some("Coordenação NIR".to_string()),
        });
        record
    }

    fn open_dialog() -> DeadlineDialog {
        DeadlineDialog::open(&expired_record(), Utc::now()).expect("expired deadline")
    }

    #[test]
    fn dialog_only_opens_on_expired_deadline() {
        let mut record = expired_record();
        DeadlineDialog::open(&record, Utc::now()).expect("expired deadline opens");

        if let Some(hold) = record.clinical_hold.as_mut() {
            hold.deadline = Some(Utc::now() + chrono::Duration::days(1));
        }
        let err = DeadlineDialog::open(&record, Utc::now()).expect_err("future deadline");
        assert!(matches!(err, RegulationError::InvalidInput(_)));

        record.status = Status::Regulado;
        let err = DeadlineDialog::open(&record, Utc::now()).expect_err("wrong status");
        assert!(matches!(err, RegulationError::InvalidInput(_)));
    }

    #[test]
    fn confirm_closes_from_menu() {
        let mut dialog = open_dialog();
        let outcome = dialog.handle(DialogEvent::ChooseConfirm).expect("confirm");
        assert_eq!(
            outcome,
            DialogOutcome::Closed(DeadlineDecision::ConfirmTransfer)
        );
    }

    #[test]
    fn back_discards_draft_text() {
        let mut dialog = open_dialog();
        dialog.handle(DialogEvent::ChooseRelisting).expect("open form");
        dialog
            .handle(DialogEvent::EditDraft("paciente estável".to_string()))
            .expect("edit draft");
        assert_eq!(dialog.draft(), "paciente estável");

        dialog.handle(DialogEvent::Back).expect("back to menu");
        assert_eq!(dialog.state(), DialogState::Menu);
        assert_eq!(dialog.draft(), "");

        // Re-opening the form starts from a clean draft.
        dialog.handle(DialogEvent::ChooseRelisting).expect("re-open form");
        let err = dialog.handle(DialogEvent::Submit).expect_err("empty draft");
        assert!(matches!(err, RegulationError::InvalidInput(_)));
    }

    #[test]
    fn submit_requires_justification_and_keeps_dialog_open() {
        let mut dialog = open_dialog();
        dialog.handle(DialogEvent::ChooseCancellation).expect("open form");
        dialog
            .handle(DialogEvent::EditDraft("   ".to_string()))
            .expect("edit draft");

        let err = dialog.handle(DialogEvent::Submit).expect_err("blank draft");
        assert!(matches!(err, RegulationError::InvalidInput(_)));
        assert_eq!(dialog.state(), DialogState::CancelForm);
    }

    #[test]
    fn submitted_forms_yield_justified_decisions() {
        let mut dialog = open_dialog();
        dialog.handle(DialogEvent::ChooseRelisting).expect("open form");
        dialog
            .handle(DialogEvent::EditDraft("paciente estável".to_string()))
            .expect("edit draft");
        let outcome = dialog.handle(DialogEvent::Submit).expect("submit");
        match outcome {
            DialogOutcome::Closed(DeadlineDecision::RequestRelisting(reason)) => {
                assert_eq!(reason.as_str(), "paciente estável");
            }
            other => panic!("expected relisting decision, got {other:?}"),
        }

        let mut dialog = open_dialog();
        dialog.handle(DialogEvent::ChooseCancellation).expect("open form");
        dialog
            .handle(DialogEvent::EditDraft("óbito".to_string()))
            .expect("edit draft");
        let outcome = dialog.handle(DialogEvent::Submit).expect("submit");
        assert_eq!(
            outcome,
            DialogOutcome::Closed(DeadlineDecision::RequestCancellation(
                NonEmptyText::new("óbito").unwrap()
            ))
        );
    }

    #[test]
    fn events_outside_the_current_screen_are_rejected() {
        let mut dialog = open_dialog();
        let err = dialog.handle(DialogEvent::Submit).expect_err("menu has no submit");
        assert!(matches!(err, RegulationError::InvalidInput(_)));

        dialog.handle(DialogEvent::ChooseCancellation).expect("open form");
        let err = dialog
            .handle(DialogEvent::ChooseConfirm)
            .expect_err("form has no menu choices");
        assert!(matches!(err, RegulationError::InvalidInput(_)));
    }
}
