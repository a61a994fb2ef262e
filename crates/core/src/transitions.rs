//! Status transition rules for regulation requests.
//!
//! The workflow is a small directed graph over [`Status`]. Every mutation that moves a
//! request between statuses goes through [`transition`], which is the single source of
//! truth for which moves are legal and which of them demand a justification.

use crate::error::{RegulationError, RegulationResult};
use nir_record::Status;

/// One legal move out of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOption {
    /// The destination status.
    pub status: Status,
    /// Whether the move must carry a non-empty justification.
    pub requires_justification: bool,
}

const fn open(status: Status) -> TransitionOption {
    TransitionOption {
        status,
        requires_justification: false,
    }
}

const fn justified(status: Status) -> TransitionOption {
    TransitionOption {
        status,
        requires_justification: true,
    }
}

const FROM_AGUARDANDO_REGULACAO: &[TransitionOption] =
    &[open(Status::Regulado), justified(Status::NegadoNir)];

const FROM_REGULADO: &[TransitionOption] = &[
    open(Status::AguardandoTransferencia),
    justified(Status::NegadoHospital),
];

const FROM_AGUARDANDO_TRANSFERENCIA: &[TransitionOption] = &[open(Status::Transferido)];

// negado_hospital is the only denial that can be reopened.
const FROM_NEGADO_HOSPITAL: &[TransitionOption] = &[open(Status::Regulado)];

/// Returns the legal moves out of `from`. Terminal statuses return an empty slice.
pub fn allowed_transitions(from: Status) -> &'static [TransitionOption] {
    match from {
        Status::AguardandoRegulacao => FROM_AGUARDANDO_REGULACAO,
        Status::Regulado => FROM_REGULADO,
        Status::AguardandoTransferencia => FROM_AGUARDANDO_TRANSFERENCIA,
        Status::NegadoHospital => FROM_NEGADO_HOSPITAL,
        Status::Transferido | Status::NegadoNir => &[],
    }
}

/// Looks up the transition `from -> to`.
///
/// # Errors
///
/// Returns `RegulationError::InvalidTransition` when the move is not in the graph,
/// including any move out of a terminal status.
pub fn transition(from: Status, to: Status) -> RegulationResult<&'static TransitionOption> {
    allowed_transitions(from)
        .iter()
        .find(|option| option.status == to)
        .ok_or(RegulationError::InvalidTransition { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_moves_to_regulado_or_denial() {
        let regulado = transition(Status::AguardandoRegulacao, Status::Regulado).expect("allowed");
        assert!(!regulado.requires_justification);

        let denied = transition(Status::AguardandoRegulacao, Status::NegadoNir).expect("allowed");
        assert!(denied.requires_justification);
    }

    #[test]
    fn regulado_moves_forward_or_is_denied_by_hospital() {
        let forward = transition(Status::Regulado, Status::AguardandoTransferencia).expect("allowed");
        assert!(!forward.requires_justification);

        let denied = transition(Status::Regulado, Status::NegadoHospital).expect("allowed");
        assert!(denied.requires_justification);
    }

    #[test]
    fn awaiting_transfer_only_completes() {
        transition(Status::AguardandoTransferencia, Status::Transferido).expect("allowed");
        assert_eq!(allowed_transitions(Status::AguardandoTransferencia).len(), 1);
    }

    #[test]
    fn hospital_denial_reopens_to_regulado_only() {
        transition(Status::NegadoHospital, Status::Regulado).expect("allowed");
        assert_eq!(allowed_transitions(Status::NegadoHospital).len(), 1);
    }

    #[test]
    fn terminal_statuses_have_no_exits() {
        assert!(allowed_transitions(Status::Transferido).is_empty());
        assert!(allowed_transitions(Status::NegadoNir).is_empty());
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let err = transition(Status::AguardandoRegulacao, Status::Transferido)
            .expect_err("cannot skip to transferred");
        assert!(matches!(
            err,
            RegulationError::InvalidTransition {
                from: Status::AguardandoRegulacao,
                to: Status::Transferido
            }
        ));
    }

    #[test]
    fn every_pair_outside_the_graph_is_rejected() {
        for from in Status::ALL {
            let allowed = allowed_transitions(from);
            for to in Status::ALL {
                let result = transition(from, to);
                if allowed.iter().any(|option| option.status == to) {
                    assert!(result.is_ok(), "{from:?} -> {to:?} should be allowed");
                } else {
                    assert!(result.is_err(), "{from:?} -> {to:?} should be rejected");
                }
            }
        }
    }
}
