//! Closed enumerations for the regulation workflow.
//!
//! Both enums are deliberately *closed*: the wire strings below are the only values
//! that ever appear in `REGULATION.yaml` or over the API, and deserialisation of any
//! other value fails loudly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a regulation request.
///
/// The wire strings are the regulation vocabulary used by the coordinating
/// authority (NIR), kept verbatim rather than translated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Created by the care team; waiting for the coordinator to regulate.
    AguardandoRegulacao,
    /// Accepted by the coordinator; a destination is being arranged.
    Regulado,
    /// Destination arranged; waiting for the transfer itself.
    AguardandoTransferencia,
    /// Transfer completed. Terminal.
    Transferido,
    /// Denied by the coordinating authority. Terminal.
    NegadoNir,
    /// Denied by the destination hospital; may be re-regulated.
    NegadoHospital,
}

impl Status {
    /// All statuses, in lifecycle order.
    pub const ALL: [Status; 6] = [
        Status::AguardandoRegulacao,
        Status::Regulado,
        Status::AguardandoTransferencia,
        Status::Transferido,
        Status::NegadoNir,
        Status::NegadoHospital,
    ];

    /// The wire string for this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::AguardandoRegulacao => "aguardando_regulacao",
            Status::Regulado => "regulado",
            Status::AguardandoTransferencia => "aguardando_transferencia",
            Status::Transferido => "transferido",
            Status::NegadoNir => "negado_nir",
            Status::NegadoHospital => "negado_hospital",
        }
    }

    /// Returns true if no further transition is permitted from this status.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Status::Transferido | Status::NegadoNir)
    }

    /// Returns true if this status represents a denial.
    pub const fn is_denial(self) -> bool {
        matches!(self, Status::NegadoNir | Status::NegadoHospital)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aguardando_regulacao" => Ok(Status::AguardandoRegulacao),
            "regulado" => Ok(Status::Regulado),
            "aguardando_transferencia" => Ok(Status::AguardandoTransferencia),
            "transferido" => Ok(Status::Transferido),
            "negado_nir" => Ok(Status::NegadoNir),
            "negado_hospital" => Ok(Status::NegadoHospital),
            other => Err(format!("unknown status: '{other}'")),
        }
    }
}

/// Clinical specialty category requested for the transfer destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupportType {
    Neurologia,
    Cardiologia,
    Cronicos,
    Toracica,
    Oncologia,
    Nefrologia,
    Outros,
}

impl SupportType {
    /// The wire string for this specialty.
    pub const fn as_str(self) -> &'static str {
        match self {
            SupportType::Neurologia => "NEUROLOGIA",
            SupportType::Cardiologia => "CARDIOLOGIA",
            SupportType::Cronicos => "CRONICOS",
            SupportType::Toracica => "TORACICA",
            SupportType::Oncologia => "ONCOLOGIA",
            SupportType::Nefrologia => "NEFROLOGIA",
            SupportType::Outros => "OUTROS",
        }
    }
}

impl fmt::Display for SupportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEUROLOGIA" => Ok(SupportType::Neurologia),
            "CARDIOLOGIA" => Ok(SupportType::Cardiologia),
            "CRONICOS" => Ok(SupportType::Cronicos),
            "TORACICA" => Ok(SupportType::Toracica),
            "ONCOLOGIA" => Ok(SupportType::Oncologia),
            "NEFROLOGIA" => Ok(SupportType::Nefrologia),
            "OUTROS" => Ok(SupportType::Outros),
            other => Err(format!("unknown support type: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_strings_round_trip() {
        for status in Status::ALL {
            let parsed: Status = status.as_str().parse().expect("known wire string");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn status_serde_uses_wire_strings() {
        let yaml = serde_yaml::to_string(&Status::AguardandoTransferencia).expect("serialise");
        assert_eq!(yaml.trim(), "aguardando_transferencia");

        let parsed: Status = serde_yaml::from_str("negado_hospital").expect("deserialise");
        assert_eq!(parsed, Status::NegadoHospital);
    }

    #[test]
    fn terminal_statuses_are_exactly_transferido_and_negado_nir() {
        let terminal: Vec<Status> = Status::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![Status::Transferido, Status::NegadoNir]);
    }

    #[test]
    fn support_type_serde_uses_upper_case_wire_strings() {
        let yaml = serde_yaml::to_string(&SupportType::Oncologia).expect("serialise");
        assert_eq!(yaml.trim(), "ONCOLOGIA");

        let parsed: SupportType = serde_yaml::from_str("NEFROLOGIA").expect("deserialise");
        assert_eq!(parsed, SupportType::Nefrologia);
    }

    #[test]
    fn unknown_wire_strings_are_rejected() {
        assert!("em_transito".parse::<Status>().is_err());
        assert!(serde_yaml::from_str::<SupportType>("PEDIATRIA").is_err());
    }
}
