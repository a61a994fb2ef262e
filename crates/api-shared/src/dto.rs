//! Request and response bodies for the regulation HTTP API.
//!
//! Every mutating request carries the acting author's identity and care location;
//! these end up in the Git commit metadata of the record, never in the record body.
//! Statuses and support types travel as their canonical snake_case /
//! SCREAMING_SNAKE_CASE strings and are parsed at the handler boundary.

use chrono::{DateTime, SecondsFormat, Utc};
use nir_core::{Author, AuthorRegistration, RegulationError, RegulationResult};
use nir_record::RegulationRecordData;
use nir_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// ACTING AUTHOR
// ============================================================================

/// A declared professional registration of the acting author.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorRegistrationDto {
    pub authority: String,
    pub number: String,
}

/// Identity fields carried by every mutating request.
///
/// Flattened into the request bodies, so clients send `author_name`,
/// `author_email` and friends at the top level.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ActingAuthor {
    pub author_name: String,
    pub author_email: String,
    pub author_role: String,
    #[serde(default)]
    pub author_registrations: Vec<AuthorRegistrationDto>,
    /// Facility recorded in the commit metadata. Empty means "use the server's
    /// configured facility".
    #[serde(default)]
    pub care_location: String,
}

impl ActingAuthor {
    /// Builds the domain [`Author`], validating every identity field.
    ///
    /// # Errors
    ///
    /// Returns `RegulationError::InvalidInput` for blank names/roles and malformed
    /// email addresses, and the registration-specific errors for bad registrations.
    pub fn to_author(&self) -> RegulationResult<Author> {
        let name = NonEmptyText::new(&self.author_name)
            .map_err(|_| RegulationError::InvalidInput("author_name is required".into()))?;
        let role = NonEmptyText::new(&self.author_role)
            .map_err(|_| RegulationError::InvalidInput("author_role is required".into()))?;
        let email = EmailAddress::parse(&self.author_email).map_err(|_| {
            RegulationError::InvalidInput("author_email is not a valid email address".into())
        })?;

        let registrations = self
            .author_registrations
            .iter()
            .map(|r| AuthorRegistration::new(r.authority.as_str(), r.number.as_str()))
            .collect::<RegulationResult<Vec<_>>>()?;

        Ok(Author {
            name,
            role,
            email,
            registrations,
        })
    }

    /// Resolves the effective care location for commit metadata.
    pub fn resolved_care_location<'a>(&'a self, default_facility: &'a str) -> &'a str {
        let trimmed = self.care_location.trim();
        if trimmed.is_empty() {
            default_facility
        } else {
            trimmed
        }
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRegulationReq {
    /// Patient UUID in canonical 32-hex form.
    pub patient_id: String,
    /// Requested specialty, e.g. `ONCOLOGIA`.
    pub support_type: String,
    #[serde(flatten)]
    pub author: ActingAuthor,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AdvanceStatusReq {
    /// Target status, e.g. `regulado`.
    pub next_status: String,
    /// Mandatory for the denial statuses, ignored otherwise.
    #[serde(default)]
    pub denial_reason: String,
    /// Optimistic-concurrency token; omit for last-write-wins.
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(flatten)]
    pub author: ActingAuthor,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ClinicalHoldReq {
    pub reason: String,
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(flatten)]
    pub author: ActingAuthor,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HoldDeadlineReq {
    /// Reassessment deadline as an RFC 3339 timestamp.
    pub deadline: String,
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(flatten)]
    pub author: ActingAuthor,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfirmReadinessReq {
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(flatten)]
    pub author: ActingAuthor,
}

/// Body shared by the cancellation and relisting signal endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamSignalReq {
    pub reason: String,
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(flatten)]
    pub author: ActingAuthor,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangeSpecialtyReq {
    /// New specialty; must differ from the current one.
    pub new_support_type: String,
    pub reason: String,
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(flatten)]
    pub author: ActingAuthor,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RemoveRegulationReq {
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(flatten)]
    pub author: ActingAuthor,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DeadlineDecisionReq {
    /// One of `confirm_transfer`, `request_relisting`, `request_cancellation`.
    pub decision: String,
    /// Mandatory for the relisting/cancellation decisions.
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub expected_revision: Option<u64>,
    #[serde(flatten)]
    pub author: ActingAuthor,
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ClinicalHoldRes {
    pub at: String,
    pub by: String,
    pub reason: String,
    pub deadline: Option<String>,
    pub deadline_set_by: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamSignalRes {
    pub at: String,
    pub by: String,
    pub reason: String,
}

/// A regulation record as rendered to API clients.
///
/// `deadline_expired` is evaluated server-side against the request time rather than
/// left to the client's clock.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegulationRes {
    pub regulation_id: String,
    pub patient_id: String,
    pub revision: u64,
    pub is_active: bool,
    pub support_type: String,
    pub previous_support_type: Option<String>,
    pub requested_at: String,
    pub created_by: String,
    pub status: String,
    pub regulated_at: Option<String>,
    pub regulated_by: Option<String>,
    pub confirmed_at: Option<String>,
    pub transferred_at: Option<String>,
    pub denied_at: Option<String>,
    pub denial_reason: Option<String>,
    pub clinical_hold: Option<ClinicalHoldRes>,
    pub team_confirmed_at: Option<String>,
    pub team_confirmed_by: Option<String>,
    pub cancel_request: Option<TeamSignalRes>,
    pub relisting_request: Option<TeamSignalRes>,
    pub specialty_change: Option<TeamSignalRes>,
    pub deadline_expired: bool,
}

impl RegulationRes {
    pub fn from_record(record: &RegulationRecordData, now: DateTime<Utc>) -> Self {
        Self {
            regulation_id: record.regulation_id.simple().to_string(),
            patient_id: record.patient_id.simple().to_string(),
            revision: record.revision,
            is_active: record.is_active,
            support_type: record.support_type.as_str().to_string(),
            previous_support_type: record
                .previous_support_type
                .map(|st| st.as_str().to_string()),
            requested_at: rfc3339(record.requested_at),
            created_by: record.created_by.clone(),
            status: record.status.as_str().to_string(),
            regulated_at: record.regulated_at.map(rfc3339),
            regulated_by: record.regulated_by.clone(),
            confirmed_at: record.confirmed_at.map(rfc3339),
            transferred_at: record.transferred_at.map(rfc3339),
            denied_at: record.denied_at.map(rfc3339),
            denial_reason: record.denial_reason.as_ref().map(|r| r.as_str().to_string()),
            clinical_hold: record.clinical_hold.as_ref().map(|hold| ClinicalHoldRes {
                at: rfc3339(hold.at),
                by: hold.by.clone(),
                reason: hold.reason.as_str().to_string(),
                deadline: hold.deadline.map(rfc3339),
                deadline_set_by: hold.deadline_set_by.clone(),
            }),
            team_confirmed_at: record.team_confirmed_at.map(rfc3339),
            team_confirmed_by: record.team_confirmed_by.clone(),
            cancel_request: record.cancel_request.as_ref().map(signal_res),
            relisting_request: record.relisting_request.as_ref().map(signal_res),
            specialty_change: record.specialty_change.as_ref().map(|change| TeamSignalRes {
                at: rfc3339(change.at),
                by: change.by.clone(),
                reason: change.reason.as_str().to_string(),
            }),
            deadline_expired: record.deadline_expired(now),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListRegulationsRes {
    pub regulations: Vec<RegulationRes>,
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn signal_res(signal: &nir_record::TeamSignal) -> TeamSignalRes {
    TeamSignalRes {
        at: rfc3339(signal.at),
        by: signal.by.clone(),
        reason: signal.reason.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acting_author() -> ActingAuthor {
        ActingAuthor {
            author_name: "Dra. Ana Souza".into(),
            author_email: "ana.souza@example.org".into(),
            author_role: "Clinician".into(),
            author_registrations: vec![AuthorRegistrationDto {
                authority: "CRM-SP".into(),
                number: "123456".into(),
            }],
            care_location: String::new(),
        }
    }

    #[test]
    fn acting_author_builds_domain_author() {
        let author = acting_author().to_author().expect("valid author");
        assert_eq!(author.name.as_str(), "Dra. Ana Souza");
        assert_eq!(author.registrations.len(), 1);
    }

    #[test]
    fn blank_identity_fields_are_rejected() {
        let mut dto = acting_author();
        dto.author_name = "   ".into();
        assert!(matches!(
            dto.to_author(),
            Err(RegulationError::InvalidInput(_))
        ));

        let mut dto = acting_author();
        dto.author_email = "not-an-email".into();
        assert!(matches!(
            dto.to_author(),
            Err(RegulationError::InvalidInput(_))
        ));
    }

    #[test]
    fn care_location_falls_back_to_server_facility() {
        let mut dto = acting_author();
        assert_eq!(dto.resolved_care_location("Hospital Central"), "Hospital Central");

        dto.care_location = "  Hospital Norte ".into();
        assert_eq!(dto.resolved_care_location("Hospital Central"), "Hospital Norte");
    }
}
