//! Author-related types and functions.
//!
//! This module contains types and utilities for handling author information and
//! commit validation for regulation records.

use crate::error::{RegulationError, RegulationResult};
use nir_types::{EmailAddress, NonEmptyText};

/// Represents an author of a record operation.
#[derive(Clone, Debug)]
pub struct Author {
    /// The full name of the author.
    pub name: NonEmptyText,

    /// The professional role of the author (e.g., "Clinician", "Coordinator").
    pub role: NonEmptyText,

    /// The email address of the author.
    pub email: EmailAddress,

    /// Professional registrations for the author (e.g., CRM number, COREN number).
    pub registrations: Vec<AuthorRegistration>,
}

/// A declared professional registration for an author.
///
/// This is rendered in commit trailers as:
///
/// `Author-Registration: <authority> <number>`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AuthorRegistration {
    pub authority: NonEmptyText,
    pub number: NonEmptyText,
}

impl AuthorRegistration {
    pub fn new(authority: impl Into<String>, number: impl Into<String>) -> RegulationResult<Self> {
        let authority_str = authority.into().trim().to_string();
        let number_str = number.into().trim().to_string();

        if authority_str.is_empty()
            || number_str.is_empty()
            || authority_str.contains(['\n', '\r'])
            || number_str.contains(['\n', '\r'])
            || authority_str.chars().any(char::is_whitespace)
            || number_str.chars().any(char::is_whitespace)
        {
            return Err(RegulationError::InvalidAuthorRegistration);
        }

        let authority = NonEmptyText::new(authority_str)
            .map_err(|_| RegulationError::InvalidAuthorRegistration)?;
        let number =
            NonEmptyText::new(number_str).map_err(|_| RegulationError::InvalidAuthorRegistration)?;

        Ok(Self { authority, number })
    }
}

impl Author {
    /// Validate that this author contains the mandatory commit author metadata.
    ///
    /// This validation is intended to run before commit creation.
    pub fn validate_commit_author(&self) -> RegulationResult<()> {
        // Name, role and email are guaranteed well-formed by their types.
        for reg in &self.registrations {
            AuthorRegistration::new(reg.authority.as_str(), reg.number.as_str())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod author_tests {
    use super::*;

    fn base_author() -> Author {
        Author {
            name: NonEmptyText::new("Test Author").unwrap(),
            role: NonEmptyText::new("Clinician").unwrap(),
            email: EmailAddress::parse("test@example.com").unwrap(),
            registrations: vec![],
        }
    }

    #[test]
    fn registration_rejects_embedded_whitespace() {
        let err =
            AuthorRegistration::new("C RM", "12345").expect_err("expected validation failure");
        assert!(matches!(err, RegulationError::InvalidAuthorRegistration));
    }

    #[test]
    fn validate_commit_author_accepts_valid_author() {
        let mut author = base_author();
        author.registrations =
            vec![AuthorRegistration::new("CRM-SP", "123456").expect("valid registration")];

        author
            .validate_commit_author()
            .expect("expected validation to succeed");
    }
}
