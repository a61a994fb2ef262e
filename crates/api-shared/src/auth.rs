//! API-key validation shared by the HTTP surfaces.
//!
//! Authentication is opt-in: when no key is configured the deployment runs open
//! (development mode) and the middleware skips this check entirely.

/// Why an API-key check failed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing API key")]
    MissingKey,
    #[error("invalid API key")]
    InvalidKey,
}

/// Validates a client-provided API key against the configured key.
///
/// # Errors
///
/// Returns `AuthError::MissingKey` when the client sent no key and
/// `AuthError::InvalidKey` when the keys do not match.
pub fn validate_api_key(expected_key: &str, provided_key: Option<&str>) -> Result<(), AuthError> {
    match provided_key {
        None => Err(AuthError::MissingKey),
        Some(provided) if provided == expected_key => Ok(()),
        Some(_) => Err(AuthError::InvalidKey),
    }
}
