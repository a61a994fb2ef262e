//! UUID and sharded-path utilities.
//!
//! Regulation requests are stored under sharded directories derived from a UUID. To keep
//! path derivation deterministic and consistent across the codebase, storage identifiers
//! use a *canonical* UUID representation: **32 lowercase hexadecimal characters** (no
//! hyphens).
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! This is the same value you would get from `Uuid::new_v4().simple().to_string()`.
//! Canonical form is *required* for externally supplied identifiers (for example, from
//! CLI/API inputs). Use [`ShardableUuid::parse`] to validate an input string.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, data is stored under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `regulation_data/regulation/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! This scheme prevents very large fan-out in a single directory.

use crate::error::{RegulationError, RegulationResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Canonical UUID representation (32 lowercase hex characters, no hyphens).
///
/// This wrapper type guarantees that once constructed, the contained UUID is in
/// canonical format. It provides type safety for UUID operations and ensures
/// consistent path derivation across the system.
///
/// # Construction
/// - [`ShardableUuid::new`] generates a new canonical UUID (for new requests).
/// - [`ShardableUuid::parse`] validates an externally supplied identifier.
/// - [`ShardableUuid::from_uuid`] wraps an already-validated `uuid::Uuid`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShardableUuid(Uuid);

impl ShardableUuid {
    /// Generates a new random v4 UUID in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing `uuid::Uuid`.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Validates and parses a UUID string that must already be in canonical form.
    ///
    /// This does **not** normalise other common UUID forms (for example, hyphenated or
    /// uppercase). Callers must provide the canonical representation.
    ///
    /// # Errors
    ///
    /// Returns [`RegulationError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> RegulationResult<Self> {
        if Self::is_canonical(input) {
            if let Ok(uuid) = Uuid::parse_str(input) {
                return Ok(Self(uuid));
            }
        }
        Err(RegulationError::InvalidInput(format!(
            "UUID must be 32 lowercase hex characters without hyphens, got: '{input}'"
        )))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical UUID form.
    ///
    /// This is a purely syntactic check:
    /// - Exactly 32 bytes long
    /// - Contains only lowercase hex characters (`0-9` and `a-f`)
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<uuid>/` where `s1`/`s2` are derived from this UUID.
    ///
    /// `s1` is the first two hex characters of the UUID, `s2` the next two, and the full
    /// UUID forms the leaf directory.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl Default for ShardableUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShardableUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display in canonical (simple) form
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ShardableUuid {
    type Err = RegulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShardableUuid::parse(s)
    }
}
