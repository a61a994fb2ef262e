//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::REGULATION_DIR_NAME;
use crate::{RegulationError, RegulationResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    regulation_data_dir: PathBuf,
    facility_name: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `facility_name` identifies the requesting facility and is recorded against every
    /// mutation, so it must be a non-empty single line.
    pub fn new(regulation_data_dir: PathBuf, facility_name: String) -> RegulationResult<Self> {
        crate::validation::validate_facility_name(&facility_name)?;

        Ok(Self {
            regulation_data_dir,
            facility_name: facility_name.trim().to_string(),
        })
    }

    pub fn regulation_data_dir(&self) -> &Path {
        &self.regulation_data_dir
    }

    /// Directory holding the per-request repositories.
    pub fn regulation_dir(&self) -> PathBuf {
        self.regulation_data_dir.join(REGULATION_DIR_NAME)
    }

    pub fn facility_name(&self) -> &str {
        &self.facility_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regulation_dir_is_under_data_dir() {
        let config = CoreConfig::new(PathBuf::from("/data"), "Hospital Central".into())
            .expect("valid config");
        assert_eq!(config.regulation_dir(), PathBuf::from("/data/regulation"));
        assert_eq!(config.facility_name(), "Hospital Central");
    }

    #[test]
    fn rejects_blank_facility() {
        let err = CoreConfig::new(PathBuf::from("/data"), "  ".into()).expect_err("blank facility");
        assert!(matches!(err, RegulationError::MissingCareLocation));
    }
}
